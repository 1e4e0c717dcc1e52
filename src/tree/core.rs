//! Tree core - registration-time structure building and hot-path child resolution.
//!
//! # Hot path
//!
//! `find_matching_child` and `get_matching_handler` run for every request and
//! must not allocate. The following clippy lints are denied to keep it that
//! way.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

use super::node::{Node, NodeId, NodeKind, PARAMETRIC_KEY};
use crate::config::TreeConfig;
use crate::constraints::{Constrainer, DerivedConstraints, MatcherCompiler, StrategyConstrainer};
use crate::error::TreeError;
use crate::handlers::{Constraints, HandlerEntry};

/// Arena-backed routing tree for one HTTP method.
///
/// The tree owns every node; callers navigate with [`NodeId`] handles. The
/// intended lifecycle is build-then-freeze: mutate through `&mut Tree`
/// during registration, then share `&Tree` with any number of concurrent
/// matchers. Lazily compiled constraint matchers are initialised through
/// `OnceCell`, so concurrent first lookups are safe; [`Tree::precompile`]
/// moves that work to the end of registration instead.
pub struct Tree<H, S = ()> {
    nodes: Vec<Node<H, S>>,
    root: NodeId,
    method: Option<Method>,
    compiler: MatcherCompiler,
}

impl<H, S> Default for Tree<H, S> {
    fn default() -> Self {
        Self::with_options(
            None,
            Arc::new(StrategyConstrainer::new()),
            TreeConfig::default(),
        )
    }
}

impl<H, S> Tree<H, S> {
    /// Tree for `method` with the built-in constraint strategies and the
    /// default configuration
    pub fn new(method: Method) -> Self {
        Self::with_options(
            Some(method),
            Arc::new(StrategyConstrainer::new()),
            TreeConfig::default(),
        )
    }

    /// Tree with an explicit constrainer and configuration
    pub fn with_options(
        method: Option<Method>,
        constrainer: Arc<dyn Constrainer>,
        config: TreeConfig,
    ) -> Self {
        let mut root = Node::default();
        root.method = method.clone();
        Self {
            nodes: vec![root],
            root: NodeId(0),
            method,
            compiler: MatcherCompiler::new(constrainer, config),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn compiler(&self) -> &MatcherCompiler {
        &self.compiler
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<H, S> {
        &self.nodes[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<H, S> {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<H, S>> {
        self.nodes.get(id.0)
    }

    /// Number of nodes ever allocated, including detached ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the arena holds the root from construction on and
    /// nodes are never freed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach `child` under `parent` and return its handle.
    ///
    /// After insertion the parametric fallback of every purely-static
    /// descendant of `parent` is refreshed.
    ///
    /// # Errors
    ///
    /// * [`TreeError::DuplicateChildLabel`] if the child's dispatch key is taken
    /// * [`TreeError::EmptyStaticPrefix`] if a static child has no prefix
    pub fn add_child(&mut self, parent: NodeId, mut child: Node<H, S>) -> Result<NodeId, TreeError> {
        let key = child.dispatch_key()?;
        if self.nodes[parent.0].children.contains_key(&key) {
            return Err(TreeError::DuplicateChildLabel {
                label: key,
                parent_prefix: self.nodes[parent.0].prefix.clone(),
            });
        }

        let kind = child.kind;
        child.method = self.method.clone();
        let id = NodeId(self.nodes.len());
        debug!(
            parent = %self.nodes[parent.0].prefix,
            prefix = %child.prefix,
            kind = %kind,
            label = %key,
            "Child node added"
        );
        self.nodes.push(child);

        let node = &mut self.nodes[parent.0];
        node.children.insert(key, id);
        if kind == NodeKind::MatchAll {
            node.wildcard_child = Some(id);
        }

        self.update_parametric_brothers(parent);
        Ok(id)
    }

    /// Propagate `start`'s parametric child, if any, into every static
    /// descendant reachable through static nodes only.
    fn update_parametric_brothers(&mut self, start: NodeId) {
        let Some(brother) = self.nodes[start.0]
            .children
            .values()
            .copied()
            .find(|child| self.nodes[child.0].kind.is_parametric())
        else {
            return;
        };

        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            if node.kind != NodeKind::Static {
                continue;
            }
            if current != start {
                node.parametric_brother = Some(brother);
            }
            stack.extend(node.children.values().copied());
        }
    }

    /// Split `id`'s prefix at byte offset `at`.
    ///
    /// `id` keeps `prefix[..at]` as a fresh static node whose only child is a
    /// new node holding `prefix[at..]` together with everything `id` used to
    /// own (children, handlers, kind, regex, wildcard shortcut, compiled
    /// matcher). Returns the new node.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidSplit`] unless `0 < at < prefix.len()` on a
    /// character boundary.
    pub fn split(&mut self, id: NodeId, at: usize) -> Result<NodeId, TreeError> {
        let original = &mut self.nodes[id.0];
        if at == 0 || at >= original.prefix.len() || !original.prefix.is_char_boundary(at) {
            return Err(TreeError::InvalidSplit {
                prefix: original.prefix.clone(),
                at,
            });
        }

        let head = original.prefix[..at].to_string();
        let mut continuation = Node::new(&original.prefix[at..], original.kind);
        continuation.children = mem::take(&mut original.children);
        continuation.handlers = mem::take(&mut original.handlers);
        continuation.unconstrained_handler = original.unconstrained_handler;
        continuation.has_constraints = original.has_constraints;
        continuation.regex = original.regex.take();
        continuation.wildcard_child = original.wildcard_child;
        continuation.parametric_brother = original.parametric_brother;
        continuation.matcher = mem::take(&mut original.matcher);

        debug!(
            prefix = %original.prefix,
            head = %head,
            tail = %continuation.prefix,
            "Node split"
        );
        original.reset(head);
        self.add_child(id, continuation)
    }

    /// Reinitialize `id` as a bare static node; see [`Node::reset`]
    pub fn reset(&mut self, id: NodeId, prefix: impl Into<String>) {
        self.nodes[id.0].reset(prefix);
    }

    /// Child keyed by the first character of `path`, without prefix checks
    #[inline]
    pub fn find_by_label(&self, id: NodeId, path: &str) -> Option<NodeId> {
        let label = path.chars().next()?;
        self.nodes[id.0].child(label)
    }

    /// Next node to descend into for `path`: static, then parametric, then
    /// match-all.
    ///
    /// A candidate is only taken if it has children or a handler for
    /// `derived`; the static candidate must also be a literal prefix of
    /// `path`. Backtracking past a `None` is the caller's job, usually via
    /// [`Node::parametric_brother`].
    pub fn find_matching_child(
        &self,
        id: NodeId,
        derived: &DerivedConstraints,
        path: &str,
    ) -> Option<NodeId> {
        let node = &self.nodes[id.0];

        if let Some(child_id) = path.chars().next().and_then(|label| node.child(label)) {
            let child = &self.nodes[child_id.0];
            if child.kind == NodeKind::Static
                && path.starts_with(child.prefix.as_str())
                && self.is_viable(child, derived)
            {
                trace!(prefix = %child.prefix, "Static child matched");
                return Some(child_id);
            }
        }

        if let Some(child_id) = node.child(PARAMETRIC_KEY) {
            let child = &self.nodes[child_id.0];
            if child.kind.is_parametric() && self.is_viable(child, derived) {
                trace!(prefix = %child.prefix, kind = %child.kind, "Parametric child matched");
                return Some(child_id);
            }
        }

        if let Some(child_id) = node.wildcard_child {
            if self.is_viable(&self.nodes[child_id.0], derived) {
                trace!("Wildcard child matched");
                return Some(child_id);
            }
        }

        None
    }

    #[inline]
    fn is_viable(&self, child: &Node<H, S>, derived: &DerivedConstraints) -> bool {
        child.has_children() || child.get_matching_handler(derived, &self.compiler).is_some()
    }

    /// Register a handler on `id` after validating its constraint values.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidConstraintValue`] in addition to the errors of
    /// [`Node::add_handler`].
    pub fn add_handler(
        &mut self,
        id: NodeId,
        handler: Option<H>,
        params: Vec<String>,
        store: S,
        constraints: Constraints,
    ) -> Result<(), TreeError> {
        let constrainer = self.compiler.constrainer();
        if let Some((name, value)) = constraints
            .iter()
            .find(|(name, value)| !constrainer.validate_value(name, value))
        {
            return Err(TreeError::InvalidConstraintValue {
                name: name.clone(),
                value: value.clone(),
            });
        }

        let registered = handler.is_some();
        let constrained = !constraints.is_empty();
        let node = &mut self.nodes[id.0];
        node.add_handler(handler, params, store, constraints)?;
        if registered {
            debug!(
                prefix = %node.prefix,
                method = ?self.method,
                constrained,
                handlers = node.handlers.len(),
                "Handler registered"
            );
        }
        Ok(())
    }

    #[inline]
    pub fn get_handler(&self, id: NodeId, constraints: &Constraints) -> Option<&HandlerEntry<H, S>> {
        self.nodes[id.0].get_handler(constraints)
    }

    #[inline]
    pub fn get_matching_handler(
        &self,
        id: NodeId,
        derived: &DerivedConstraints,
    ) -> Option<&HandlerEntry<H, S>> {
        self.nodes[id.0].get_matching_handler(derived, &self.compiler)
    }

    /// Node ids reachable from the root, depth first
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            let mut children: Vec<_> = self.nodes[id.0].children().collect();
            children.sort_unstable_by_key(|(key, _)| std::cmp::Reverse(*key));
            stack.extend(children.into_iter().map(|(_, child)| child));
        }
        order
    }

    /// Compile the matcher of every reachable constrained node now rather
    /// than on its first lookup. Returns the number of nodes compiled.
    pub fn precompile(&self) -> usize {
        let started = Instant::now();
        let mut compiled = 0;
        for id in self.reachable() {
            let node = &self.nodes[id.0];
            if node.has_constraints && !node.is_compiled() {
                node.compiled_matcher(&self.compiler);
                compiled += 1;
            }
        }
        info!(
            method = ?self.method,
            compiled_nodes = compiled,
            duration_us = started.elapsed().as_micros(),
            "Constraint matchers precompiled"
        );
        compiled
    }

    /// Human-readable rendering of the reachable tree
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        self.render(self.root, "", "", &mut out);
        out
    }

    fn render(&self, id: NodeId, lead: &str, child_lead: &str, out: &mut String) {
        use std::fmt::Write as _;

        let node = &self.nodes[id.0];
        let _ = write!(out, "{lead}{} ({})", node.prefix, node.kind);
        for entry in &node.handlers {
            let _ = write!(out, " {}", render_constraints(&entry.constraints));
        }
        out.push('\n');

        let mut children: Vec<_> = node.children().collect();
        children.sort_unstable_by_key(|(key, _)| *key);
        let count = children.len();
        for (position, (_, child)) in children.into_iter().enumerate() {
            let last = position + 1 == count;
            let (branch, next) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
            self.render(
                child,
                &format!("{child_lead}{branch}"),
                &format!("{child_lead}{next}"),
                out,
            );
        }
    }
}

fn render_constraints(constraints: &Constraints) -> String {
    let pairs: Vec<String> = constraints
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

impl<H, S> fmt::Display for Tree<H, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_print())
    }
}

impl<H, S> fmt::Debug for Tree<H, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("method", &self.method)
            .field("nodes", &self.nodes)
            .field("compiler", &self.compiler)
            .finish()
    }
}
