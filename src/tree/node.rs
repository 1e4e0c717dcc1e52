use http::Method;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use crate::constraints::CompiledMatcher;
use crate::error::TreeError;
use crate::handlers::HandlerEntry;

/// Dispatch key shared by every parametric-family child
pub const PARAMETRIC_KEY: char = ':';
/// Dispatch key of the match-all child
pub const WILDCARD_KEY: char = '*';

/// Handle to a node inside its [`Tree`](super::Tree).
///
/// Handles are only meaningful for the tree that issued them. They stay
/// valid for the tree's lifetime; a node detached by `reset` or `split`
/// keeps its slot but is no longer reachable from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node's prefix matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    /// Literal prefix
    Static = 0,
    /// One path parameter
    Param = 1,
    /// Everything up to the end of the path
    MatchAll = 2,
    /// One path parameter validated by a regular expression
    Regex = 3,
    /// Several parameters inside one segment
    MultiParam = 4,
}

impl NodeKind {
    /// Param, regex and multi-param children share the `:` dispatch key
    #[inline]
    #[must_use]
    pub const fn is_parametric(self) -> bool {
        matches!(self, Self::Param | Self::Regex | Self::MultiParam)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Param => "param",
            Self::MatchAll => "match-all",
            Self::Regex => "regex",
            Self::MultiParam => "multi-param",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for NodeKind {
    type Error = TreeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Static),
            1 => Ok(Self::Param),
            2 => Ok(Self::MatchAll),
            3 => Ok(Self::Regex),
            4 => Ok(Self::MultiParam),
            other => Err(TreeError::UnknownNodeKind(other)),
        }
    }
}

/// One vertex of the routing tree.
///
/// Structural links (`children`, `wildcard_child`, `parametric_brother`) are
/// [`NodeId`]s into the owning tree; only `children` expresses ownership.
pub struct Node<H, S = ()> {
    pub(crate) prefix: String,
    pub(crate) label: Option<char>,
    pub(crate) kind: NodeKind,
    pub(crate) children: HashMap<char, NodeId>,
    pub(crate) wildcard_child: Option<NodeId>,
    pub(crate) parametric_brother: Option<NodeId>,
    pub(crate) regex: Option<Regex>,
    pub(crate) method: Option<Method>,
    pub(crate) handlers: Vec<HandlerEntry<H, S>>,
    pub(crate) unconstrained_handler: Option<usize>,
    pub(crate) has_constraints: bool,
    pub(crate) matcher: OnceCell<CompiledMatcher>,
}

impl<H, S> Default for Node<H, S> {
    fn default() -> Self {
        Self::new("/", NodeKind::Static)
    }
}

impl<H, S> fmt::Debug for Node<H, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("prefix", &self.prefix)
            .field("kind", &self.kind)
            .field("children", &self.children)
            .field("wildcard_child", &self.wildcard_child)
            .field("parametric_brother", &self.parametric_brother)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .field("method", &self.method)
            .field("handlers", &self.handlers.len())
            .field("has_constraints", &self.has_constraints)
            .finish()
    }
}

impl<H, S> Node<H, S> {
    /// Detached node owning `prefix`
    pub fn new(prefix: impl Into<String>, kind: NodeKind) -> Self {
        let prefix = prefix.into();
        Self {
            label: prefix.chars().next(),
            prefix,
            kind,
            children: HashMap::new(),
            wildcard_child: None,
            parametric_brother: None,
            regex: None,
            method: None,
            handlers: Vec::new(),
            unconstrained_handler: None,
            has_constraints: false,
            matcher: OnceCell::new(),
        }
    }

    /// Detached [`NodeKind::Regex`] node
    pub fn with_regex(prefix: impl Into<String>, regex: Regex) -> Self {
        let mut node = Self::new(prefix, NodeKind::Regex);
        node.regex = Some(regex);
        node
    }

    /// Reinitialize as a bare static node owning `prefix`.
    ///
    /// Children, handlers, the wildcard shortcut and the compiled matcher are
    /// dropped. The parametric brother is kept: it describes the node's
    /// position in the tree, which does not change.
    pub fn reset(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
        self.label = self.prefix.chars().next();
        self.kind = NodeKind::Static;
        self.children.clear();
        self.wildcard_child = None;
        self.regex = None;
        self.handlers.clear();
        self.unconstrained_handler = None;
        self.has_constraints = false;
        self.invalidate_matcher();
    }

    /// Key under which this node is stored in its parent's children
    pub fn dispatch_key(&self) -> Result<char, TreeError> {
        match self.kind {
            NodeKind::Static => self.label.ok_or(TreeError::EmptyStaticPrefix),
            NodeKind::Param | NodeKind::Regex | NodeKind::MultiParam => Ok(PARAMETRIC_KEY),
            NodeKind::MatchAll => Ok(WILDCARD_KEY),
        }
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline]
    pub fn label(&self) -> Option<char> {
        self.label
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub fn child(&self, key: char) -> Option<NodeId> {
        self.children.get(&key).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (char, NodeId)> + '_ {
        self.children.iter().map(|(key, id)| (*key, *id))
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn wildcard_child(&self) -> Option<NodeId> {
        self.wildcard_child
    }

    /// Nearest parametric-family fallback for a dead end under this node
    #[inline]
    pub fn parametric_brother(&self) -> Option<NodeId> {
        self.parametric_brother
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn handlers(&self) -> &[HandlerEntry<H, S>] {
        &self.handlers
    }

    #[inline]
    pub fn unconstrained_handler(&self) -> Option<&HandlerEntry<H, S>> {
        self.unconstrained_handler.map(|index| &self.handlers[index])
    }

    #[inline]
    pub fn has_constraints(&self) -> bool {
        self.has_constraints
    }
}
