//! Parse-tree model (spec.md §3).
//!
//! Two node kinds: `Terminal`, a leaf holding matched text, and
//! `NonTerminal`, an ordered list of children bound to a rule name. Both
//! carry a source position and an optional comment subtree collected by
//! the whitespace/comment skipper (see `crate::engine`).

use std::fmt;

/// A leaf of the parse tree: a single matched run of input text.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    /// Owning root rule name, or empty if produced by a non-root match.
    pub rule: String,
    pub position: usize,
    pub value: String,
    /// Tokens to be ignored by the default semantic action (e.g. EOF,
    /// and literals matched directly inside a `Sequence`).
    pub suppress: bool,
    pub comments: Option<Box<ParseTreeNode>>,
}

impl Terminal {
    pub fn new(rule: impl Into<String>, position: usize, value: impl Into<String>) -> Self {
        Terminal {
            rule: rule.into(),
            position,
            value: value.into(),
            suppress: false,
            comments: None,
        }
    }

    pub fn suppressed(mut self, suppress: bool) -> Self {
        self.suppress = suppress;
        self
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// An interior node of the parse tree: children in source order, bound to
/// the name of the rule whose root produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct NonTerminal {
    pub rule: String,
    pub position: usize,
    pub children: Vec<ParseTreeNode>,
    pub comments: Option<Box<ParseTreeNode>>,
}

impl NonTerminal {
    pub fn new(rule: impl Into<String>, position: usize, children: Vec<ParseTreeNode>) -> Self {
        NonTerminal {
            rule: rule.into(),
            position,
            children,
            comments: None,
        }
    }

    /// First child bound to `rule_name`, if any. Exposed as an explicit
    /// method rather than dynamic attribute lookup (spec.md §9
    /// "Child-lookup sugar").
    pub fn get(&self, rule_name: &str) -> Option<&ParseTreeNode> {
        self.children.iter().find(|c| c.rule() == rule_name)
    }

    /// True (per spec.md §9's falsy-list semantics inherited from the
    /// original's list-subclassed `NonTerminal`) iff this node has at
    /// least one child.
    pub fn is_truthy(&self) -> bool {
        !self.children.is_empty()
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.children.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseTreeNode {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
}

impl ParseTreeNode {
    pub fn rule(&self) -> &str {
        match self {
            ParseTreeNode::Terminal(t) => &t.rule,
            ParseTreeNode::NonTerminal(nt) => &nt.rule,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            ParseTreeNode::Terminal(t) => t.position,
            ParseTreeNode::NonTerminal(nt) => nt.position,
        }
    }

    pub fn comments(&self) -> Option<&ParseTreeNode> {
        match self {
            ParseTreeNode::Terminal(t) => t.comments.as_deref(),
            ParseTreeNode::NonTerminal(nt) => nt.comments.as_deref(),
        }
    }

    pub fn set_comments(&mut self, comments: ParseTreeNode) {
        match self {
            ParseTreeNode::Terminal(t) => t.comments = Some(Box::new(comments)),
            ParseTreeNode::NonTerminal(nt) => nt.comments = Some(Box::new(comments)),
        }
    }

    /// Mirrors the original's list-truthiness: a `Terminal` is always
    /// truthy, a `NonTerminal` is truthy iff it has children.
    pub fn is_truthy(&self) -> bool {
        match self {
            ParseTreeNode::Terminal(_) => true,
            ParseTreeNode::NonTerminal(nt) => nt.is_truthy(),
        }
    }

    pub fn as_nonterminal(&self) -> Option<&NonTerminal> {
        match self {
            ParseTreeNode::NonTerminal(nt) => Some(nt),
            _ => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            ParseTreeNode::Terminal(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for ParseTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseTreeNode::Terminal(t) => write!(f, "{t}"),
            ParseTreeNode::NonTerminal(nt) => write!(f, "{nt}"),
        }
    }
}

impl From<Terminal> for ParseTreeNode {
    fn from(t: Terminal) -> Self {
        ParseTreeNode::Terminal(t)
    }
}

impl From<NonTerminal> for ParseTreeNode {
    fn from(nt: NonTerminal) -> Self {
        ParseTreeNode::NonTerminal(nt)
    }
}
