//! The expression graph (spec.md §3, §4.1): the parser model a grammar
//! compiles down to.
//!
//! Nodes live in an arena (`Vec<ExprNode>`) owned by the `Parser` rather
//! than behind `Rc`/`RefCell` cycles. A rule reference is just the arena
//! index of the rule's root node, so cycles through recursive rules are
//! ordinary integers, not shared-pointer cycles - see DESIGN.md for why
//! this departs from the teacher's `ByAddress`-keyed approach while
//! keeping the same identity-preserving intent (spec.md §9 "Cyclic
//! expression graph").

mod nullable;
mod value;

pub use nullable::is_nullable;
pub use value::MatchValue;

/// Index into the parser's expression arena. Stable for the lifetime of
/// the parser model; this is the node "identity" spec.md §3 requires for
/// per-node memo tables and cycle-safe rule references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub usize);

#[derive(Debug, Clone)]
pub struct StrMatchData {
    pub literal: String,
    pub ignore_case: bool,
}

#[derive(Debug, Clone)]
pub struct RegExMatchData {
    pub pattern: String,
    pub ignore_case: bool,
    pub regex: regex::Regex,
}

/// Tag for every parsing-expression kind spec.md §3 lists. Children are
/// stored out-of-line on `ExprNode::children`; kinds that need no
/// children-independent payload (`Sequence`, `OrderedChoice`, ...) carry
/// none here.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Reserved arena slot for a rule whose body hasn't been built yet.
    /// Exists only transiently during grammar construction; after
    /// `Builder::build` returns, no node may have this kind (spec.md §3
    /// invariant: "the count of outstanding placeholders must be zero").
    Placeholder { rule_name: String },
    Sequence,
    OrderedChoice,
    Optional,
    ZeroOrMore,
    OneOrMore,
    And,
    Not,
    Empty,
    Combine,
    StrMatch(StrMatchData),
    RegExMatch(RegExMatchData),
    EndOfFile,
}

impl ExprKind {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ExprKind::Placeholder { .. })
    }

    /// Display name used in diagnostics, e.g. `"StrMatch('+')"` or, for a
    /// rule root, just the rule name.
    pub fn describe(&self) -> String {
        match self {
            ExprKind::Placeholder { rule_name } => rule_name.clone(),
            ExprKind::Sequence => "Sequence".to_string(),
            ExprKind::OrderedChoice => "OrderedChoice".to_string(),
            ExprKind::Optional => "Optional".to_string(),
            ExprKind::ZeroOrMore => "ZeroOrMore".to_string(),
            ExprKind::OneOrMore => "OneOrMore".to_string(),
            ExprKind::And => "And".to_string(),
            ExprKind::Not => "Not".to_string(),
            ExprKind::Empty => "Empty".to_string(),
            ExprKind::Combine => "Combine".to_string(),
            ExprKind::StrMatch(data) => data.literal.clone(),
            ExprKind::RegExMatch(data) => data.pattern.clone(),
            ExprKind::EndOfFile => "EOF".to_string(),
        }
    }
}

/// A node of the expression graph. `rule`/`root` are set iff this node is
/// the canonical entry point of a named rule (spec.md §3 "Expression
/// node").
#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub children: Vec<ExprId>,
    pub rule: Option<String>,
    pub root: bool,
}

impl ExprNode {
    pub fn placeholder(rule_name: impl Into<String>) -> Self {
        ExprNode {
            kind: ExprKind::Placeholder {
                rule_name: rule_name.into(),
            },
            children: Vec::new(),
            rule: None,
            root: false,
        }
    }

    pub fn name(&self) -> String {
        if self.root {
            if let Some(rule) = &self.rule {
                return rule.clone();
            }
        }
        self.kind.describe()
    }
}
