//! Grammar builder (spec.md §4.5, §6): converts a nested host-language
//! grammar description into the expression graph.
//!
//! Generalizes the teacher's rule cache (`backtracking_parser.rs`'s
//! `parser.rules.get(rule_name)` lookups, `gss_parser.rs`'s
//! `RuleExpression::RuleName` resolution) from a flat post-built rule map
//! into the two-phase "placeholder now, backpatch later" discipline
//! spec.md describes - except here "backpatch" is an in-place arena-slot
//! overwrite rather than a separate resolve sweep, since every arena slot
//! is addressed by a stable index from the moment it's reserved (see
//! `crate::expr` module docs and DESIGN.md).

use std::collections::HashSet;
use std::rc::Rc;

use crate::error::GrammarError;
use crate::expr::{is_nullable, ExprId, ExprKind, ExprNode, RegExMatchData, StrMatchData};
use crate::semantics::SemanticAction;

/// A rule definition: a name plus a closure producing the rule's body the
/// first time it's needed. Referencing the same rule elsewhere is just
/// calling `rule(name, body)` again with the same name - the builder
/// checks the name against its cache before ever invoking `body`, so a
/// reference site's closure is never called (spec.md §4.5 step 2).
pub struct RuleDef {
    pub name: String,
    pub body: Rc<dyn Fn() -> Description>,
    pub action: Option<Rc<dyn SemanticAction>>,
}

/// A grammar description as handed to the builder (spec.md §4.5/§6).
#[derive(Clone)]
pub enum Description {
    Rule(Rc<RuleDef>),
    Sequence(Vec<Description>),
    Choice(Vec<Description>),
    Optional(Box<Description>),
    ZeroOrMore(Box<Description>),
    OneOrMore(Box<Description>),
    And(Box<Description>),
    Not(Box<Description>),
    Combine(Box<Description>),
    Empty,
    StrMatch(String, Option<bool>),
    RegExMatch(String, Option<bool>),
    EndOfFile,
    /// A bare string literal, e.g. `"foo".into()` - an implicit `StrMatch`
    /// inheriting the parser's global `ignore_case`.
    Literal(String),
}

impl From<&str> for Description {
    fn from(s: &str) -> Self {
        Description::Literal(s.to_string())
    }
}

impl From<String> for Description {
    fn from(s: String) -> Self {
        Description::Literal(s)
    }
}

/// Defines (or references) a named rule. `body` is only ever called the
/// first time `name` is seen by a given builder pass.
pub fn rule(name: impl Into<String>, body: impl Fn() -> Description + 'static) -> Description {
    Description::Rule(Rc::new(RuleDef {
        name: name.into(),
        body: Rc::new(body),
        action: None,
    }))
}

/// Like [`rule`], but also registers a semantic action for the rule. Only
/// meaningful at the rule's defining call site - a plain [`rule`]
/// reference elsewhere is enough once the rule is known.
pub fn rule_with_action(
    name: impl Into<String>,
    body: impl Fn() -> Description + 'static,
    action: Rc<dyn SemanticAction>,
) -> Description {
    Description::Rule(Rc::new(RuleDef {
        name: name.into(),
        body: Rc::new(body),
        action: Some(action),
    }))
}

pub fn seq(items: impl IntoIterator<Item = Description>) -> Description {
    Description::Sequence(items.into_iter().collect())
}

pub fn choice(items: impl IntoIterator<Item = Description>) -> Description {
    Description::Choice(items.into_iter().collect())
}

pub fn opt(inner: impl Into<Description>) -> Description {
    Description::Optional(Box::new(inner.into()))
}

pub fn zero_or_more(inner: impl Into<Description>) -> Description {
    Description::ZeroOrMore(Box::new(inner.into()))
}

pub fn one_or_more(inner: impl Into<Description>) -> Description {
    Description::OneOrMore(Box::new(inner.into()))
}

pub fn and_pred(inner: impl Into<Description>) -> Description {
    Description::And(Box::new(inner.into()))
}

pub fn not_pred(inner: impl Into<Description>) -> Description {
    Description::Not(Box::new(inner.into()))
}

pub fn combine(inner: impl Into<Description>) -> Description {
    Description::Combine(Box::new(inner.into()))
}

pub fn empty() -> Description {
    Description::Empty
}

pub fn str_match(s: impl Into<String>) -> Description {
    Description::StrMatch(s.into(), None)
}

pub fn str_match_ci(s: impl Into<String>, ignore_case: bool) -> Description {
    Description::StrMatch(s.into(), Some(ignore_case))
}

pub fn regex(pattern: impl Into<String>) -> Description {
    Description::RegExMatch(pattern.into(), None)
}

pub fn regex_ci(pattern: impl Into<String>, ignore_case: bool) -> Description {
    Description::RegExMatch(pattern.into(), Some(ignore_case))
}

pub fn eof() -> Description {
    Description::EndOfFile
}

/// Converts descriptions into arena nodes, threading a rule-name cache so
/// recursive rule references resolve to a stable placeholder id
/// (spec.md §4.5 steps 1-5).
pub struct Builder<'a> {
    arena: &'a mut Vec<ExprNode>,
    rule_cache: std::collections::HashMap<String, ExprId>,
    pending: HashSet<usize>,
    ignore_case_default: bool,
    pub sem_actions: std::collections::HashMap<String, Rc<dyn SemanticAction>>,
}

impl<'a> Builder<'a> {
    pub fn new(arena: &'a mut Vec<ExprNode>, ignore_case_default: bool) -> Self {
        let eof_id = Self::alloc(
            arena,
            ExprNode {
                kind: ExprKind::EndOfFile,
                children: Vec::new(),
                rule: None,
                root: false,
            },
        );
        let mut rule_cache = std::collections::HashMap::new();
        rule_cache.insert("EndOfFile".to_string(), eof_id);
        Builder {
            arena,
            rule_cache,
            pending: HashSet::new(),
            ignore_case_default,
            sem_actions: std::collections::HashMap::new(),
        }
    }

    fn alloc(arena: &mut Vec<ExprNode>, node: ExprNode) -> ExprId {
        arena.push(node);
        ExprId(arena.len() - 1)
    }

    pub fn build(&mut self, desc: &Description) -> Result<ExprId, GrammarError> {
        match desc {
            Description::Rule(def) => self.build_rule(def),
            Description::Sequence(items) => self.build_container(items, ExprKind::Sequence),
            Description::Choice(items) => self.build_container(items, ExprKind::OrderedChoice),
            Description::Optional(inner) => self.build_wrap(inner, ExprKind::Optional),
            Description::ZeroOrMore(inner) => self.build_wrap(inner, ExprKind::ZeroOrMore),
            Description::OneOrMore(inner) => self.build_wrap(inner, ExprKind::OneOrMore),
            Description::And(inner) => self.build_wrap(inner, ExprKind::And),
            Description::Not(inner) => self.build_wrap(inner, ExprKind::Not),
            Description::Combine(inner) => self.build_wrap(inner, ExprKind::Combine),
            Description::Empty => Ok(Self::alloc(
                self.arena,
                ExprNode {
                    kind: ExprKind::Empty,
                    children: Vec::new(),
                    rule: None,
                    root: false,
                },
            )),
            Description::StrMatch(lit, ignore_case) => {
                self.build_str_match(lit.clone(), *ignore_case)
            }
            Description::Literal(lit) => self.build_str_match(lit.clone(), None),
            Description::RegExMatch(pattern, ignore_case) => {
                self.build_regex_match(pattern, *ignore_case)
            }
            Description::EndOfFile => Ok(self.rule_cache["EndOfFile"]),
        }
    }

    fn build_rule(&mut self, def: &Rc<RuleDef>) -> Result<ExprId, GrammarError> {
        if let Some(&id) = self.rule_cache.get(&def.name) {
            return Ok(id);
        }

        let placeholder_id = Self::alloc(self.arena, ExprNode::placeholder(def.name.clone()));
        self.rule_cache.insert(def.name.clone(), placeholder_id);
        self.pending.insert(placeholder_id.0);

        if let Some(action) = &def.action {
            self.sem_actions.insert(def.name.clone(), action.clone());
        }

        let body_desc = (def.body)();
        let body_id = self.build(&body_desc)?;

        if body_id.0 != placeholder_id.0 {
            let mut built = self.arena[body_id.0].clone();
            built.rule = Some(def.name.clone());
            built.root = true;
            self.arena[placeholder_id.0] = built;
        } else {
            self.arena[placeholder_id.0].rule = Some(def.name.clone());
            self.arena[placeholder_id.0].root = true;
        }

        self.pending.remove(&placeholder_id.0);
        Ok(placeholder_id)
    }

    fn build_container(
        &mut self,
        items: &[Description],
        kind: ExprKind,
    ) -> Result<ExprId, GrammarError> {
        let mut children = Vec::with_capacity(items.len());
        for item in items {
            children.push(self.build(item)?);
        }
        Ok(Self::alloc(
            self.arena,
            ExprNode {
                kind,
                children,
                rule: None,
                root: false,
            },
        ))
    }

    fn build_wrap(&mut self, inner: &Description, kind: ExprKind) -> Result<ExprId, GrammarError> {
        let child = self.build(inner)?;
        Ok(Self::alloc(
            self.arena,
            ExprNode {
                kind,
                children: vec![child],
                rule: None,
                root: false,
            },
        ))
    }

    fn build_str_match(
        &mut self,
        literal: String,
        ignore_case: Option<bool>,
    ) -> Result<ExprId, GrammarError> {
        let ignore_case = ignore_case.unwrap_or(self.ignore_case_default);
        Ok(Self::alloc(
            self.arena,
            ExprNode {
                kind: ExprKind::StrMatch(StrMatchData {
                    literal,
                    ignore_case,
                }),
                children: Vec::new(),
                rule: None,
                root: false,
            },
        ))
    }

    fn build_regex_match(
        &mut self,
        pattern: &str,
        ignore_case: Option<bool>,
    ) -> Result<ExprId, GrammarError> {
        let ignore_case = ignore_case.unwrap_or(self.ignore_case_default);
        let compiled = regex::RegexBuilder::new(pattern)
            .multi_line(true)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| GrammarError::InvalidRegex(pattern.to_string(), e.to_string()))?;
        Ok(Self::alloc(
            self.arena,
            ExprNode {
                kind: ExprKind::RegExMatch(RegExMatchData {
                    pattern: pattern.to_string(),
                    ignore_case,
                    regex: compiled,
                }),
                children: Vec::new(),
                rule: None,
                root: false,
            },
        ))
    }

    /// Asserts the invariant spec.md §3 requires: after construction, no
    /// placeholder may remain unresolved. By construction (every
    /// reservation in `build_rule` is resolved before that call returns,
    /// even across mutual recursion - see module docs) this can only fire
    /// if an earlier error already aborted the build.
    pub fn finish(self) -> Result<(), GrammarError> {
        if let Some(&idx) = self.pending.iter().next() {
            let name = match &self.arena[idx].kind {
                ExprKind::Placeholder { rule_name } => rule_name.clone(),
                _ => "<unknown>".to_string(),
            };
            return Err(GrammarError::UnresolvedCrossRef(name));
        }
        Ok(())
    }
}

/// Rejects a comments model that could match the empty string (spec.md §9
/// Design Notes).
pub fn check_comments_model(arena: &[ExprNode], root: ExprId) -> Result<(), GrammarError> {
    if is_nullable(arena, root) {
        Err(GrammarError::NullableCommentsModel)
    } else {
        Ok(())
    }
}
