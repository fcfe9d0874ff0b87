//! A packrat PEG parser interpreter: given a parser model (an expression
//! graph, spec.md §3) and an input string, produces a parse tree by
//! recursive-descent evaluation with unlimited backtracking and
//! per-position memoization.
//!
//! The grammar-construction front-end ([`builder`]) converts a grammar
//! written as nested combinator calls - rules, sequences, choices,
//! literals, regexes - into that expression graph, resolving forward
//! references for recursive rules along the way. See `SPEC_FULL.md` for
//! the full specification this crate implements and `DESIGN.md` for where
//! each piece is grounded.

pub mod builder;
mod diagnostics;
mod engine;
pub mod error;
pub mod expr;
pub mod peg;
pub mod semantics;
pub mod tree;

use std::collections::HashMap;
use std::rc::Rc;

pub use builder::{
    and_pred, choice, combine, empty, eof, not_pred, one_or_more, opt, regex, regex_ci, rule,
    rule_with_action, seq, str_match, str_match_ci, zero_or_more, Description,
};
pub use error::{GrammarError, NoMatch, ParseError};
pub use semantics::{Asg, DefaultAction, SemanticAction};
pub use tree::{NonTerminal, ParseTreeNode, Terminal};

use builder::{check_comments_model, Builder};
use expr::{ExprId, ExprNode, MatchValue};

/// Default whitespace character set: tab, newline, carriage return, space
/// (spec.md §6).
pub const DEFAULT_WS: &str = "\t\n\r ";

/// Parser configuration (spec.md §6 "Parser configuration options").
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub skipws: bool,
    pub ws: String,
    pub reduce_tree: bool,
    pub ignore_case: bool,
    pub debug: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            skipws: true,
            ws: DEFAULT_WS.to_string(),
            reduce_tree: false,
            ignore_case: false,
            debug: false,
        }
    }
}

pub(crate) type MemoSlot = Result<(MatchValue, usize), NoMatch>;

/// A compiled grammar plus all the mutable state a parse run needs. Not
/// safe for concurrent use (spec.md §5): one parser instance parses one
/// input at a time, and its expression graph's memo tables are private to
/// it (see `crate::expr` module docs).
pub struct Parser {
    arena: Vec<ExprNode>,
    memo: Vec<HashMap<(usize, bool), MemoSlot>>,
    root: ExprId,
    comments_model: Option<ExprId>,
    sem_actions: HashMap<String, Rc<dyn SemanticAction>>,

    pub skipws: bool,
    pub ws: String,
    pub reduce_tree: bool,
    pub ignore_case: bool,
    pub debug: bool,

    input: String,
    position: usize,
    in_lex_rule: bool,
    in_parse_comment: bool,
    last_expression: Option<ExprId>,
    nm: Option<NoMatch>,
    line_ends: Vec<usize>,
    parse_tree: Option<ParseTreeNode>,
}

impl Parser {
    /// Builds a parser model from `root` (spec.md §4.5).
    pub fn new(root: Description, options: ParserOptions) -> Result<Self, GrammarError> {
        let mut arena = Vec::new();
        let (root_id, sem_actions) = {
            let mut builder = Builder::new(&mut arena, options.ignore_case);
            let root_id = builder.build(&root)?;
            let sem_actions = std::mem::take(&mut builder.sem_actions);
            builder.finish()?;
            (root_id, sem_actions)
        };

        let memo = (0..arena.len()).map(|_| HashMap::new()).collect();

        Ok(Parser {
            arena,
            memo,
            root: root_id,
            comments_model: None,
            sem_actions,
            skipws: options.skipws,
            ws: options.ws,
            reduce_tree: options.reduce_tree,
            ignore_case: options.ignore_case,
            debug: options.debug,
            input: String::new(),
            position: 0,
            in_lex_rule: false,
            in_parse_comment: false,
            last_expression: None,
            nm: None,
            line_ends: Vec::new(),
            parse_tree: None,
        })
    }

    /// Like [`Parser::new`], but also builds a comments grammar to
    /// interleave on match failure outside lexical rules (spec.md §4.3).
    /// Rejected at build time if the comments grammar could match the
    /// empty string (spec.md §9 Design Notes).
    pub fn with_comments(
        root: Description,
        comments: Description,
        options: ParserOptions,
    ) -> Result<Self, GrammarError> {
        let mut parser = Self::new(root, options)?;

        let comments_root = {
            let mut builder = Builder::new(&mut parser.arena, parser.ignore_case);
            let id = builder.build(&comments)?;
            builder.finish()?;
            id
        };
        while parser.memo.len() < parser.arena.len() {
            parser.memo.push(HashMap::new());
        }

        check_comments_model(&parser.arena, comments_root)?;
        parser.comments_model = Some(comments_root);
        Ok(parser)
    }

    /// Resets position and memo tables, then evaluates the root
    /// expression (spec.md §6 `parse`). On success, returns the root
    /// parse-tree node; on failure, the best-so-far failure record.
    pub fn parse(&mut self, input: impl Into<String>) -> Result<&ParseTreeNode, NoMatch> {
        self.input = input.into();
        self.position = 0;
        self.nm = None;
        self.line_ends.clear();
        self.in_lex_rule = false;
        self.in_parse_comment = false;
        self.last_expression = None;
        for slot in &mut self.memo {
            slot.clear();
        }

        let root = self.root;
        match self.eval(root) {
            Ok(value) => {
                let tree = value_to_root_tree(value, &self.arena[root.0]);
                self.parse_tree = Some(tree);
                Ok(self.parse_tree.as_ref().unwrap())
            }
            Err(nm) => {
                self.parse_tree = None;
                Err(nm)
            }
        }
    }

    /// Walks the existing parse tree with `sem_actions` (or the table
    /// registered during [`Parser::new`] if none is given), producing an
    /// Abstract Semantic Graph (spec.md §4.6, §6 `getASG`).
    pub fn get_asg(
        &self,
        sem_actions: Option<&HashMap<String, Rc<dyn SemanticAction>>>,
    ) -> Result<Asg, ParseError> {
        let tree = self.parse_tree.as_ref().ok_or(ParseError::NoParseTree)?;
        let actions = match sem_actions {
            Some(actions) => actions,
            None => {
                if self.sem_actions.is_empty() {
                    return Err(ParseError::NoSemanticActions);
                }
                &self.sem_actions
            }
        };
        Ok(semantics::walk(self, tree, actions))
    }

    pub fn parse_tree(&self) -> Option<&ParseTreeNode> {
        self.parse_tree.as_ref()
    }

    /// 1-based (line, column) for `pos` (spec.md §6 `pos_to_linecol`).
    pub fn pos_to_linecol(&mut self, pos: usize) -> (usize, usize) {
        diagnostics::pos_to_linecol(&self.input, &mut self.line_ends, pos)
    }

    /// Up to ten code units of context on each side of `position`
    /// (defaulting to the parser's current position), optionally marking
    /// a span of `length` (spec.md §6 `context`).
    pub fn context(&self, length: Option<usize>, position: Option<usize>) -> String {
        diagnostics::context(&self.input, length, position.unwrap_or(self.position))
    }

    /// Renders the human-readable form of a failure record (spec.md §6
    /// "Failure record contract"):
    /// `Expected '<name>' at position (<line>, <col>) => '<context>'`.
    pub fn describe_failure(&mut self, nm: &NoMatch) -> String {
        let (line, col) = self.pos_to_linecol(nm.position);
        let ctx = self.context(None, Some(nm.position));
        format!(
            "Expected '{}' at position ({}, {}) => '{}'",
            nm.expected, line, col, ctx
        )
    }
}

/// Converts the root expression's raw evaluation result into the final
/// parse-tree root, for the case where `reduce_tree` unwrapped a
/// single-child root into a bare non-`NonTerminal` value, or the root
/// itself is a `Match` kind whose result is already a `Terminal`.
fn value_to_root_tree(value: MatchValue, _root_node: &ExprNode) -> ParseTreeNode {
    match value {
        MatchValue::One(node) => node,
        MatchValue::None => ParseTreeNode::NonTerminal(NonTerminal::new("", 0, Vec::new())),
        MatchValue::List(items) => {
            let children = MatchValue::List(items).flatten();
            ParseTreeNode::NonTerminal(NonTerminal::new("", 0, children))
        }
    }
}
