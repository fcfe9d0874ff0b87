//! The recursive evaluation engine (spec.md §4.1-§4.4): walks the
//! expression graph against the input string, backtracking on failure and
//! memoizing every (node, position) pair it visits.
//!
//! Grounded in `original_source/arpeggio/__init__.py`'s
//! `ParsingExpression.parse`/`_parse` split: a generic wrapper
//! (`Parser::eval` here) handles whitespace skipping, memoization,
//! best-failure tracking and root-wrapping once, while each `ExprKind`
//! contributes only its own matching logic (`Parser::eval_kind`). The
//! teacher's `backtracking_parser.rs` contributes the
//! `stacker::maybe_grow` recursion guard and the address-keyed memo
//! table shape (generalized here from `ByAddress<&RuleExpression>` to a
//! plain `ExprId`, since the arena already gives every node a stable,
//! hashable identity).

use crate::error::NoMatch;
use crate::expr::{ExprId, ExprKind, MatchValue};
use crate::tree::{NonTerminal, ParseTreeNode, Terminal};
use crate::Parser;

/// Node kinds whose generic wrapper updates `last_expression` to
/// themselves before dispatching to children. In the original, every
/// `ParsingExpression` subclass does this in its `parse()` wrapper -
/// except `Match` and its subclasses (`StrMatch`, `RegExMatch`,
/// `EndOfFile`), which override `parse()` entirely and never touch
/// `_last_pexpression`. So by the time a leaf match runs, the value it
/// reads is whatever non-leaf ancestor last set it - which is exactly
/// what `StrMatch`'s suppression check (spec.md §9, "immediately
/// enclosing expression is a `Sequence`") needs to see.
fn is_container_kind(kind: &ExprKind) -> bool {
    !matches!(
        kind,
        ExprKind::StrMatch(_)
            | ExprKind::RegExMatch(_)
            | ExprKind::EndOfFile
            | ExprKind::Placeholder { .. }
    )
}

impl Parser {
    /// The generic wrapper every expression node goes through
    /// (`ParsingExpression.parse`): whitespace skip, memo lookup/store,
    /// root-wrapping, and the "moving up" bookkeeping used to generalize a
    /// failure's rule name to the nearest enclosing rule. Guarded by
    /// `stacker::maybe_grow` since grammars can recurse arbitrarily deep
    /// (teacher's `backtracking_parser.rs::parse_expr`).
    pub(crate) fn eval(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.eval_inner(id))
    }

    fn eval_inner(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        if !self.in_lex_rule {
            self.skip_ws();
        }

        let c_pos = self.position;
        let in_lex_rule = self.in_lex_rule;

        if let Some(slot) = self.memo[id.0].get(&(c_pos, in_lex_rule)) {
            if self.debug {
                log::trace!("memo hit: {} @ {c_pos}", self.arena[id.0].name());
            }
            let slot = slot.clone();
            return match slot {
                Ok((value, new_pos)) => {
                    self.position = new_pos;
                    Ok(value)
                }
                Err(nm) => {
                    self.record_failure(nm.clone());
                    Err(nm)
                }
            };
        }

        if self.debug {
            log::trace!("enter: {} @ {c_pos}", self.arena[id.0].name());
        }

        let previous_last = self.last_expression;
        if is_container_kind(&self.arena[id.0].kind) {
            self.last_expression = Some(id);
        }

        let outcome = self.eval_kind(id);
        self.last_expression = previous_last;

        let result = match outcome {
            Ok(value) => {
                let node = &self.arena[id.0];
                let value = if node.root {
                    self.wrap_root(id, c_pos, value)
                } else {
                    value
                };
                if self.debug {
                    log::debug!(
                        "match: {} @ {c_pos}..{}",
                        self.arena[id.0].name(),
                        self.position
                    );
                }
                self.memo[id.0].insert((c_pos, in_lex_rule), Ok((value.clone(), self.position)));
                Ok(value)
            }
            Err(nm) => {
                if self.debug {
                    log::debug!("fail: {} @ {c_pos}", self.arena[id.0].name());
                }
                self.position = c_pos;
                self.memo[id.0].insert((c_pos, in_lex_rule), Err(nm.clone()));
                Err(nm)
            }
        };

        result
    }

    /// Wraps a rule root's raw result in a `NonTerminal` (spec.md §4.1
    /// "root-wrapping"), honoring `reduce_tree`'s single-child collapse.
    /// Skipped if the result is already a `Terminal` - a rule root whose
    /// body is itself a `Match` kind produces its own terminal directly.
    fn wrap_root(&self, id: ExprId, c_pos: usize, value: MatchValue) -> MatchValue {
        if matches!(value, MatchValue::One(ParseTreeNode::Terminal(_))) || !value.is_truthy() {
            return value;
        }
        let rule_name = self.arena[id.0].rule.clone().unwrap_or_default();
        if self.reduce_tree {
            let flat = value.flatten();
            if flat.len() == 1 {
                return MatchValue::One(flat.into_iter().next().unwrap());
            }
            MatchValue::One(ParseTreeNode::NonTerminal(NonTerminal::new(
                rule_name, c_pos, flat,
            )))
        } else {
            let flat = value.flatten();
            MatchValue::One(ParseTreeNode::NonTerminal(NonTerminal::new(
                rule_name, c_pos, flat,
            )))
        }
    }

    /// Dispatches to the matching logic for one `ExprKind` (the original's
    /// per-class `_parse` methods).
    fn eval_kind(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        match self.arena[id.0].kind.clone() {
            ExprKind::Placeholder { rule_name } => {
                unreachable!("unresolved placeholder '{rule_name}' escaped the builder")
            }
            ExprKind::Sequence => self.eval_sequence(id),
            ExprKind::OrderedChoice => self.eval_choice(id),
            ExprKind::Optional => self.eval_optional(id),
            ExprKind::ZeroOrMore => self.eval_zero_or_more(id),
            ExprKind::OneOrMore => self.eval_one_or_more(id),
            ExprKind::And => self.eval_and(id),
            ExprKind::Not => self.eval_not(id),
            ExprKind::Empty => Ok(MatchValue::None),
            ExprKind::Combine => self.eval_combine(id),
            ExprKind::StrMatch(data) => self.eval_str_match(id, &data),
            ExprKind::RegExMatch(data) => self.eval_regex_match(id, &data),
            ExprKind::EndOfFile => self.eval_eof(),
        }
    }

    fn eval_sequence(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let children = self.arena[id.0].children.clone();
        let mut results = Vec::with_capacity(children.len());
        for child in children {
            match self.eval(child) {
                Ok(value) => {
                    if value.is_truthy() {
                        results.push(value);
                    }
                }
                Err(nm) => {
                    self.change_rule_on_the_way_up(id, &nm);
                    return Err(nm);
                }
            }
        }
        Ok(MatchValue::List(results))
    }

    fn eval_choice(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let children = self.arena[id.0].children.clone();
        let c_pos = self.position;
        let mut last_nm = None;
        for child in children {
            self.position = c_pos;
            match self.eval(child) {
                Ok(value) => return Ok(value),
                Err(nm) => {
                    self.change_rule_on_the_way_up(id, &nm);
                    last_nm = Some(nm);
                }
            }
        }
        self.position = c_pos;
        Err(last_nm.unwrap_or_else(|| NoMatch::new(self.arena[id.0].name(), c_pos)))
    }

    fn eval_optional(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let child = self.arena[id.0].children[0];
        let c_pos = self.position;
        match self.eval(child) {
            Ok(value) => Ok(value),
            Err(_) => {
                self.position = c_pos;
                Ok(MatchValue::None)
            }
        }
    }

    fn eval_zero_or_more(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let child = self.arena[id.0].children[0];
        let mut results = Vec::new();
        loop {
            let c_pos = self.position;
            match self.eval(child) {
                Ok(value) => {
                    let zero_length = self.position == c_pos;
                    results.push(value);
                    if zero_length {
                        break;
                    }
                }
                Err(_) => {
                    self.position = c_pos;
                    break;
                }
            }
        }
        Ok(MatchValue::List(results))
    }

    fn eval_one_or_more(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let child = self.arena[id.0].children[0];
        let mut results = Vec::new();
        let mut matched_once = false;
        loop {
            let c_pos = self.position;
            match self.eval(child) {
                Ok(value) => {
                    matched_once = true;
                    let zero_length = self.position == c_pos;
                    results.push(value);
                    if zero_length {
                        break;
                    }
                }
                Err(nm) => {
                    self.position = c_pos;
                    if !matched_once {
                        return Err(nm);
                    }
                    break;
                }
            }
        }
        Ok(MatchValue::List(results))
    }

    fn eval_and(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let children = self.arena[id.0].children.clone();
        let c_pos = self.position;
        for child in children {
            if let Err(nm) = self.eval(child) {
                self.position = c_pos;
                return Err(nm);
            }
        }
        self.position = c_pos;
        Ok(MatchValue::None)
    }

    fn eval_not(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let children = self.arena[id.0].children.clone();
        let c_pos = self.position;
        for child in children {
            if self.eval(child).is_err() {
                self.position = c_pos;
                return Ok(MatchValue::None);
            }
        }
        self.position = c_pos;
        Err(self.raise(self.arena[id.0].name(), c_pos))
    }

    fn eval_combine(&mut self, id: ExprId) -> Result<MatchValue, NoMatch> {
        let children = self.arena[id.0].children.clone();
        let old_in_lex_rule = self.in_lex_rule;
        self.in_lex_rule = true;
        let c_pos = self.position;

        let mut results = Vec::with_capacity(children.len());
        for child in children {
            match self.eval(child) {
                Ok(value) => results.push(value),
                Err(nm) => {
                    self.in_lex_rule = old_in_lex_rule;
                    self.position = c_pos;
                    return Err(nm);
                }
            }
        }
        self.in_lex_rule = old_in_lex_rule;

        let rule_name = if self.arena[id.0].root {
            self.arena[id.0].rule.clone().unwrap_or_default()
        } else {
            String::new()
        };
        let text: String = MatchValue::List(results)
            .flatten()
            .into_iter()
            .map(|node| node.to_string())
            .collect();
        Ok(MatchValue::One(ParseTreeNode::Terminal(Terminal::new(
            rule_name, c_pos, text,
        ))))
    }

    fn eval_str_match(
        &mut self,
        id: ExprId,
        data: &crate::expr::StrMatchData,
    ) -> Result<MatchValue, NoMatch> {
        self.match_with_comment_retry(id, |this| {
            let c_pos = this.position;
            let frag_end = (c_pos + data.literal.len()).min(this.input.len());
            let frag = this.input.get(c_pos..frag_end).unwrap_or("");
            let matched = if data.ignore_case {
                frag.eq_ignore_ascii_case(&data.literal)
            } else {
                frag == data.literal
            };
            if matched {
                this.position += data.literal.len();
                let rule_name = if this.arena[id.0].root {
                    this.arena[id.0].rule.clone().unwrap_or_default()
                } else {
                    String::new()
                };
                let suppress = this
                    .last_expression
                    .is_some_and(|e| matches!(this.arena[e.0].kind, ExprKind::Sequence));
                let terminal = Terminal::new(rule_name, c_pos, data.literal.clone())
                    .suppressed(suppress);
                Ok(MatchValue::One(ParseTreeNode::Terminal(terminal)))
            } else {
                Err(this.raise(data.literal.clone(), c_pos))
            }
        })
    }

    fn eval_regex_match(
        &mut self,
        id: ExprId,
        data: &crate::expr::RegExMatchData,
    ) -> Result<MatchValue, NoMatch> {
        self.match_with_comment_retry(id, |this| {
            let c_pos = this.position;
            match data.regex.find(&this.input[c_pos..]) {
                Some(m) if m.start() == 0 => {
                    let matched = m.as_str().to_string();
                    this.position += matched.len();
                    let rule_name = if this.arena[id.0].root {
                        this.arena[id.0].rule.clone().unwrap_or_default()
                    } else {
                        String::new()
                    };
                    Ok(MatchValue::One(ParseTreeNode::Terminal(Terminal::new(
                        rule_name, c_pos, matched,
                    ))))
                }
                _ => Err(this.raise(data.pattern.clone(), c_pos)),
            }
        })
    }

    fn eval_eof(&mut self) -> Result<MatchValue, NoMatch> {
        self.match_with_comment_retry(ExprId(usize::MAX), |this| {
            let c_pos = this.position;
            if c_pos == this.input.len() {
                Ok(MatchValue::One(ParseTreeNode::Terminal(
                    Terminal::new("EOF", c_pos, "").suppressed(true),
                )))
            } else {
                Err(this.raise("EOF", c_pos))
            }
        })
    }

    /// Mirrors `Match.parse`: tries `attempt`, and on failure - unless
    /// already inside a comment retry, or inside a lexical rule, or no
    /// comments model is registered - tries to consume one or more
    /// comments and retries once. `id` is unused by `EndOfFile`'s caller
    /// (it passes a dummy id since EOF has no arena-level suppression
    /// rule to honor); every other caller's closure captures `id`.
    fn match_with_comment_retry(
        &mut self,
        _id: ExprId,
        attempt: impl Fn(&mut Self) -> Result<MatchValue, NoMatch>,
    ) -> Result<MatchValue, NoMatch> {
        if self.in_parse_comment {
            return attempt(self);
        }

        let c_pos = self.position;
        match attempt(self) {
            Ok(value) => Ok(value),
            Err(nm) => {
                if self.in_lex_rule || self.comments_model.is_none() {
                    return Err(nm);
                }

                let comments_root = self.comments_model.unwrap();
                self.in_parse_comment = true;
                let mut comments = Vec::new();
                loop {
                    match self.eval(comments_root) {
                        Ok(value) => {
                            comments.push(value);
                            self.skip_ws();
                        }
                        Err(_) => break,
                    }
                }
                self.in_parse_comment = false;

                if comments.is_empty() {
                    return Err(nm);
                }

                match attempt(self) {
                    Ok(mut value) => {
                        let flat = MatchValue::List(comments).flatten();
                        let comment_node = ParseTreeNode::NonTerminal(NonTerminal::new(
                            "comment", c_pos, flat,
                        ));
                        if let MatchValue::One(node) = &mut value {
                            node.set_comments(comment_node);
                        }
                        Ok(value)
                    }
                    Err(nm2) => Err(nm2),
                }
            }
        }
    }

    fn skip_ws(&mut self) {
        if !self.skipws {
            return;
        }
        while self.position < self.input.len()
            && self
                .ws
                .contains(self.input.as_bytes()[self.position] as char)
        {
            self.position += 1;
        }
    }

    /// Records `nm` as the new best failure if the input consumed so far
    /// exceeds the previous record, and always returns the merged record -
    /// mirrors `Parser._nm_raise` (spec.md §4.4 "best-failure tracking").
    pub(crate) fn raise(&mut self, expected: impl Into<String>, position: usize) -> NoMatch {
        let candidate = NoMatch::new(expected, position);
        self.record_failure(candidate.clone());
        self.nm.clone().unwrap_or(candidate)
    }

    fn record_failure(&mut self, nm: NoMatch) {
        if self.in_parse_comment {
            return;
        }
        match &self.nm {
            // A strictly further failure always wins. At an equal position
            // the later failure wins too: it's the one still live higher up
            // the call stack (e.g. an `eof()` checked after a repetition
            // gives up), so it's the more useful diagnostic.
            Some(existing) if existing.position > nm.position => {}
            _ => self.nm = Some(nm),
        }
    }

    /// Generalizes a failure's expected-name to the nearest enclosing rule
    /// when no input was consumed past the failure and we are still
    /// "moving up" the model (spec.md §4.4 `_nm_change_rule`).
    fn change_rule_on_the_way_up(&mut self, id: ExprId, nm: &NoMatch) {
        let node = &self.arena[id.0];
        if node.root && self.position == nm.position {
            if let (Some(rule_name), Some(recorded)) = (&node.rule, &mut self.nm) {
                if recorded.position == nm.position {
                    recorded.expected = rule_name.clone();
                }
            }
        }
    }
}
