//! Two-pass semantic-action walker (spec.md §4.6).
//!
//! Builds an Abstract Semantic Graph out of a parse tree by invoking a
//! per-rule `SemanticAction` in post-order, then running any actions that
//! asked for a second pass in first-pass-completion order. Grounded in
//! `original_source/arpeggio/__init__.py`'s `Parser.getASG`/`tree_walk` for
//! the exact traversal order, which spec.md §5 calls out as part of the
//! observable contract.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::tree::ParseTreeNode;
use crate::Parser;

/// Anything a first-pass reduction can produce. ASG nodes are
/// user-defined (spec.md §3 "ASG nodes are user-defined"), so the walker
/// is generic over a boxed `Any` rather than a fixed type.
pub type Asg = Rc<dyn Any>;

/// Per-rule semantic action. `first_pass` is required; `second_pass` is
/// optional (rules that want forward-reference linking implement it and
/// report `wants_second_pass() -> true`). Rust traits can't expose a
/// conditionally-present method the way Python's `hasattr(sem_action,
/// "second_pass")` check does, so the capability is split into an
/// explicit predicate plus a default no-op body - the resolution to the
/// Open Question spec.md §9 leaves unspecified, recorded in DESIGN.md.
pub trait SemanticAction {
    fn first_pass(&self, parser: &Parser, node: &ParseTreeNode, children: Vec<Asg>) -> Asg;

    fn wants_second_pass(&self) -> bool {
        false
    }

    fn second_pass(&self, _parser: &Parser, _first_pass_result: Asg) {}
}

/// The default reduction applied when a node's rule has no registered
/// action (spec.md §4.6 bullet list).
pub struct DefaultAction;

impl SemanticAction for DefaultAction {
    fn first_pass(&self, _parser: &Parser, node: &ParseTreeNode, children: Vec<Asg>) -> Asg {
        match node {
            ParseTreeNode::Terminal(t) => {
                if t.suppress {
                    Rc::new(())
                } else {
                    Rc::new(t.value.clone())
                }
            }
            ParseTreeNode::NonTerminal(nt) => {
                if children.len() == 1 {
                    return children.into_iter().next().unwrap();
                }
                let mut last_non_str: Option<Asg> = None;
                let mut multiple_non_str = false;
                for c in &children {
                    if c.downcast_ref::<String>().is_none() {
                        if last_non_str.is_some() {
                            multiple_non_str = true;
                            break;
                        }
                        last_non_str = Some(c.clone());
                    }
                }
                if multiple_non_str {
                    Rc::new(nt.to_string())
                } else if let Some(v) = last_non_str {
                    v
                } else {
                    // No non-string child survived (all were suppressed
                    // terminals or themselves suppressed) - this reduction
                    // is suppressed too, not a joined literal.
                    Rc::new(())
                }
            }
        }
    }
}

/// Returns the sentinel produced for a suppressed terminal, so callers can
/// tell "suppressed" apart from a reduction that legitimately produced
/// `()`. The default action only ever produces this sentinel for
/// suppressed terminals, so identity of the dynamic type is enough.
pub fn is_suppressed(value: &Asg) -> bool {
    value.downcast_ref::<()>().is_some()
}

/// Runs the two-pass walk described in spec.md §4.6 and returns the
/// first-pass result for the root node.
pub fn walk(
    parser: &Parser,
    root: &ParseTreeNode,
    actions: &HashMap<String, Rc<dyn SemanticAction>>,
) -> Asg {
    let mut for_second_pass: Vec<(String, Asg)> = Vec::new();
    let result = stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
        tree_walk(parser, root, actions, &mut for_second_pass)
    });

    for (rule_name, asg_node) in for_second_pass {
        if let Some(action) = actions.get(&rule_name) {
            action.second_pass(parser, asg_node);
        }
    }

    result
}

fn tree_walk(
    parser: &Parser,
    node: &ParseTreeNode,
    actions: &HashMap<String, Rc<dyn SemanticAction>>,
    for_second_pass: &mut Vec<(String, Asg)>,
) -> Asg {
    let mut children = Vec::new();
    if let ParseTreeNode::NonTerminal(nt) = node {
        for child in &nt.children {
            let child_result = stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
                tree_walk(parser, child, actions, for_second_pass)
            });
            if !is_suppressed(&child_result) {
                children.push(child_result);
            }
        }
    }

    let rule = node.rule();
    let retval = if let Some(action) = actions.get(rule) {
        let retval = action.first_pass(parser, node, children);
        if action.wants_second_pass() {
            for_second_pass.push((rule.to_string(), retval.clone()));
        }
        retval
    } else {
        DefaultAction.first_pass(parser, node, children)
    };

    retval
}
