//! Conservative nullability check used only to reject comment models that
//! could match the empty string (spec.md §9 Design Notes: "the source's
//! comment-retry path assumes the comment model never consumes input
//! without succeeding... reject such comment models at build time").
//!
//! This is a structural approximation, not a full PEG nullability
//! analysis: `RegExMatch` nullability is decided by testing the compiled
//! regex against the empty string, and rule cycles are broken by treating
//! a revisited rule as non-nullable (a comment grammar recursing back into
//! itself without consuming input would already be a dubious grammar).

use super::{ExprId, ExprKind, ExprNode};
use std::collections::HashSet;

pub fn is_nullable(arena: &[ExprNode], id: ExprId) -> bool {
    let mut visiting = HashSet::new();
    nullable_rec(arena, id, &mut visiting)
}

fn nullable_rec(arena: &[ExprNode], id: ExprId, visiting: &mut HashSet<usize>) -> bool {
    if !visiting.insert(id.0) {
        return false;
    }
    let node = &arena[id.0];
    let result = match &node.kind {
        ExprKind::Placeholder { .. } => false,
        ExprKind::Sequence => node
            .children
            .iter()
            .all(|&c| nullable_rec(arena, c, visiting)),
        ExprKind::OrderedChoice => {
            !node.children.is_empty()
                && node
                    .children
                    .iter()
                    .any(|&c| nullable_rec(arena, c, visiting))
        }
        ExprKind::Optional => true,
        ExprKind::ZeroOrMore => true,
        ExprKind::OneOrMore => node
            .children
            .first()
            .is_some_and(|&c| nullable_rec(arena, c, visiting)),
        ExprKind::And => true,
        ExprKind::Not => true,
        ExprKind::Empty => true,
        ExprKind::Combine => node
            .children
            .iter()
            .all(|&c| nullable_rec(arena, c, visiting)),
        ExprKind::StrMatch(data) => data.literal.is_empty(),
        ExprKind::RegExMatch(data) => data.regex.is_match(""),
        ExprKind::EndOfFile => true,
    };
    visiting.remove(&id.0);
    result
}
