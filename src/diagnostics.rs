//! Position -> (line, column) mapping and context-window snippets
//! (spec.md §4.4).
//!
//! Positions are byte offsets into the input (spec.md §1 Non-goals:
//! "input is treated as a sequence of code units" - no Unicode
//! normalization or codepoint accounting is attempted). Slicing is
//! adjusted to the nearest UTF-8 char boundary so a context window never
//! panics on multi-byte input; that's the one concession this module makes
//! beyond the original's plain code-unit indexing.

/// Lazily populates `line_ends` with the byte offset of every `\n` in
/// `input`, once per parse run (spec.md §4.4, §5 "rebuilt per parse run").
pub fn ensure_line_ends(input: &str, line_ends: &mut Vec<usize>) {
    if !line_ends.is_empty() || !input.as_bytes().contains(&b'\n') {
        return;
    }
    line_ends.extend(
        input
            .bytes()
            .enumerate()
            .filter(|&(_, b)| b == b'\n')
            .map(|(i, _)| i),
    );
}

/// 1-based (line, column) for `pos`, using binary search over the
/// lazily-built newline index (spec.md §4.4).
pub fn pos_to_linecol(input: &str, line_ends: &mut Vec<usize>, pos: usize) -> (usize, usize) {
    ensure_line_ends(input, line_ends);

    let line = line_ends.partition_point(|&end| end < pos);
    let mut col = pos;
    if line > 0 {
        col -= line_ends[line - 1];
        if matches!(input.as_bytes().get(line_ends[line - 1]), Some(b'\n' | b'\r')) {
            col -= 1;
        }
    }
    (line + 1, col + 1)
}

fn floor_boundary(input: &str, mut idx: usize) -> usize {
    idx = idx.min(input.len());
    while idx > 0 && !input.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Up to ten code units of context on each side of `position`. If
/// `length` is given, the substring of that length starting at `position`
/// is marked off with `*` on either side (spec.md §4.4, §6).
pub fn context(input: &str, length: Option<usize>, position: usize) -> String {
    let position = position.min(input.len());
    let before_start = floor_boundary(input, position.saturating_sub(10));
    let before = &input[before_start..floor_boundary(input, position)];

    match length {
        Some(len) => {
            let mid_end = floor_boundary(input, position + len);
            let mid = &input[floor_boundary(input, position)..mid_end];
            // Absolute, like the original's `input[position+length:position+10]` -
            // ten code units past `position`, not past the marked span's end, so
            // this is empty once the span itself is already that long.
            let after_end = floor_boundary(input, position + 10).max(mid_end);
            let after = &input[mid_end..after_end];
            format!("{before}*{mid}*{after}")
        }
        None => {
            let after_end = floor_boundary(input, position + 10);
            let after = &input[floor_boundary(input, position)..after_end];
            format!("{before}*{after}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_first_column() {
        let mut line_ends = Vec::new();
        assert_eq!(pos_to_linecol("abc", &mut line_ends, 0), (1, 1));
    }

    #[test]
    fn after_newline_resets_column() {
        let mut line_ends = Vec::new();
        let input = "ab\ncd";
        // position 3 is 'c', right after the newline at offset 2.
        assert_eq!(pos_to_linecol(input, &mut line_ends, 3), (2, 1));
    }

    #[test]
    fn context_marks_span() {
        let ctx = context("0123456789abcdefghij", Some(3), 10);
        assert_eq!(ctx, "0123456789*abc*defghij");
    }
}
