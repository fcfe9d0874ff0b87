//! End-to-end scenarios (spec.md §8 "End-to-end scenarios (literal)").
//!
//! Each test builds its grammar directly with the public combinator API
//! and drives a full [`Parser::parse`] call, checking the shape of the
//! resulting parse tree or failure record.

use indoc::indoc;
use pegrat::{
    choice, combine, eof, one_or_more, opt, regex, rule, seq, str_match, zero_or_more, Description,
    ParseTreeNode, Parser, ParserOptions,
};

fn parse(root: Description, input: &str) -> Result<ParseTreeNode, pegrat::NoMatch> {
    let mut parser = Parser::new(root, ParserOptions::default()).expect("valid grammar");
    parser.parse(input).cloned()
}

// 1. S <- 'a' 'b'
fn ab_grammar() -> Description {
    rule("S", || seq([str_match("a"), str_match("b")]))
}

#[test]
fn sequence_matches_both_literals() {
    let tree = parse(ab_grammar(), "ab").expect("matches");
    let nt = tree.as_nonterminal().expect("root is a NonTerminal");
    assert_eq!(nt.rule, "S");
    assert_eq!(nt.children.len(), 2);
    assert_eq!(nt.children[0].as_terminal().unwrap().value, "a");
    assert_eq!(nt.children[1].as_terminal().unwrap().value, "b");
}

#[test]
fn sequence_reports_second_literal_on_mismatch() {
    let err = parse(ab_grammar(), "ac").unwrap_err();
    assert_eq!(err.expected, "b");
    assert_eq!(err.position, 1);
}

#[test]
fn sequence_reports_second_literal_on_truncated_input() {
    let err = parse(ab_grammar(), "a").unwrap_err();
    assert_eq!(err.expected, "b");
    assert_eq!(err.position, 1);
}

// 2. S <- 'a'+
fn a_plus_grammar() -> Description {
    rule("S", || one_or_more(str_match("a")))
}

#[test]
fn one_or_more_requires_at_least_one_match() {
    let err = parse(a_plus_grammar(), "").unwrap_err();
    assert_eq!(err.expected, "a");
    assert_eq!(err.position, 0);
}

#[test]
fn one_or_more_collects_every_repetition() {
    let tree = parse(a_plus_grammar(), "aaa").expect("matches");
    let nt = tree.as_nonterminal().unwrap();
    assert_eq!(nt.children.len(), 3);
    assert!(nt.children.iter().all(|c| c.as_terminal().unwrap().value == "a"));
}

#[test]
fn one_or_more_stops_at_first_non_match_leaving_trailing_input() {
    let mut parser = Parser::new(a_plus_grammar(), ParserOptions::default()).unwrap();
    let tree = parser.parse("aab").expect("matches the two leading a's");
    assert_eq!(tree.as_nonterminal().unwrap().children.len(), 2);

    let err = parse(seq([a_plus_grammar(), eof()]), "aab").unwrap_err();
    assert_eq!(err.expected, "EOF");
    assert_eq!(err.position, 2);
}

// 3. S <- 'a' / 'b'
fn choice_grammar() -> Description {
    rule("S", || choice([str_match("a"), str_match("b")]))
}

#[test]
fn ordered_choice_matches_second_alternative() {
    let tree = parse(choice_grammar(), "b").expect("matches");
    assert_eq!(tree.as_terminal().unwrap().value, "b");
}

#[test]
fn ordered_choice_failure_is_rewritten_to_the_rule_name() {
    let err = parse(choice_grammar(), "c").unwrap_err();
    assert_eq!(err.expected, "S");
    assert_eq!(err.position, 0);
}

// 4. E <- T ('+' T)*; T <- r'\d+', default whitespace skipping.
fn sum_grammar() -> Description {
    rule("E", || {
        seq([term(), zero_or_more(seq([str_match("+"), term()]))])
    })
}

fn term() -> Description {
    rule("T", || regex(r"\d+"))
}

#[test]
fn whitespace_is_skipped_between_tokens() {
    let tree = parse(sum_grammar(), "1 + 2 +  3").expect("matches");
    let nt = tree.as_nonterminal().unwrap();
    let digits: Vec<&str> = nt
        .children
        .iter()
        .filter(|c| c.rule() == "T")
        .map(|c| c.as_terminal().unwrap().value.as_str())
        .collect();
    assert_eq!(digits, vec!["1", "2", "3"]);
    let pluses = nt.children.iter().filter(|c| c.as_terminal().map(|t| t.value == "+").unwrap_or(false)).count();
    assert_eq!(pluses, 2);
}

// 5. ident <- Combine(letter letter_or_digit*)
fn ident_grammar() -> Description {
    rule("ident", || {
        combine(seq([
            regex(r"[A-Za-z]"),
            zero_or_more(regex(r"[A-Za-z0-9]")),
        ]))
    })
}

#[test]
fn combine_produces_a_single_unsplit_terminal() {
    let mut parser = Parser::new(ident_grammar(), ParserOptions::default()).unwrap();
    let tree = parser.parse("foo bar").expect("matches the leading word");
    let terminal = tree.as_terminal().expect("Combine collapses to one Terminal");
    assert_eq!(terminal.value, "foo");
    assert_eq!(terminal.position, 0);
}

// 6. comment <- '//' r'[^\n]*'; S <- 'a' 'b'
fn comment_grammar() -> Description {
    rule("comment", || combine(seq([str_match("//"), regex(r"[^\n]*")])))
}

#[test]
fn comments_are_skipped_and_attached_to_the_next_terminal() {
    let mut parser =
        Parser::with_comments(ab_grammar(), comment_grammar(), ParserOptions::default())
            .expect("non-nullable comment model builds");
    let tree = parser.parse("a // note\nb").expect("matches past the comment");
    let nt = tree.as_nonterminal().unwrap();
    let b = &nt.children[1];
    assert_eq!(b.as_terminal().unwrap().value, "b");
    let comments = b.comments().expect("comment subtree attached to 'b'");
    assert_eq!(comments.to_string().trim(), "// note");
}

#[test]
fn nullable_comment_model_is_rejected_at_build_time() {
    let nullable_comment = rule("comment", || opt(str_match("//")));
    let err = Parser::with_comments(ab_grammar(), nullable_comment, ParserOptions::default())
        .unwrap_err();
    assert_eq!(err, pegrat::GrammarError::NullableCommentsModel);
}

// Testable properties beyond the six literal scenarios.

#[test]
fn backtracking_restores_position_on_failure() {
    // A choice whose first alternative consumes input and then fails must
    // leave the second alternative to try from the original entry position.
    let grammar = rule("S", || {
        choice([
            seq([str_match("a"), str_match("x")]),
            seq([str_match("a"), str_match("b")]),
        ])
    });
    let tree = parse(grammar, "ab").expect("second alternative matches from position 0");
    assert_eq!(
        tree.as_nonterminal().unwrap().children[1]
            .as_terminal()
            .unwrap()
            .value,
        "b"
    );
}

#[test]
fn repeated_parses_of_the_same_input_are_identical() {
    let mut parser = Parser::new(sum_grammar(), ParserOptions::default()).unwrap();
    let first = parser.parse("1 + 2 +  3").unwrap().clone();
    let second = parser.parse("1 + 2 +  3").unwrap().clone();
    assert_eq!(first, second);
}

#[test]
fn parses_a_multiline_arithmetic_style_grammar_via_indoc_literal() {
    // Exercises a larger, indented grammar description the way a real
    // grammar source naturally reads, via a left-factored digit-list rule.
    let digits = indoc! {"
        1, 22, 333
    "};
    let list = rule("list", || {
        seq([
            regex(r"\d+"),
            zero_or_more(seq([str_match(","), regex(r"\d+")])),
        ])
    });
    let tree = parse(list, digits.trim()).expect("matches a comma-separated digit list");
    let nt = tree.as_nonterminal().unwrap();
    let values: Vec<&str> = nt
        .children
        .iter()
        .filter_map(ParseTreeNode::as_terminal)
        .filter(|t| t.value != ",")
        .map(|t| t.value.as_str())
        .collect();
    assert_eq!(values, vec!["1", "22", "333"]);
}

#[test]
fn empty_choice_is_always_failing_not_a_build_error() {
    let grammar = rule("S", || choice(Vec::<Description>::new()));
    let err = parse(grammar, "anything").unwrap_err();
    assert_eq!(err.expected, "S");
}
