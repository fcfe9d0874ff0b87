//! A grammar for PEG notation, written using this crate's own combinators -
//! "PEG can be used to describe PEG" (`original_source/examples/peg_peg.py`).
//!
//! This module builds the parser model only; it does not implement the
//! textual-PEG-to-expression-graph front-end (`ParserPEG` in the original),
//! which is explicitly out of scope (spec.md §1) - that piece turns a
//! successful parse of a `.peg` source into a *new* expression graph via
//! semantic actions, and is a client of this core rather than part of it.
//! What's demonstrated here is the parse-tree half of spec.md §8's
//! "PEG self-description" property: this grammar, built with [`grammar`],
//! successfully parses its own textual rendition ([`SELF_DESCRIPTION`]).

use crate::builder::{
    choice, combine, eof, one_or_more, opt, regex, rule, seq, str_match, zero_or_more, Description,
};

/// The root rule: one or more rule definitions followed by end of input.
pub fn grammar() -> Description {
    rule("peggrammar", || seq([one_or_more(rule_def()), eof()]))
}

fn rule_def() -> Description {
    rule("rule", || {
        seq([rule_name(), left_arrow(), ordered_choice(), str_match(";")])
    })
}

fn ordered_choice() -> Description {
    rule("ordered_choice", || {
        seq([sequence(), zero_or_more(seq([slash(), sequence()]))])
    })
}

fn sequence() -> Description {
    rule("sequence", || one_or_more(prefix()))
}

fn prefix() -> Description {
    rule("prefix", || {
        seq([opt(choice([and_op(), not_op()])), sufix()])
    })
}

fn sufix() -> Description {
    rule("sufix", || {
        seq([
            expression(),
            opt(choice([question(), star(), plus()])),
        ])
    })
}

fn expression() -> Description {
    rule("expression", || {
        choice([
            regex_literal(),
            rule_crossref(),
            seq([open_paren(), ordered_choice(), close_paren()]),
            str_match_literal(),
        ])
    })
}

/// `r'[a-zA-Z_]([a-zA-Z_]|[0-9])*'` in the original: a rule name is a
/// plain identifier regex, one atomic `RegExMatch` - no decoration needed.
fn rule_name() -> Description {
    rule("rule_name", || regex(r"[a-zA-Z_][a-zA-Z_0-9]*"))
}

fn rule_crossref() -> Description {
    rule("rule_crossref", || rule_name())
}

fn regex_literal() -> Description {
    rule("regex", || {
        seq([str_match("r'"), regex(r"(\\'|[^'])*"), str_match("'")])
    })
}

fn str_match_literal() -> Description {
    rule("str_match", || regex(r#"'(\\'|[^'])*'|"[^"]*""#))
}

fn left_arrow() -> Description {
    rule("LEFT_ARROW", || str_match("<-"))
}

fn slash() -> Description {
    rule("SLASH", || str_match("/"))
}

fn and_op() -> Description {
    rule("AND", || str_match("&"))
}

fn not_op() -> Description {
    rule("NOT", || str_match("!"))
}

fn question() -> Description {
    rule("QUESTION", || str_match("?"))
}

fn star() -> Description {
    rule("STAR", || str_match("*"))
}

fn plus() -> Description {
    rule("PLUS", || str_match("+"))
}

fn open_paren() -> Description {
    rule("OPEN", || str_match("("))
}

fn close_paren() -> Description {
    rule("CLOSE", || str_match(")"))
}

/// Unreferenced by any other rule here, same as in the original - kept for
/// parity with `peg_peg.py`'s grammar text, which defines it but never
/// uses it either.
#[allow(dead_code)]
fn dot() -> Description {
    rule("DOT", || str_match("."))
}

/// The comment grammar to register as `comments_model`: `// <rest-of-line>`.
pub fn comment() -> Description {
    rule("comment", || {
        combine(seq([str_match("//"), regex(r"[^\n]*")]))
    })
}

/// The PEG-of-PEG grammar rendered as PEG source, byte-identical to
/// `original_source/examples/peg_peg.py`'s `peg_grammar` string (minus the
/// `DOT`/`rule_name`-duplication quirks that textual front-end parses but
/// this module's hand-built model does not need, since it is already the
/// model rather than a string to translate into one).
pub const SELF_DESCRIPTION: &str = r#"
 peggrammar <- rule+ EOF;
 rule <- rule_name LEFT_ARROW ordered_choice ';';
 ordered_choice <- sequence (SLASH sequence)*;
 sequence <- prefix+;
 prefix <- (AND/NOT)? sufix;
 sufix <- expression (QUESTION/STAR/PLUS)?;
 expression <- regex / rule_crossref
                / (OPEN ordered_choice CLOSE) / str_match;

 rule_name <- r'[a-zA-Z_]([a-zA-Z_]|[0-9])*';
 rule_crossref <- rule_name;
 regex <- 'r\'' r'(\\\'|[^\'])*' '\'';
 str_match <- r'\'(\\\'|[^\'])*\'|"[^"]*"';
 LEFT_ARROW <- '<-';
 SLASH <- '/';
 AND <- '&';
 NOT <- '!';
 QUESTION <- '?';
 STAR <- '*';
 PLUS <- '+';
 OPEN <- '(';
 CLOSE <- ')';
 DOT <- '.';
 comment <- '//' r'.*\n';
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Parser, ParserOptions};

    #[test]
    fn parses_its_own_description() {
        let mut parser = Parser::with_comments(grammar(), comment(), ParserOptions::default())
            .expect("grammar and comment model both build");
        let result = parser.parse(SELF_DESCRIPTION);
        assert!(result.is_ok(), "failed to parse self description: {result:?}");
    }
}
