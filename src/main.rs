//! Thin demo binary: builds the arithmetic grammar from spec.md §8's
//! worked example directly with the library's own combinators, parses a
//! sample expression, and prints the resulting parse tree - then shows
//! the library parsing its own PEG-of-PEG notation via [`pegrat::peg`].

use pegrat::{choice, eof, regex, rule, seq, zero_or_more, Description, Parser, ParserOptions};

fn arithmetic() -> Description {
    rule("plus_minus", || {
        seq([
            mult_div(),
            zero_or_more(seq([choice(["+".into(), "-".into()]), mult_div()])),
        ])
    })
}

fn mult_div() -> Description {
    rule("mult_div", || {
        seq([
            atomic(),
            zero_or_more(seq([choice(["*".into(), "/".into()]), atomic()])),
        ])
    })
}

fn atomic() -> Description {
    rule("atomic", || {
        choice([literal(), seq(["(".into(), arithmetic(), ")".into()])])
    })
}

fn literal() -> Description {
    rule("literal", || regex(r"[a-d]"))
}

fn main() {
    #[cfg(feature = "logging")]
    env_logger::init();

    let mut parser =
        Parser::new(seq([arithmetic(), eof()]), ParserOptions::default()).expect("valid grammar");
    let tree = parser
        .parse("   ( a + b)*( c +   a  *  (  d )+ c  )")
        .expect("good parse");
    println!("{tree}");

    /* Nota bene: this syntax tree keeps every layer of the grammar, same as
     * the concrete-syntax-tree output a real compiler front end would
     * specialize into an abstract syntax tree before analysis. */

    let mut peg_parser = Parser::with_comments(
        pegrat::peg::grammar(),
        pegrat::peg::comment(),
        ParserOptions::default(),
    )
    .expect("peg grammar builds");
    peg_parser
        .parse(pegrat::peg::SELF_DESCRIPTION)
        .expect("the PEG-of-PEG grammar parses its own textual rendition");
    println!("PEG can describe PEG.");
}
