//! Exercises the two-pass semantic-action walker (spec.md §4.6, §8
//! "Default-action idempotence" and the second-pass forward-reference
//! property spec.md §5 calls part of the observable contract).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use pegrat::{
    choice, eof, one_or_more, regex, rule, rule_with_action, seq, str_match, Asg, Description,
    ParseTreeNode, Parser, ParserOptions, SemanticAction,
};

// -- Default-action idempotence (spec.md §8) --------------------------------

#[test]
fn default_action_with_an_empty_table_suppresses_an_all_literal_rule() {
    // S <- 'a' 'b': both literals are direct Sequence children, so both are
    // suppressed terminals and the walker drops them before they ever reach
    // S's own reduction - `children` is empty, so the default action's
    // reduction is suppressed too (spec.md §4.6 bullets, default-action
    // idempotence), not a joined literal.
    let grammar = rule("S", || seq([str_match("a"), str_match("b")]));
    let mut parser = Parser::new(grammar, ParserOptions::default()).expect("valid grammar");
    parser.parse("ab").expect("matches");

    // An explicitly empty action table (as opposed to `None`) still runs
    // the walk - only a *missing* table falls back to build-time actions
    // and errors if none were registered.
    let empty: HashMap<String, Rc<dyn SemanticAction>> = HashMap::new();
    let asg = parser
        .get_asg(Some(&empty))
        .expect("an explicit empty action table is a valid table to walk with");
    assert!(pegrat::semantics::is_suppressed(&asg));
}

#[test]
fn get_asg_without_a_parse_or_registered_actions_fails_closed() {
    let grammar = rule("S", || str_match("a"));
    let parser = Parser::new(grammar, ParserOptions::default()).expect("valid grammar");
    // parse() was never called.
    let err = parser.get_asg(None).unwrap_err();
    assert_eq!(err, pegrat::ParseError::NoParseTree);
}

// -- Two-pass forward-reference linking (spec.md §4.6, §5) ------------------

/// Shared "symbol table" a toy language's semantic actions populate during
/// the first pass and consult during the second - the canonical use case
/// spec.md §4.6 names for the second-pass hook.
struct Env(RefCell<HashMap<String, i64>>);

struct DeclAction(Rc<Env>);

impl SemanticAction for DeclAction {
    fn first_pass(&self, _parser: &Parser, _node: &ParseTreeNode, children: Vec<Asg>) -> Asg {
        let name = children[0]
            .downcast_ref::<String>()
            .expect("decl's first child is the identifier")
            .clone();
        let value: i64 = children[1]
            .downcast_ref::<String>()
            .expect("decl's second child is the digit literal")
            .parse()
            .expect("digits parse as i64");
        self.0 .0.borrow_mut().insert(name, value);
        Rc::new(())
    }
}

struct UseAction {
    env: Rc<Env>,
    resolved: Rc<RefCell<Vec<(String, i64)>>>,
}

impl SemanticAction for UseAction {
    fn first_pass(&self, _parser: &Parser, _node: &ParseTreeNode, children: Vec<Asg>) -> Asg {
        let name = children[0]
            .downcast_ref::<String>()
            .expect("use's only child is the identifier")
            .clone();
        Rc::new(name)
    }

    fn wants_second_pass(&self) -> bool {
        true
    }

    fn second_pass(&self, _parser: &Parser, first_pass_result: Asg) {
        let name = first_pass_result
            .downcast_ref::<String>()
            .expect("first_pass handed back the identifier string");
        // Only valid if every decl's first_pass has already run - which is
        // only guaranteed once the whole first pass has completed, i.e.
        // from inside second_pass, never inline during first_pass.
        let value = *self
            .env
            .0
            .borrow()
            .get(name)
            .expect("forward reference resolved once the full first pass has run");
        self.resolved.borrow_mut().push((name.clone(), value));
    }
}

fn ident() -> Description {
    regex(r"[a-zA-Z_][a-zA-Z0-9_]*")
}

fn decl(action: Rc<dyn SemanticAction>) -> Description {
    rule_with_action(
        "decl",
        || seq([ident(), str_match("="), regex(r"\d+"), str_match(";")]),
        action,
    )
}

fn use_stmt(action: Rc<dyn SemanticAction>) -> Description {
    rule_with_action("use", || seq([str_match("$"), ident(), str_match(";")]), action)
}

fn stmt(decl_action: Rc<dyn SemanticAction>, use_action: Rc<dyn SemanticAction>) -> Description {
    rule("stmt", move || {
        choice([decl(decl_action.clone()), use_stmt(use_action.clone())])
    })
}

fn program(decl_action: Rc<dyn SemanticAction>, use_action: Rc<dyn SemanticAction>) -> Description {
    rule("program", move || {
        seq([one_or_more(stmt(decl_action.clone(), use_action.clone())), eof()])
    })
}

#[test]
fn second_pass_resolves_a_use_site_that_textually_precedes_its_declaration() {
    let env = Rc::new(Env(RefCell::new(HashMap::new())));
    let resolved = Rc::new(RefCell::new(Vec::new()));
    let decl_action: Rc<dyn SemanticAction> = Rc::new(DeclAction(env.clone()));
    let use_action: Rc<dyn SemanticAction> = Rc::new(UseAction {
        env: env.clone(),
        resolved: resolved.clone(),
    });

    let grammar = program(decl_action, use_action);
    let mut parser = Parser::new(grammar, ParserOptions::default()).expect("valid grammar");
    parser
        .parse("$a; a=5;")
        .expect("a use site ahead of its declaration still parses fine");

    // If second_pass ran inline during first_pass instead of after it, the
    // lookup inside UseAction::second_pass would panic since "a" is
    // textually declared after it's used.
    let asg = parser.get_asg(None).expect("build-time actions registered");
    let _ = asg;

    assert_eq!(resolved.borrow().as_slice(), &[("a".to_string(), 5i64)]);
}

#[test]
fn first_pass_runs_in_post_order_second_pass_in_completion_order() {
    // Two use sites, both forward references to declarations that come
    // later; second_pass must see both resolved, and in the order their
    // first_pass calls completed (textual order here, since both are plain
    // siblings in a flat `stmt+` sequence).
    let env = Rc::new(Env(RefCell::new(HashMap::new())));
    let resolved = Rc::new(RefCell::new(Vec::new()));
    let decl_action: Rc<dyn SemanticAction> = Rc::new(DeclAction(env.clone()));
    let use_action: Rc<dyn SemanticAction> = Rc::new(UseAction {
        env: env.clone(),
        resolved: resolved.clone(),
    });

    let grammar = program(decl_action, use_action);
    let mut parser = Parser::new(grammar, ParserOptions::default()).expect("valid grammar");
    parser
        .parse("$a; $b; a=1; b=2;")
        .expect("both use sites precede their declarations");
    parser.get_asg(None).expect("build-time actions registered");

    assert_eq!(
        resolved.borrow().as_slice(),
        &[("a".to_string(), 1i64), ("b".to_string(), 2i64)]
    );
}
