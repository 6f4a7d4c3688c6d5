use langkit::{
    body, AssemblyError, Field, Language, NodeType, ParseError, Position, Prec, Terminal, Value,
    THIS,
};

fn ident() -> Terminal {
    Terminal::raw_identifier()
}

// A tower of small expression languages, each one extending the previous:
//
// LET:           Program -> Expression
//                Expression -> Number | -(e, e) | zero?(e) | if e then e else e | x
//                            | let x = e in e
// PROC:          ... | proc (x) e | (e e)
// LETREC:        ... | letrec f(x) = e in e
// EXPLICIT-REFS: ... | newref(e) | deref(e) | setref(e, e) | begin e; ...; e end
// IMPLICIT-REFS: LETREC + begin ... end | set x = e
struct Tower {
    expr: NodeType,
    exprs: NodeType,
}

impl Tower {
    fn new() -> Tower {
        let expr = NodeType::new("Expression");
        let exprs = NodeType::new("Exprs").make_list(&expr, ";", false);
        Tower { expr, exprs }
    }

    fn let_types(&self) -> Vec<NodeType> {
        let expr = &self.expr;

        let program = NodeType::new("Program")
            .generates(body![Field::new("expr", expr)])
            .start();

        let constant = NodeType::new("Const")
            .generates(body![Field::new("value", Terminal::number())])
            .replaces(expr);

        let diff = NodeType::new("Diff")
            .generates(body![
                "-",
                "(",
                Field::new("left", expr),
                ",",
                Field::new("right", expr),
                ")"
            ])
            .replaces(expr);

        let is_zero = NodeType::new("IsZero")
            .generates(body!["zero?", "(", Field::new("expr", expr), ")"])
            .replaces(expr);

        let if_ = NodeType::new("If")
            .generates(body![
                "if",
                Field::new("cond", expr),
                "then",
                Field::new("then", expr),
                "else",
                Field::new("else", expr)
            ])
            .replaces(expr);

        let var = NodeType::new("Var")
            .generates(body![Field::new("name", ident())])
            .variable("name")
            .replaces(expr);

        let let_ = NodeType::new("Let")
            .generates(body![
                "let",
                Field::new("var", ident()),
                "=",
                Field::new("value", expr),
                "in",
                Field::new("body", expr)
            ])
            .binds(&["var"], &["body"])
            .replaces(expr);

        vec![
            program,
            expr.clone(),
            constant,
            diff,
            is_zero,
            if_,
            var,
            let_,
        ]
    }

    fn proc_types(&self) -> Vec<NodeType> {
        let expr = &self.expr;

        let proc_ = NodeType::new("Proc")
            .generates(body![
                "proc",
                "(",
                Field::new("param", ident()),
                ")",
                Field::new("body", expr)
            ])
            .binds(&["param"], &["body"])
            .replaces(expr);

        let call = NodeType::new("Call")
            .generates(body![
                "(",
                Field::new("rator", expr),
                Field::new("rand", expr),
                ")"
            ])
            .replaces(expr);

        vec![proc_, call]
    }

    fn letrec_types(&self) -> Vec<NodeType> {
        let expr = &self.expr;

        let letrec = NodeType::new("Letrec")
            .generates(body![
                "letrec",
                Field::new("name", ident()),
                "(",
                Field::new("param", ident()),
                ")",
                "=",
                Field::new("proc_body", expr),
                "in",
                Field::new("letrec_body", expr)
            ])
            .binds(&["name"], &["proc_body", "letrec_body"])
            .binds(&["param"], &["proc_body"])
            .replaces(expr);

        vec![letrec]
    }

    fn begin_types(&self) -> Vec<NodeType> {
        let begin = NodeType::new("Begin")
            .generates(body!["begin", Field::new("exprs", &self.exprs), "end"])
            .replaces(&self.expr);

        vec![begin, self.exprs.clone()]
    }

    fn explicit_refs_types(&self) -> Vec<NodeType> {
        let expr = &self.expr;

        let newref = NodeType::new("NewRef")
            .generates(body!["newref", "(", Field::new("expr", expr), ")"])
            .replaces(expr);

        let deref = NodeType::new("DeRef")
            .generates(body!["deref", "(", Field::new("expr", expr), ")"])
            .replaces(expr);

        let setref = NodeType::new("SetRef")
            .generates(body![
                "setref",
                "(",
                Field::new("location", expr),
                ",",
                Field::new("value", expr),
                ")"
            ])
            .replaces(expr);

        let mut types = vec![newref, deref, setref];
        types.extend(self.begin_types());
        types
    }

    fn implicit_refs_types(&self) -> Vec<NodeType> {
        let assign = NodeType::new("Assign")
            .generates(body![
                "set",
                Field::new("var", ident()),
                "=",
                Field::new("value", &self.expr)
            ])
            .variable("var")
            .replaces(&self.expr);

        let mut types = vec![assign];
        types.extend(self.begin_types());
        types
    }
}

struct Languages {
    let_: Language,
    proc_: Language,
    letrec: Language,
    explicit_refs: Language,
    implicit_refs: Language,
}

fn languages() -> Languages {
    let tower = Tower::new();
    let let_ = Language::new(&tower.let_types()).unwrap();
    let proc_ = let_.add_types(&tower.proc_types()).unwrap();
    let letrec = proc_.add_types(&tower.letrec_types()).unwrap();
    let explicit_refs = letrec.add_types(&tower.explicit_refs_types()).unwrap();
    let implicit_refs = letrec.add_types(&tower.implicit_refs_types()).unwrap();
    Languages {
        let_,
        proc_,
        letrec,
        explicit_refs,
        implicit_refs,
    }
}

fn parse(lang: &Language, text: &str) -> String {
    match lang.parse(text) {
        Ok(value) => value.to_string(),
        Err(err) => panic!("failed to parse {:?}: {}", text, err),
    }
}

#[test]
fn let_language() {
    let langs = languages();
    let lang = &langs.let_;

    assert_eq!(parse(lang, "42"), "Program(Const(42))");
    assert_eq!(
        parse(lang, "let x = 5 in -(x, 1)"),
        "Program(Let(x, Const(5), Diff(Var(x), Const(1))))"
    );
    assert_eq!(
        parse(lang, "if zero?(-(3, 3)) then 1 else 0"),
        "Program(If(IsZero(Diff(Const(3), Const(3))), Const(1), Const(0)))"
    );

    // Layout: whitespace and `%` comments
    assert_eq!(
        parse(lang, "% a comment\nlet y = 1 % another one\nin y"),
        "Program(Let(y, Const(1), Var(y)))"
    );

    // Keywords are literals and win over identifiers of the same length, longer identifiers win
    // over keywords
    assert_eq!(parse(lang, "iffy"), "Program(Var(iffy))");
    assert!(lang.parse("if").is_err());
}

#[test]
fn syntax_tree_access() {
    let langs = languages();
    let program = langs.let_.parse("let x = 5 in x").unwrap();

    let program = program.as_node().unwrap();
    assert_eq!(program.kind(), "Program");

    let let_ = program.field("expr").and_then(Value::as_node).unwrap();
    assert_eq!(let_.kind(), "Let");
    assert_eq!(let_.field("var").and_then(Value::as_str), Some("x"));
    assert_eq!(
        let_.field("value")
            .and_then(Value::as_node)
            .and_then(|node| node.field("value"))
            .and_then(Value::as_int),
        Some(5)
    );
    assert!(let_.field("nonexistent").is_none());

    let names: Vec<&str> = let_.fields().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["var", "value", "body"]);
    let shape_names: Vec<&str> = let_
        .shape()
        .fields()
        .iter()
        .map(|field| field.name.as_str())
        .collect();
    assert_eq!(shape_names, names);
}

#[test]
fn proc_and_letrec() {
    let langs = languages();

    assert_eq!(
        parse(&langs.proc_, "let f = proc (x) -(x, 11) in (f (f 77))"),
        "Program(Let(f, Proc(x, Diff(Var(x), Const(11))), Call(Var(f), Call(Var(f), Const(77)))))"
    );

    assert_eq!(
        parse(
            &langs.letrec,
            "letrec double(x) = if zero?(x) then 0 else -((double -(x, 1)), -(0, 2)) in (double 6)"
        ),
        "Program(Letrec(double, x, If(IsZero(Var(x)), Const(0), \
         Diff(Call(Var(double), Diff(Var(x), Const(1))), Diff(Const(0), Const(2)))), \
         Call(Var(double), Const(6))))"
    );
}

#[test]
fn refs() {
    let langs = languages();

    assert_eq!(
        parse(
            &langs.explicit_refs,
            "let r = newref(0) in begin setref(r, 1); deref(r) end"
        ),
        "Program(Let(r, NewRef(Const(0)), Begin([SetRef(Var(r), Const(1)), DeRef(Var(r))])))"
    );

    assert_eq!(
        parse(&langs.implicit_refs, "let x = 0 in begin set x = 1; x end"),
        "Program(Let(x, Const(0), Begin([Assign(x, Const(1)), Var(x)])))"
    );

    // The sibling extensions don't see each other's types
    assert!(langs.implicit_refs.parse("newref(0)").is_err());
    assert!(langs.explicit_refs.parse("set x = 1").is_err());

    // Without the explicit refs `setref` is an identifier, not the keyword `set`
    assert!(langs.implicit_refs.parse("setref(x, 1)").is_err());
}

#[test]
fn extensions_leave_base_languages_unchanged() {
    let langs = languages();

    let programs = [
        "42",
        "let x = 5 in -(x, 1)",
        "if zero?(0) then x else let y = 2 in y",
    ];
    for program in programs.iter() {
        let base = langs.let_.parse(program).unwrap();
        for extended in [
            &langs.proc_,
            &langs.letrec,
            &langs.explicit_refs,
            &langs.implicit_refs,
        ]
        .iter()
        {
            assert_eq!(extended.parse(program).unwrap(), base);
        }
    }

    // Base languages reject the syntax of their extensions, before and after extending
    assert!(langs.let_.parse("proc (x) x").is_err());
    assert!(langs.proc_.parse("letrec f(x) = x in f").is_err());

    let names: Vec<&str> = langs.proc_.types().iter().map(|ty| ty.name()).collect();
    assert_eq!(
        names,
        vec!["Program", "Expression", "Const", "Diff", "IsZero", "If", "Var", "Let", "Proc", "Call"]
    );
    assert_eq!(langs.letrec.start_type().name(), "Program");
}

#[test]
fn upgrading_a_type() {
    let tower = Tower::new();
    let types = tower.let_types();
    let constant = types.iter().find(|ty| ty.name() == "Const").unwrap().clone();
    let let_ = Language::new(&types).unwrap();

    // Constants that can also be booleans
    let literal = NodeType::new("Literal")
        .inherits(&constant)
        .generates(body![Field::new("value", Terminal::boolean())])
        .upgrades(&constant);
    let upgraded = let_.add_types(&[literal]).unwrap();

    assert_eq!(
        parse(&upgraded, "zero?(true)"),
        "Program(IsZero(Literal(true)))"
    );
    assert_eq!(
        parse(&upgraded, "let x = 1 in x"),
        "Program(Let(x, Literal(1), Var(x)))"
    );
    assert!(upgraded.types().iter().all(|ty| ty.name() != "Const"));

    // Without the upgrade `true` is a variable
    assert_eq!(parse(&let_, "zero?(true)"), "Program(IsZero(Var(true)))");
}

#[test]
fn upgrading_the_start_type() {
    let tower = Tower::new();
    let types = tower.let_types();
    let program = types.iter().find(|ty| ty.name() == "Program").unwrap().clone();
    let let_ = Language::new(&types).unwrap();

    let annotated = NodeType::new("Annotated").inherits(&program).upgrades(&program);
    assert!(annotated.is_start());
    let upgraded = let_.add_types(&[annotated]).unwrap();

    assert_eq!(upgraded.start_type().name(), "Annotated");
    assert_eq!(parse(&upgraded, "42"), "Annotated(Const(42))");
}

#[test]
fn free_variables() {
    let langs = languages();

    let free = |lang: &Language, text: &str| -> Vec<String> {
        let value = lang.parse(text).unwrap();
        value.free_vars().map(str::to_owned).collect()
    };

    assert_eq!(free(&langs.let_, "let x = 1 in -(x, y)"), vec!["y"]);
    assert_eq!(free(&langs.let_, "-(x, let x = 1 in x)"), vec!["x"]);

    // The bound expression is outside the scope of the binding
    assert_eq!(free(&langs.let_, "let x = x in x"), vec!["x"]);

    // One name per free occurrence
    assert_eq!(free(&langs.let_, "-(a, -(b, a))"), vec!["a", "b", "a"]);

    assert_eq!(free(&langs.proc_, "proc (f) (f g)"), vec!["g"]);
    assert_eq!(
        free(&langs.letrec, "letrec f(x) = (f (g x)) in (f y)"),
        vec!["g", "y"]
    );
    assert_eq!(
        free(&langs.implicit_refs, "begin set y = 1; x end"),
        vec!["y", "x"]
    );

    // Enumeration is lazy and restartable
    let value = langs.let_.parse("-(a, b)").unwrap();
    let mut vars = value.free_vars();
    assert_eq!(vars.next(), Some("a"));
    let rest = vars.clone();
    assert_eq!(vars.collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(rest.collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(value.free_vars().count(), 2);
}

fn arithmetic() -> Language {
    let expr = NodeType::new("Expr").skip(body!["(", THIS, ")"]).start();
    let num = NodeType::new("Num")
        .generates(body![Field::new("value", Terminal::number())])
        .replaces(&expr);
    let binary = |name: &str, op: &str, prec: Prec| {
        NodeType::new(name)
            .generates_with(
                body![Field::new("left", &expr), op, Field::new("right", &expr)],
                prec,
            )
            .replaces(&expr)
    };
    let add = binary("Add", "+", Prec::left(1));
    let mul = binary("Mul", "*", Prec::left(2));
    let pow = binary("Pow", "^", Prec::right(3));
    let eq = binary("Eq", "==", Prec::none(0));
    Language::new(&[expr, num, add, mul, pow, eq]).unwrap()
}

#[test]
fn operators() {
    let lang = arithmetic();

    assert_eq!(
        parse(&lang, "1 + 2 * 3 + 4"),
        "Add(Add(Num(1), Mul(Num(2), Num(3))), Num(4))"
    );
    assert_eq!(
        parse(&lang, "2 ^ 3 ^ 2 * 5"),
        "Mul(Pow(Num(2), Pow(Num(3), Num(2))), Num(5))"
    );
    assert_eq!(
        parse(&lang, "(1 + 2) * 3"),
        "Mul(Add(Num(1), Num(2)), Num(3))"
    );
    assert_eq!(
        parse(&lang, "1 + 1 == 2"),
        "Eq(Add(Num(1), Num(1)), Num(2))"
    );

    // Non-associative operators don't chain
    assert!(lang.parse("1 == 1 == 1").is_err());
    assert_eq!(
        parse(&lang, "(1 == 1) == 1"),
        "Eq(Eq(Num(1), Num(1)), Num(1))"
    );
}

#[test]
fn parse_errors() {
    let langs = languages();
    let lang = &langs.let_;

    assert_eq!(
        lang.parse("let x 1 in x"),
        Err(ParseError::Mismatch {
            expected: "\"=\"".to_owned(),
            found: "Number \"1\"".to_owned(),
            position: Position {
                offset: 6,
                line: 1,
                column: 7
            },
        })
    );

    let err = lang.parse("let x = 1 in\n  x $").unwrap_err();
    assert_eq!(
        err,
        ParseError::UnrecognizedToken {
            text: "$".to_owned(),
            position: Position {
                offset: 17,
                line: 2,
                column: 5
            },
        }
    );
    assert_eq!(err.to_string(), "2:5: unrecognized token \"$\"");

    assert!(matches!(
        lang.parse("-(1, 2"),
        Err(ParseError::UnexpectedEnd { .. })
    ));
    assert!(matches!(
        lang.parse("then"),
        Err(ParseError::UnexpectedToken { .. })
    ));

    // Still usable after errors
    assert_eq!(parse(lang, "1"), "Program(Const(1))");
}

#[test]
fn unconsumed_input() {
    let stmt = NodeType::new("Stmt")
        .generates(body![Field::new("value", Terminal::number()), ";"])
        .start();
    let lang = Language::new(&[stmt]).unwrap();

    assert_eq!(parse(&lang, "1;"), "Stmt(1)");
    assert_eq!(
        lang.parse("1; 2"),
        Err(ParseError::UnconsumedInput {
            found: "Number \"2\"".to_owned(),
            position: Position {
                offset: 3,
                line: 1,
                column: 4
            },
        })
    );
}

#[test]
fn lists() {
    let item = NodeType::new("Item").generates(body![Field::new("name", ident())]);
    let items = NodeType::new("Items").make_list(&item, ",", true);
    let block = NodeType::new("Block")
        .generates(body!["{", Field::new("items", &items), "}"])
        .start();
    let lang = Language::new(&[block, items, item]).unwrap();

    assert_eq!(parse(&lang, "{}"), "Block([])");
    assert_eq!(parse(&lang, "{ a }"), "Block([Item(a)])");
    assert_eq!(parse(&lang, "{a, b, c}"), "Block([Item(a), Item(b), Item(c)])");
    assert!(lang.parse("{a,}").is_err());
    assert!(lang.parse("{a b}").is_err());

    let long: Vec<String> = (0..1000).map(|i| format!("x{}", i)).collect();
    let value = lang.parse(&format!("{{{}}}", long.join(", "))).unwrap();
    let items = value
        .as_node()
        .and_then(|block| block.field("items"))
        .and_then(Value::as_list)
        .unwrap();
    assert_eq!(items.len(), 1000);
}

#[test]
fn deep_operator_chains() {
    let lang = arithmetic();
    let text = vec!["1"; 1000].join(" + ");
    let value = lang.parse(&text).unwrap();
    assert_eq!(value.as_node().map(|node| node.kind()), Some("Add"));
}

#[test]
fn assembly_errors() {
    let stmt = NodeType::new("Stmt").start();
    let call = NodeType::new("Call")
        .generates(body![Field::new("f", ident()), "(", ")"])
        .replaces(&stmt);
    let var = NodeType::new("Var")
        .generates(body![Field::new("name", ident())])
        .replaces(&stmt);
    assert!(matches!(
        Language::new(&[stmt.clone(), call.clone(), var.clone()]),
        Err(AssemblyError::Ambiguous { .. })
    ));

    // A higher priority resolves the conflict
    let call = NodeType::new("Call")
        .generates(body![Field::new("f", ident()), "(", ")"])
        .replaces_with(&stmt, Prec::none(200));
    let lang = Language::new(&[stmt.clone(), call, var.clone()]).unwrap();
    assert_eq!(parse(&lang, "f()"), "Call(f)");
    assert_eq!(lang.parse_table().resolutions.len(), 1);

    let missing = NodeType::new("Missing");
    let uses_missing = NodeType::new("Uses")
        .generates(body![Field::new("m", &missing)])
        .start();
    assert_eq!(
        Language::new(&[uses_missing]).map(|_| ()),
        Err(AssemblyError::UnknownType {
            name: "Missing".to_owned(),
            referenced_by: "Uses".to_owned(),
        })
    );

    let bad = NodeType::new("Bad")
        .generates(body![Field::new(
            "value",
            Terminal::class("Bad", "[", langkit::Decode::Raw)
        )])
        .start();
    assert!(matches!(
        Language::new(&[bad]),
        Err(AssemblyError::InvalidPattern { .. })
    ));

    let err = Language::new(&[NodeType::new("A")]).unwrap_err();
    assert_eq!(err.to_string(), "there is no unique start type (found [])");
}
