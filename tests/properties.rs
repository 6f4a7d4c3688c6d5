//! Property tests over a small arithmetic language

use langkit::{body, Field, Language, NodeType, Prec, Terminal, THIS};
use proptest::prelude::*;

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
    let types = vec![
        expr.clone(),
        num,
        binary("Add", "+", Prec::left(10)),
        binary("Sub", "-", Prec::left(10)),
        binary("Mul", "*", Prec::left(20)),
    ];
    Language::new(&types).unwrap()
}

#[derive(Debug, Clone)]
enum Expr {
    Num(u32),
    Bin(&'static str, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn name(op: &str) -> &'static str {
        match op {
            "+" => "Add",
            "-" => "Sub",
            _ => "Mul",
        }
    }

    /// Source text with every operation parenthesized
    fn source(&self) -> String {
        match self {
            Expr::Num(n) => n.to_string(),
            Expr::Bin(op, l, r) => format!("({} {} {})", l.source(), op, r.source()),
        }
    }

    /// Display of the expected syntax tree
    fn tree(&self) -> String {
        match self {
            Expr::Num(n) => format!("Num({})", n),
            Expr::Bin(op, l, r) => format!("{}({}, {})", Expr::name(op), l.tree(), r.tree()),
        }
    }
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = (0u32..1000).prop_map(Expr::Num);
    leaf.prop_recursive(6, 64, 2, |inner| {
        (prop_oneof![Just("+"), Just("-"), Just("*")], inner.clone(), inner)
            .prop_map(|(op, l, r)| Expr::Bin(op, Box::new(l), Box::new(r)))
    })
}

proptest! {
    #[test]
    fn parenthesized_expressions_parse_to_their_structure(expr in expr_strategy()) {
        let lang = arithmetic();
        let value = lang.parse(&expr.source()).unwrap();
        prop_assert_eq!(value.to_string(), expr.tree());
    }

    #[test]
    fn chains_of_one_priority_associate_left(
        first in 0u32..100,
        rest in prop::collection::vec((prop_oneof![Just("+"), Just("-")], 0u32..100), 0..20),
    ) {
        let lang = arithmetic();
        let mut text = first.to_string();
        let mut expected = format!("Num({})", first);
        for (op, n) in &rest {
            text.push_str(&format!(" {} {}", op, n));
            expected = format!("{}({}, Num({}))", Expr::name(op), expected, n);
        }
        prop_assert_eq!(lang.parse(&text).unwrap().to_string(), expected);
    }

    #[test]
    fn products_bind_tighter_than_sums(a in 0u32..100, b in 0u32..100, c in 0u32..100) {
        let lang = arithmetic();
        prop_assert_eq!(
            lang.parse(&format!("{} + {} * {}", a, b, c)).unwrap(),
            lang.parse(&format!("{} + ({} * {})", a, b, c)).unwrap()
        );
        prop_assert_eq!(
            lang.parse(&format!("{} * {} - {}", a, b, c)).unwrap(),
            lang.parse(&format!("({} * {}) - {}", a, b, c)).unwrap()
        );
    }

    #[test]
    fn extending_keeps_old_parses(expr in expr_strategy()) {
        let lang = arithmetic();
        let expr_type = lang.types()[0].clone();
        let div = NodeType::new("Div")
            .generates_with(
                body![Field::new("left", &expr_type), "/", Field::new("right", &expr_type)],
                Prec::left(20),
            )
            .replaces(&expr_type);
        let extended = lang.add_types(&[div]).unwrap();
        let source = expr.source();
        prop_assert_eq!(extended.parse(&source).unwrap(), lang.parse(&source).unwrap());
    }

    #[test]
    fn parsing_the_same_text_twice_gives_equal_trees(expr in expr_strategy()) {
        let lang = arithmetic();
        let source = expr.source();
        let first = lang.parse(&source).unwrap();
        let second = lang.parse(&source).unwrap();
        prop_assert_eq!(first.to_string(), second.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn arbitrary_input_never_panics(text in "[ -~\n]{0,40}") {
        let lang = arithmetic();
        let _ = lang.parse(&text);
    }
}
