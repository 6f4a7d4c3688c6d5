use crate::{body, Field, Language, NodeType, Prec, Terminal, THIS};

// Expr -> Num | Add | Sub | Mul | Div | Neg | ( Expr )
// Num  -> Number
// Add  -> Expr + Expr    {10, left}
// Sub  -> Expr - Expr    {10, left}
// Mul  -> Expr * Expr    {20, left}
// Div  -> Expr / Expr    {20, left}
// Neg  -> - Expr         {30}
pub fn arithmetic_types() -> Vec<NodeType> {
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

    let add = binary("Add", "+", Prec::left(10));
    let sub = binary("Sub", "-", Prec::left(10));
    let mul = binary("Mul", "*", Prec::left(20));
    let div = binary("Div", "/", Prec::left(20));

    let neg = NodeType::new("Neg")
        .generates_with(body!["-", Field::new("operand", &expr)], Prec::none(30))
        .replaces(&expr);

    vec![expr, num, add, sub, mul, div, neg]
}

pub fn arithmetic() -> Language {
    Language::new(&arithmetic_types()).unwrap()
}

// Expr -> Num | Pow
// Pow  -> Expr ^ Expr    {10, right}
pub fn power() -> Language {
    let expr = NodeType::new("Expr").start();
    let num = NodeType::new("Num")
        .generates(body![Field::new("value", Terminal::number())])
        .replaces(&expr);
    let pow = NodeType::new("Pow")
        .generates_with(
            body![Field::new("base", &expr), "^", Field::new("exponent", &expr)],
            Prec::right(10),
        )
        .replaces(&expr);
    Language::new(&[expr, num, pow]).unwrap()
}

// Numbers -> Num (; Num)*     (or empty)
// Num     -> Number
pub fn number_list(empty: bool) -> Language {
    let num = NodeType::new("Num").generates(body![Field::new("value", Terminal::number())]);
    let numbers = NodeType::new("Numbers").make_list(&num, ";", empty).start();
    Language::new(&[numbers, num]).unwrap()
}
