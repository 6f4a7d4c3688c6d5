use criterion::{black_box, criterion_group, criterion_main, Criterion};
use langkit::{body, Field, Language, NodeType, Prec, Terminal, THIS};

fn arithmetic_types() -> Vec<NodeType> {
    let expr = NodeType::new("Expr").skip(body!["(", THIS, ")"]).start();
    let num = NodeType::new("Num")
        .generates(body![Field::new("value", Terminal::number())])
        .replaces(&expr);
    let mut types = vec![expr.clone(), num];
    for (name, op, prec) in [
        ("Add", "+", Prec::left(10)),
        ("Sub", "-", Prec::left(10)),
        ("Mul", "*", Prec::left(20)),
        ("Div", "/", Prec::left(20)),
        ("Pow", "^", Prec::right(30)),
    ] {
        types.push(
            NodeType::new(name)
                .generates_with(
                    body![Field::new("left", &expr), op, Field::new("right", &expr)],
                    prec,
                )
                .replaces(&expr),
        );
    }
    types
}

fn assemble_bench(c: &mut Criterion) {
    let types = arithmetic_types();
    c.bench_function("assemble", |b| {
        b.iter(|| Language::new(black_box(&types)).unwrap())
    });
}

fn parse_bench(c: &mut Criterion) {
    let lang = Language::new(&arithmetic_types()).unwrap();
    let ops = ["+", "*", "-", "^", "/"];
    let mut text = String::from("1");
    for i in 0..2000 {
        text.push_str(&format!(" {} ({} + {})", ops[i % ops.len()], i, i + 1));
    }
    c.bench_function("parse", |b| b.iter(|| lang.parse(black_box(&text)).unwrap()));
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = assemble_bench, parse_bench
}
criterion_main!(benches);
