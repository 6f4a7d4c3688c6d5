//! Operator stratification.
//!
//! Node types declared as `E op E` (with `E` the type they replace) are left-recursive and can't
//! be parsed predictively as they are. For every non-terminal `E` with such operator productions
//! we build one level per operator priority, loosest first:
//!
//! ```text
//! E        -> E#p2 E#p1'          (level 0 is `E` itself)
//! E#p1'    -> op1 <operand> E#p1' | (empty)
//! E#p2     -> E#atom E#p2'
//! E#p2'    -> op2 <operand> E#p2' | (empty)
//! E#atom   -> <every non-operator production of E and of the types replacing E>
//! ```
//!
//! The operand after a left-associative (or non-associative) operator is the next tighter level,
//! the operand after a right-associative operator is the operator's own level. Ending a tail has
//! the lowest priority, so an operator is always taken when it can continue the expression. The
//! `Climb` and `Operator` actions fold the tails back into the nodes the original operator
//! productions would have built.
//!
//! Operator types keep their own non-terminal, so a body can still refer to `Add` directly. Its
//! production `Add -> E "+" E` becomes `Add -> <operand> Add#op1` where `<operand>` is the level
//! tighter than `+` and `Add#op1` is the tail production of `+`, forced once:
//!
//! ```text
//! Add      -> E#p2 Add#op1
//! Add#op1  -> "+" E#p2 E#p1'
//! ```

use crate::action::Action;
use crate::grammar::{Grammar, NonTerminalIdx, Production, Symbol};
use crate::node_type::{Assoc, Prec};

/// Stratifies all non-terminals with operator productions. Non-terminals added by stratification
/// are not revisited.
pub fn stratify(grammar: &mut Grammar) {
    let n_non_terminals = grammar.n_non_terminals();
    for nt_idx in 0..n_non_terminals {
        stratify_non_terminal(grammar, NonTerminalIdx::from_usize(nt_idx));
    }
}

/// `nt` and every non-terminal reachable from it by `X -> Y` productions that pass their only
/// child through
fn unit_closure(grammar: &Grammar, nt: NonTerminalIdx) -> Vec<NonTerminalIdx> {
    let mut closure = vec![nt];
    let mut next = 0;
    while next < closure.len() {
        let current = closure[next];
        next += 1;
        for production in grammar.get_non_terminal(current).productions() {
            if let Some(target) = unit_target(production) {
                if !closure.contains(&target) {
                    closure.push(target);
                }
            }
        }
    }
    closure
}

fn unit_target(production: &Production) -> Option<NonTerminalIdx> {
    match (&production.symbols[..], &production.action) {
        ([Symbol::NonTerminal(target)], Action::PassThrough(0)) => Some(*target),
        _ => None,
    }
}

struct Operator {
    /// Symbols after the left operand
    rest: Vec<Symbol>,
    action: Action,
    prec: Prec,
    /// Production declaring the operator in a type replacing `E`
    origin: Option<(NonTerminalIdx, usize)>,
}

fn stratify_non_terminal(grammar: &mut Grammar, nt_idx: NonTerminalIdx) {
    let closure = unit_closure(grammar, nt_idx);
    let this = Symbol::NonTerminal(nt_idx);

    let mut operators: Vec<Operator> = vec![];
    let mut atoms: Vec<Production> = vec![];

    for member in &closure {
        let productions = grammar.get_non_terminal(*member).productions();
        for (p_idx, production) in productions.iter().enumerate() {
            if production.symbols.len() >= 2 && production.symbols[0] == this {
                operators.push(Operator {
                    rest: production.symbols[1..].to_vec(),
                    action: production.action.clone(),
                    prec: production.prec,
                    origin: if *member == nt_idx { None } else { Some((*member, p_idx)) },
                });
            } else if !unit_target(production).map_or(false, |target| closure.contains(&target)) {
                atoms.push(production.clone());
            }
        }
    }

    if operators.is_empty() {
        return;
    }

    let mut priorities: Vec<i32> = operators.iter().map(|op| op.prec.priority).collect();
    priorities.sort_unstable();
    priorities.dedup();

    let name = grammar.get_non_terminal(nt_idx).name().to_owned();

    let mut heads: Vec<NonTerminalIdx> = Vec::with_capacity(priorities.len());
    let mut tails: Vec<NonTerminalIdx> = Vec::with_capacity(priorities.len());
    for (level, priority) in priorities.iter().enumerate() {
        if level == 0 {
            heads.push(nt_idx);
        } else {
            heads.push(grammar.add_non_terminal(format!("{}#{}", name, priority)));
        }
        tails.push(grammar.add_non_terminal(format!("{}#{}'", name, priority)));
    }
    let atom = grammar.add_non_terminal(format!("{}#atom", name));

    // Operand of a level: the next tighter level, or the atoms after the tightest one
    let next_level = |level: usize| heads.get(level + 1).copied().unwrap_or(atom);

    grammar.non_terminals[nt_idx.as_usize()].productions.clear();

    for level in 0..priorities.len() {
        grammar.add_production(
            heads[level],
            vec![
                Symbol::NonTerminal(next_level(level)),
                Symbol::NonTerminal(tails[level]),
            ],
            Action::Climb,
            Prec::default(),
        );
    }

    for op in operators {
        let level = priorities
            .iter()
            .position(|priority| *priority == op.prec.priority)
            .unwrap_or(0);

        let mut symbols = op.rest;
        let infix = symbols.last() == Some(&this);

        let looping = match op.prec.assoc {
            Assoc::Left => true,
            Assoc::None => false,
            // A right operand of the same level already consumed the rest of the chain
            Assoc::Right => !infix,
        };

        if infix {
            let operand = match op.prec.assoc {
                Assoc::Right => heads[level],
                Assoc::Left | Assoc::None => next_level(level),
            };
            if let Some(last) = symbols.last_mut() {
                *last = Symbol::NonTerminal(operand);
            }
        }

        if looping {
            symbols.push(Symbol::NonTerminal(tails[level]));
        }

        let action = Action::Operator {
            inner: Box::new(op.action),
            looping,
        };

        if let Some((member, p_idx)) = op.origin {
            let member_name = grammar.get_non_terminal(member).name().to_owned();
            let forced = grammar.add_non_terminal(format!("{}#op{}", member_name, p_idx));
            grammar.add_production(forced, symbols.clone(), action.clone(), op.prec);
            grammar.non_terminals[member.as_usize()].productions[p_idx] = Production {
                symbols: vec![
                    Symbol::NonTerminal(next_level(level)),
                    Symbol::NonTerminal(forced),
                ],
                action: Action::Climb,
                prec: Prec::default(),
            };
        }

        grammar.add_production(tails[level], symbols, action, op.prec);
    }

    for tail in &tails {
        grammar.add_production(*tail, vec![], Action::EndOfTail, Prec::lowest());
    }

    for production in atoms {
        let Production {
            mut symbols,
            action,
            prec,
        } = production;

        // A prefix operator binds its operand tighter than itself
        if symbols.len() >= 2 && symbols.last() == Some(&this) {
            let operand = priorities
                .iter()
                .position(|priority| match prec.assoc {
                    Assoc::Right => *priority >= prec.priority,
                    Assoc::Left | Assoc::None => *priority > prec.priority,
                })
                .map(|level| heads[level])
                .unwrap_or(atom);
            if let Some(last) = symbols.last_mut() {
                *last = Symbol::NonTerminal(operand);
            }
        }

        grammar.add_production(atom, symbols, action, prec);
    }
}

#[cfg(test)]
fn production_strings(grammar: &Grammar, name: &str) -> Vec<String> {
    let nt_idx = grammar.get_non_terminal_idx(name).unwrap();
    grammar
        .get_non_terminal(nt_idx)
        .productions()
        .iter()
        .map(|p| crate::grammar::ProductionDisplay::new(p, grammar).to_string())
        .collect()
}

#[test]
fn levels_of_arithmetic() {
    let lang = crate::test_grammars::arithmetic();
    let grammar = lang.grammar();

    assert_eq!(production_strings(grammar, "Expr"), vec!["Expr#20 Expr#10'"]);
    assert_eq!(
        production_strings(grammar, "Expr#10'"),
        vec![
            "\"+\" Expr#20 Expr#10'  {priority 10, left}",
            "\"-\" Expr#20 Expr#10'  {priority 10, left}",
            "(empty)  {lowest}",
        ]
    );
    assert_eq!(production_strings(grammar, "Expr#20"), vec!["Expr#atom Expr#20'"]);
    assert_eq!(
        production_strings(grammar, "Expr#atom"),
        vec![
            "\"(\" Expr \")\"",
            "Number",
            "\"-\" Expr#atom  {priority 30}",
        ]
    );
}

#[test]
fn right_associative_operand_stays_on_its_level() {
    let lang = crate::test_grammars::power();
    let grammar = lang.grammar();
    assert_eq!(
        production_strings(grammar, "Expr#10'"),
        vec!["\"^\" Expr  {priority 10, right}", "(empty)  {lowest}"]
    );
}

#[test]
fn operator_types_keep_a_forced_production() {
    let lang = crate::test_grammars::arithmetic();
    let grammar = lang.grammar();
    assert_eq!(production_strings(grammar, "Add"), vec!["Expr#20 Add#op0"]);
    assert_eq!(
        production_strings(grammar, "Add#op0"),
        vec!["\"+\" Expr#20 Expr#10'  {priority 10, left}"]
    );
    assert_eq!(production_strings(grammar, "Mul"), vec!["Expr#atom Mul#op0"]);
}

#[test]
fn operator_types_referenced_directly() {
    use crate::{body, Field, Language, NodeType, Terminal, THIS};

    let expr = NodeType::new("Expr").skip(body!["(", THIS, ")"]);
    let num = NodeType::new("Num")
        .generates(body![Field::new("value", Terminal::number())])
        .replaces(&expr);
    let add = NodeType::new("Add")
        .generates_with(
            body![Field::new("left", &expr), "+", Field::new("right", &expr)],
            Prec::left(10),
        )
        .replaces(&expr);
    let stmt = NodeType::new("Stmt")
        .generates(body![Field::new("sum", &add), ";"])
        .start();
    let lang = Language::new(&[stmt, expr, num, add]).unwrap();

    assert_eq!(
        lang.parse("1 + 2;").unwrap().to_string(),
        "Stmt(Add(Num(1), Num(2)))"
    );
    assert_eq!(
        lang.parse("1 + (2 + 3) + 4;").unwrap().to_string(),
        "Stmt(Add(Add(Num(1), Add(Num(2), Num(3))), Num(4)))"
    );
    assert!(lang.parse("1;").is_err());
}
