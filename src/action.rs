//! Construction actions, and folding of parse trees into syntax trees

use crate::ast::{Node, NodeShape, Value};
use crate::grammar::Grammar;
use crate::parser::{ParseChild, ParseTree};

use std::sync::Arc;

/// The action bound to a production of the compiled grammar.
#[derive(Debug, Clone)]
pub enum Action {
    /// Build a node. `fields[i]` is the index of the child holding the value of the i-th field
    /// of the shape.
    Construct {
        shape: Arc<NodeShape>,
        fields: Vec<usize>,
    },
    /// Return the child at the index
    PassThrough(usize),
    EmptyList,
    /// `elem rest`: prepend the element to the rest of the list
    ListHead,
    /// `divider elem rest`
    ListNext,
    /// `E#i -> E#i+1 E#i'`: fold the operator tail over the first child
    Climb,
    /// An operator production with its leading operand removed. The left operand is supplied by
    /// the enclosing `Climb`. When `looping` the last child is the rest of the tail.
    Operator { inner: Box<Action>, looping: bool },
    /// End of an operator tail
    EndOfTail,
}

fn take(children: &mut [Option<Value>], idx: usize) -> Option<Value> {
    children.get_mut(idx).and_then(Option::take)
}

impl Action {
    /// Applies the action to already folded children. Operator tails and lists are folded
    /// iteratively by [`fold`] instead; this is the one-step version of the same semantics.
    pub fn apply(&self, children: Vec<Value>) -> Value {
        let mut children: Vec<Option<Value>> = children.into_iter().map(Some).collect();
        match self {
            Action::Construct { shape, fields } => {
                let values = fields
                    .iter()
                    .zip(shape.fields.iter())
                    .map(|(child_idx, field)| {
                        take(&mut children, *child_idx)
                            .or_else(|| field.default.clone())
                            .unwrap_or(Value::List(vec![]))
                    })
                    .collect();
                Value::node(Node::new(shape.clone(), values))
            }
            Action::PassThrough(idx) => {
                take(&mut children, *idx).unwrap_or(Value::List(vec![]))
            }
            Action::EmptyList | Action::EndOfTail => Value::List(vec![]),
            Action::ListHead | Action::ListNext => {
                let elem_idx = if let Action::ListHead = self { 0 } else { 1 };
                let mut items = vec![];
                items.extend(take(&mut children, elem_idx));
                if let Some(Value::List(rest)) = take(&mut children, elem_idx + 1) {
                    items.extend(rest);
                }
                Value::List(items)
            }
            Action::Climb => take(&mut children, 0).unwrap_or(Value::List(vec![])),
            Action::Operator { inner, .. } => {
                inner.apply(children.into_iter().flatten().collect())
            }
        }
    }
}

fn fold_child(grammar: &Grammar, child: ParseChild) -> Value {
    match child {
        ParseChild::Token(token) => token.value,
        ParseChild::Tree(tree) => fold(grammar, tree),
    }
}

/// Folds a parse tree into the syntax tree by running the construction action of each
/// production. Recursion depth is bounded by the nesting depth of the input; lists and operator
/// chains are folded in loops.
pub fn fold(grammar: &Grammar, tree: ParseTree) -> Value {
    let ParseTree {
        non_terminal,
        production,
        children,
    } = tree;

    let action = &grammar.get_production(non_terminal, production).action;
    match action {
        Action::Climb => fold_climb(grammar, children),
        Action::ListHead | Action::ListNext => fold_list(grammar, action, children),
        _ => {
            let values = children
                .into_iter()
                .map(|child| fold_child(grammar, child))
                .collect();
            action.apply(values)
        }
    }
}

fn fold_list<'g>(
    grammar: &'g Grammar,
    mut action: &'g Action,
    mut children: Vec<ParseChild>,
) -> Value {
    let mut items: Vec<Value> = vec![];

    loop {
        let mut iter = children.into_iter();
        if let Action::ListNext = action {
            // divider
            iter.next();
        }
        if let Some(elem) = iter.next() {
            items.push(fold_child(grammar, elem));
        }
        match iter.next() {
            Some(ParseChild::Tree(rest)) => {
                let rest_action = &grammar.get_production(rest.non_terminal, rest.production).action;
                match rest_action {
                    Action::ListNext => {
                        action = rest_action;
                        children = rest.children;
                    }
                    _ => break,
                }
            }
            _ => break,
        }
    }

    Value::List(items)
}

fn fold_climb(grammar: &Grammar, children: Vec<ParseChild>) -> Value {
    let mut iter = children.into_iter();

    let mut value = match iter.next() {
        Some(child) => fold_child(grammar, child),
        None => return Value::List(vec![]),
    };

    let mut tail = iter.next();
    while let Some(ParseChild::Tree(tree)) = tail {
        match &grammar.get_production(tree.non_terminal, tree.production).action {
            Action::Operator { inner, looping } => {
                let mut children = tree.children;
                let next = if *looping { children.pop() } else { None };
                let mut args = Vec::with_capacity(children.len() + 1);
                args.push(value);
                args.extend(children.into_iter().map(|child| fold_child(grammar, child)));
                value = inner.apply(args);
                tail = next;
            }
            _ => break,
        }
    }

    value
}

#[cfg(test)]
fn shape(name: &str, fields: &[&str]) -> Arc<NodeShape> {
    Arc::new(NodeShape {
        name: name.to_owned(),
        fields: fields
            .iter()
            .map(|name| crate::ast::FieldInfo {
                name: name.to_string(),
                default: None,
            })
            .collect(),
        scoping: Default::default(),
    })
}

#[test]
fn construct_maps_fields_by_position() {
    // Body `b "=" a`, fields declared as `a, b`
    let action = Action::Construct {
        shape: shape("Pair", &["a", "b"]),
        fields: vec![2, 0],
    };
    let value = action.apply(vec![
        Value::Int(1),
        Value::Token("=".to_owned()),
        Value::Int(2),
    ]);
    assert_eq!(value.to_string(), "Pair(2, 1)");
}

#[test]
fn list_actions() {
    let rest = Action::ListNext.apply(vec![
        Value::Token(";".to_owned()),
        Value::Int(2),
        Action::EmptyList.apply(vec![]),
    ]);
    let list = Action::ListHead.apply(vec![Value::Int(1), rest]);
    assert_eq!(list, Value::List(vec![Value::Int(1), Value::Int(2)]));
}
