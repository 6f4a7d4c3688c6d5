//! Lowering node type declarations to a grammar

use crate::action::Action;
use crate::ast::{Binding, FieldInfo, NodeShape, Scoping};
use crate::error::AssemblyError;
use crate::grammar::{Grammar, Symbol};
use crate::node_type::{Element, Head, NodeType, Sym, Template};
use crate::registry::SymbolRegistry;

use std::sync::Arc;

use fxhash::FxHashMap;

/// Result of lowering: the grammar (not yet stratified) and the node types it was built from,
/// after upgrades were applied.
#[derive(Debug)]
pub struct Lowered {
    pub grammar: Grammar,
    pub types: Vec<NodeType>,
    pub start: String,
}

pub fn lower(types: &[NodeType]) -> Result<Lowered, AssemblyError> {
    let upgrades = upgrade_map(types)?;

    // Replace upgraded types, then drop repeated declarations. The first occurrence of a type
    // decides its position, and so the index of its non-terminal.
    let mut resolved: Vec<NodeType> = vec![];
    let mut type_indices: FxHashMap<String, usize> = Default::default();
    for ty in types {
        let ty = resolve_upgrade(&upgrades, ty)?;
        match type_indices.get(ty.name()) {
            Some(idx) => {
                if !resolved[*idx].same_decl(ty) {
                    return Err(AssemblyError::DuplicateType {
                        name: ty.name().to_owned(),
                    });
                }
            }
            None => {
                type_indices.insert(ty.name().to_owned(), resolved.len());
                resolved.push(ty.clone());
            }
        }
    }

    let starts: Vec<&NodeType> = resolved.iter().filter(|ty| ty.is_start()).collect();
    let start = match starts[..] {
        [start] => start.name().to_owned(),
        _ => {
            return Err(AssemblyError::NoUniqueStart {
                found: starts.iter().map(|ty| ty.name().to_owned()).collect(),
            })
        }
    };

    let mut grammar = Grammar::new();
    let mut registry = SymbolRegistry::new();

    for ty in &resolved {
        let nt_idx = registry.register_type(&mut grammar, ty.name());
        if ty.name() == start {
            grammar.start = nt_idx;
        }
    }

    for (upgraded, replacement) in upgrades.iter() {
        let replacement = resolve_upgrade(&upgrades, replacement)?;
        let nt_idx = registry.resolve_type(replacement.name(), upgraded)?;
        registry.alias(upgraded, nt_idx);
    }

    for ty in &resolved {
        let shape = node_shape(ty)?;
        lower_type(&mut grammar, &mut registry, ty, &shape)?;
    }

    Ok(Lowered {
        grammar,
        types: resolved,
        start,
    })
}

/// Maps names of upgraded types to the types upgrading them
fn upgrade_map(types: &[NodeType]) -> Result<FxHashMap<&str, &NodeType>, AssemblyError> {
    let mut upgrades: FxHashMap<&str, &NodeType> = Default::default();
    for ty in types {
        for upgraded in ty.upgraded_types() {
            match upgrades.get(upgraded.as_str()) {
                Some(existing) if existing.name() != ty.name() => {
                    return Err(AssemblyError::ConflictingUpgrade {
                        upgraded: upgraded.clone(),
                        first: existing.name().to_owned(),
                        second: ty.name().to_owned(),
                    });
                }
                Some(_) => {}
                None => {
                    upgrades.insert(upgraded.as_str(), ty);
                }
            }
        }
    }
    Ok(upgrades)
}

/// Follows upgrades transitively: if `B` upgrades `A` and `C` upgrades `B`, `A` becomes `C`.
fn resolve_upgrade<'a>(
    upgrades: &FxHashMap<&str, &'a NodeType>,
    ty: &'a NodeType,
) -> Result<&'a NodeType, AssemblyError> {
    let mut current = ty;
    let mut steps = 0;
    while let Some(next) = upgrades.get(current.name()) {
        current = *next;
        steps += 1;
        if steps > upgrades.len() {
            return Err(AssemblyError::UpgradeCycle {
                type_name: ty.name().to_owned(),
            });
        }
    }
    Ok(current)
}

fn declared_fields(body: &[Element]) -> impl Iterator<Item = &crate::node_type::Field> {
    body.iter().filter_map(|element| match element {
        Element::Sym(Sym::Field(field)) => Some(field),
        _ => None,
    })
}

/// Fields and scoping of the nodes built by `ty`. Every `generates` of a type declares the same
/// fields; the first one decides their order.
fn node_shape(ty: &NodeType) -> Result<Arc<NodeShape>, AssemblyError> {
    let decl = ty.decl();

    let mut fields: Option<Vec<FieldInfo>> = None;

    for production in &decl.productions {
        if production.template != Template::Construct {
            continue;
        }

        let mut declared: Vec<FieldInfo> = vec![];
        for field in declared_fields(&production.body) {
            if declared.iter().any(|info| info.name == field.name) {
                return Err(AssemblyError::DuplicateField {
                    type_name: ty.name().to_owned(),
                    field: field.name.clone(),
                });
            }
            declared.push(FieldInfo {
                name: field.name.clone(),
                default: field.default.clone(),
            });
        }

        match &fields {
            None => {}
            Some(expected) => {
                let same = expected.len() == declared.len()
                    && expected
                        .iter()
                        .all(|info| declared.iter().any(|other| other.name == info.name));
                if !same {
                    let names = |infos: &[FieldInfo]| -> Vec<String> {
                        infos.iter().map(|info| info.name.clone()).collect()
                    };
                    return Err(AssemblyError::FieldMismatch {
                        type_name: ty.name().to_owned(),
                        expected: names(&expected[..]),
                        found: names(&declared[..]),
                    });
                }
            }
        }
        if fields.is_none() {
            fields = Some(declared);
        }
    }

    let mut shape = NodeShape {
        name: ty.name().to_owned(),
        fields: fields.unwrap_or_default(),
        scoping: Scoping::default(),
    };

    let field_idx = |shape: &NodeShape, field: &str| {
        shape
            .field_idx(field)
            .ok_or_else(|| AssemblyError::UnknownField {
                type_name: ty.name().to_owned(),
                field: field.to_owned(),
            })
    };

    if let Some(variable) = &decl.variable {
        shape.scoping.variable = Some(field_idx(&shape, variable)?);
    }

    for (binders, scope) in &decl.bindings {
        let binders = binders
            .iter()
            .map(|field| field_idx(&shape, field))
            .collect::<Result<Vec<usize>, AssemblyError>>()?;
        let scope = scope
            .iter()
            .map(|field| field_idx(&shape, field))
            .collect::<Result<Vec<usize>, AssemblyError>>()?;
        shape.scoping.bindings.push(Binding { binders, scope });
    }

    Ok(Arc::new(shape))
}

fn lower_type(
    grammar: &mut Grammar,
    registry: &mut SymbolRegistry,
    ty: &NodeType,
    shape: &Arc<NodeShape>,
) -> Result<(), AssemblyError> {
    let owner = ty.name();

    for production in &ty.decl().productions {
        let head = match &production.head {
            Head::This => registry.resolve_type(owner, owner)?,
            Head::Type(target) => registry.resolve_type(target, owner)?,
            Head::Helper(role) => registry.resolve_helper(grammar, owner, role),
        };

        let symbols = production
            .body
            .iter()
            .map(|element| registry.resolve_element(grammar, owner, element))
            .collect::<Result<Vec<Symbol>, AssemblyError>>()?;

        let action = match production.template {
            Template::Construct => {
                // Position of each field of the shape in this body
                let positions: FxHashMap<&str, usize> = production
                    .body
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, element)| match element {
                        Element::Sym(Sym::Field(field)) => Some((field.name.as_str(), idx)),
                        _ => None,
                    })
                    .collect();
                Action::Construct {
                    shape: shape.clone(),
                    fields: shape
                        .fields
                        .iter()
                        .map(|field| {
                            positions
                                .get(field.name.as_str())
                                .copied()
                                .unwrap_or(usize::MAX)
                        })
                        .collect(),
                }
            }
            Template::PassThrough(idx) => Action::PassThrough(idx),
            Template::Skip => {
                let placeholders: Vec<usize> = production
                    .body
                    .iter()
                    .enumerate()
                    .filter(|(_, element)| matches!(element, Element::Sym(Sym::This)))
                    .map(|(idx, _)| idx)
                    .collect();
                match placeholders[..] {
                    [idx] => Action::PassThrough(idx),
                    _ => {
                        return Err(AssemblyError::SkipPlaceholder {
                            type_name: owner.to_owned(),
                            count: placeholders.len(),
                        })
                    }
                }
            }
            Template::EmptyList => Action::EmptyList,
            Template::ListHead => Action::ListHead,
            Template::ListNext => Action::ListNext,
        };

        grammar.add_production(head, symbols, action, production.prec);
    }

    Ok(())
}

#[cfg(test)]
use crate::{body, Field, Terminal};

#[test]
fn upgrades_are_transitive() {
    let ident = NodeType::new("Identifier").generates(body![Field::new(
        "name",
        Terminal::raw_identifier()
    )]);
    let deref = NodeType::new("DerefIdentifier")
        .inherits(&ident)
        .upgrades(&ident);
    let checked = NodeType::new("CheckedIdentifier")
        .inherits(&ident)
        .upgrades(&deref);
    let program = NodeType::new("Program")
        .generates(body![Field::new("ident", &ident)])
        .start();

    let lowered = lower(&[program, ident, deref, checked]).unwrap();
    let names: Vec<&str> = lowered.types.iter().map(|ty| ty.name()).collect();
    assert_eq!(names, vec!["Program", "CheckedIdentifier"]);

    // `Program` refers to the final upgrade
    let grammar = &lowered.grammar;
    let checked_idx = grammar.get_non_terminal_idx("CheckedIdentifier").unwrap();
    let program = grammar.get_non_terminal(grammar.start);
    assert_eq!(
        program.productions()[0].symbols,
        vec![Symbol::NonTerminal(checked_idx)]
    );
}

#[test]
fn conflicting_upgrades() {
    let base = NodeType::new("Base").start();
    let a = NodeType::new("A").upgrades(&base);
    let b = NodeType::new("B").upgrades(&base);
    assert_eq!(
        lower(&[base, a, b]).map(|_| ()),
        Err(AssemblyError::ConflictingUpgrade {
            upgraded: "Base".to_owned(),
            first: "A".to_owned(),
            second: "B".to_owned(),
        })
    );
}

#[test]
fn upgrade_cycle() {
    let a = NodeType::new("A").start();
    let b = NodeType::new("B").upgrades(&a);
    let a = a.upgrades(&b);
    assert!(matches!(
        lower(&[a, b]),
        Err(AssemblyError::UpgradeCycle { .. })
    ));
}

#[test]
fn start_must_be_unique() {
    let a = NodeType::new("A").generates(body!["a"]).start();
    let b = NodeType::new("B").generates(body!["b"]).start();
    assert_eq!(
        lower(&[a.clone(), b]).map(|_| ()),
        Err(AssemblyError::NoUniqueStart {
            found: vec!["A".to_owned(), "B".to_owned()]
        })
    );

    let c = NodeType::new("C").generates(body!["c"]);
    assert_eq!(
        lower(&[c]).map(|_| ()),
        Err(AssemblyError::NoUniqueStart { found: vec![] })
    );

    // Repeating a type is not a second start
    assert!(lower(&[a.clone(), a]).is_ok());
}

#[test]
fn duplicate_type_names() {
    let a1 = NodeType::new("A").generates(body!["a"]).start();
    let a2 = NodeType::new("A").generates(body!["b"]);
    assert_eq!(
        lower(&[a1, a2]).map(|_| ()),
        Err(AssemblyError::DuplicateType {
            name: "A".to_owned()
        })
    );
}

#[test]
fn field_sets_must_agree() {
    let num = Terminal::number();
    let range = NodeType::new("Range")
        .generates(body![Field::new("lo", &num), "..", Field::new("hi", &num)])
        .generates(body![Field::new("hi", &num), "downto", Field::new("lo", &num)])
        .start();
    let lowered = lower(&[range.clone()]).unwrap();

    // Second body stores its fields in declaration order of the first
    let grammar = &lowered.grammar;
    match &grammar.get_non_terminal(grammar.start).productions()[1].action {
        Action::Construct { fields, .. } => assert_eq!(fields, &vec![2, 0]),
        other => panic!("unexpected action: {:?}", other),
    }

    let broken = range.generates(body![Field::new("lo", &num)]);
    assert_eq!(
        lower(&[broken]).map(|_| ()),
        Err(AssemblyError::FieldMismatch {
            type_name: "Range".to_owned(),
            expected: vec!["lo".to_owned(), "hi".to_owned()],
            found: vec!["lo".to_owned()],
        })
    );
}

#[test]
fn skip_needs_one_placeholder() {
    let expr = NodeType::new("Expr")
        .generates(body![Field::new("value", Terminal::number())])
        .skip(body!["(", ")"])
        .start();
    assert_eq!(
        lower(&[expr]).map(|_| ()),
        Err(AssemblyError::SkipPlaceholder {
            type_name: "Expr".to_owned(),
            count: 0
        })
    );
}

#[test]
fn unknown_types_and_fields() {
    let missing = NodeType::new("Missing");
    let program = NodeType::new("Program")
        .generates(body![Field::new("body", &missing)])
        .start();
    assert_eq!(
        lower(&[program]).map(|_| ()),
        Err(AssemblyError::UnknownType {
            name: "Missing".to_owned(),
            referenced_by: "Program".to_owned()
        })
    );

    let var = NodeType::new("Var")
        .generates(body![Field::new("name", Terminal::raw_identifier())])
        .variable("id")
        .start();
    assert_eq!(
        lower(&[var]).map(|_| ()),
        Err(AssemblyError::UnknownField {
            type_name: "Var".to_owned(),
            field: "id".to_owned()
        })
    );
}
