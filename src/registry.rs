//! Maps node types, terminals and helper symbols to grammar symbols.
//!
//! Every node type gets one non-terminal named after the type. A type that upgrades another type
//! is registered under the upgraded type's name too, so bodies mentioning the old type resolve to
//! the new type's non-terminal.

use crate::error::AssemblyError;
use crate::grammar::{Grammar, NonTerminalIdx, Symbol};
use crate::node_type::{Element, Sym};

use fxhash::FxHashMap;

#[derive(Debug, Default)]
pub struct SymbolRegistry {
    /// Node type names, including upgraded names, to their non-terminals
    types: FxHashMap<String, NonTerminalIdx>,

    /// Helper symbols (`<owner>@<role>`), allocated on first use
    helpers: FxHashMap<String, NonTerminalIdx>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register_type(&mut self, grammar: &mut Grammar, name: &str) -> NonTerminalIdx {
        let nt_idx = grammar.add_non_terminal(name.to_owned());
        self.types.insert(name.to_owned(), nt_idx);
        nt_idx
    }

    /// Makes `name` resolve to `non_terminal`
    pub fn alias(&mut self, name: &str, non_terminal: NonTerminalIdx) {
        self.types.insert(name.to_owned(), non_terminal);
    }

    pub fn resolve_type(
        &self,
        name: &str,
        referenced_by: &str,
    ) -> Result<NonTerminalIdx, AssemblyError> {
        self.types
            .get(name)
            .copied()
            .ok_or_else(|| AssemblyError::UnknownType {
                name: name.to_owned(),
                referenced_by: referenced_by.to_owned(),
            })
    }

    pub fn resolve_helper(
        &mut self,
        grammar: &mut Grammar,
        owner: &str,
        role: &str,
    ) -> NonTerminalIdx {
        let name = format!("{}@{}", owner, role);
        if let Some(nt_idx) = self.helpers.get(&name) {
            return *nt_idx;
        }
        let nt_idx = grammar.add_non_terminal(name.clone());
        self.helpers.insert(name, nt_idx);
        nt_idx
    }

    /// Resolves a body element of a production declared by `owner`
    pub fn resolve(
        &mut self,
        grammar: &mut Grammar,
        owner: &str,
        sym: &Sym,
    ) -> Result<Symbol, AssemblyError> {
        match sym {
            Sym::This => Ok(Symbol::NonTerminal(self.resolve_type(owner, owner)?)),
            Sym::Node(name) => Ok(Symbol::NonTerminal(self.resolve_type(name, owner)?)),
            Sym::Terminal(terminal) => Ok(Symbol::Terminal(grammar.terminals.intern(terminal)?)),
            Sym::Field(field) => self.resolve(grammar, owner, &field.target),
        }
    }

    pub(crate) fn resolve_element(
        &mut self,
        grammar: &mut Grammar,
        owner: &str,
        element: &Element,
    ) -> Result<Symbol, AssemblyError> {
        match element {
            Element::Sym(sym) => self.resolve(grammar, owner, sym),
            Element::Helper(role) => Ok(Symbol::NonTerminal(
                self.resolve_helper(grammar, owner, role),
            )),
        }
    }
}

#[test]
fn upgraded_names_resolve_to_replacement() {
    let mut grammar = Grammar::new();
    let mut registry = SymbolRegistry::new();
    let ident = registry.register_type(&mut grammar, "DerefIdentifier");
    registry.alias("Identifier", ident);
    assert_eq!(registry.resolve_type("Identifier", "Let"), Ok(ident));
    assert_eq!(
        registry.resolve_type("Expression", "Let"),
        Err(AssemblyError::UnknownType {
            name: "Expression".to_owned(),
            referenced_by: "Let".to_owned()
        })
    );
}

#[test]
fn helpers_are_allocated_once() {
    let mut grammar = Grammar::new();
    let mut registry = SymbolRegistry::new();
    registry.register_type(&mut grammar, "Items");
    let rest_1 = registry.resolve_helper(&mut grammar, "Items", "rest");
    let rest_2 = registry.resolve_helper(&mut grammar, "Items", "rest");
    assert_eq!(rest_1, rest_2);
    assert_eq!(grammar.get_non_terminal(rest_1).name(), "Items@rest");
    assert_eq!(grammar.n_non_terminals(), 2);
}
