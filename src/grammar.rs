//! A lowered representation of grammars

use crate::action::Action;
use crate::node_type::Prec;
use crate::terminal::{TerminalArena, TerminalIdx};

use std::convert::TryFrom;
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct NonTerminalIdx(pub u32);

impl NonTerminalIdx {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn from_usize(i: usize) -> Self {
        Self(u32::try_from(i).unwrap())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct ProductionIdx(pub u32);

impl ProductionIdx {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn from_usize(i: usize) -> Self {
        Self(u32::try_from(i).unwrap())
    }
}

#[derive(Debug, Clone)]
pub struct Grammar {
    // Indexed by `NonTerminalIdx`
    pub non_terminals: Vec<NonTerminal>,
    pub terminals: TerminalArena,
    pub start: NonTerminalIdx,
}

#[derive(Debug, Clone)]
pub struct NonTerminal {
    pub non_terminal: String,
    // Indexed by `ProductionIdx`
    pub productions: Vec<Production>,
}

#[derive(Debug, Clone)]
pub struct Production {
    pub symbols: Vec<Symbol>,
    pub action: Action,
    pub prec: Prec,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Symbol {
    NonTerminal(NonTerminalIdx),
    Terminal(TerminalIdx),
}

impl Grammar {
    pub fn new() -> Self {
        Grammar {
            non_terminals: vec![],
            terminals: TerminalArena::new(),
            start: NonTerminalIdx(0),
        }
    }

    pub fn add_non_terminal(&mut self, non_terminal: String) -> NonTerminalIdx {
        let idx = NonTerminalIdx::from_usize(self.non_terminals.len());
        self.non_terminals.push(NonTerminal {
            non_terminal,
            productions: Default::default(),
        });
        idx
    }

    pub fn get_non_terminal(&self, idx: NonTerminalIdx) -> &NonTerminal {
        &self.non_terminals[idx.as_usize()]
    }

    pub fn get_non_terminal_idx(&self, name: &str) -> Option<NonTerminalIdx> {
        self.non_terminals
            .iter()
            .position(|non_terminal| non_terminal.non_terminal == name)
            .map(NonTerminalIdx::from_usize)
    }

    pub fn n_non_terminals(&self) -> usize {
        self.non_terminals.len()
    }

    pub fn n_terminals(&self) -> usize {
        self.terminals.n_terminals()
    }

    pub fn add_production(
        &mut self,
        non_terminal: NonTerminalIdx,
        symbols: Vec<Symbol>,
        action: Action,
        prec: Prec,
    ) -> ProductionIdx {
        let non_terminal = &mut self.non_terminals[non_terminal.as_usize()];
        let prod_idx = ProductionIdx::from_usize(non_terminal.productions.len());
        non_terminal.productions.push(Production {
            symbols,
            action,
            prec,
        });
        prod_idx
    }

    pub fn get_production(&self, nt_idx: NonTerminalIdx, prod_idx: ProductionIdx) -> &Production {
        &self.non_terminals[nt_idx.as_usize()].productions[prod_idx.as_usize()]
    }

    pub fn non_terminals(&self) -> &[NonTerminal] {
        &self.non_terminals
    }

    pub fn non_terminal_indices(&self) -> impl Iterator<Item = (NonTerminalIdx, &NonTerminal)> {
        self.non_terminals
            .iter()
            .enumerate()
            .map(|(idx, nt)| (NonTerminalIdx::from_usize(idx), nt))
    }

    pub fn production_indices(
        &self,
    ) -> impl Iterator<Item = (NonTerminalIdx, ProductionIdx, &Production)> {
        self.non_terminal_indices().flat_map(|(nt_idx, nt)| {
            nt.production_indices()
                .zip(nt.productions.iter())
                .map(move |(p_idx, p)| (nt_idx, p_idx, p))
        })
    }

    /// Name of a symbol as shown in diagnostics: non-terminal names, quoted literals, terminal
    /// class names.
    pub fn symbol_name(&self, symbol: Symbol) -> String {
        match symbol {
            Symbol::NonTerminal(nt) => self.get_non_terminal(nt).non_terminal.clone(),
            Symbol::Terminal(t) => self.terminals.get(t).to_string(),
        }
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new()
    }
}

impl NonTerminal {
    pub fn name(&self) -> &str {
        &self.non_terminal
    }

    /// Name of the node type this non-terminal belongs to. Precedence levels (`E#p`) and helpers
    /// (`L@rest`) are named after their owner.
    pub fn type_name(&self) -> &str {
        match self.non_terminal.find(|c| c == '#' || c == '@') {
            Some(end) => &self.non_terminal[..end],
            None => &self.non_terminal,
        }
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production_indices(&self) -> impl Iterator<Item = ProductionIdx> {
        (0..self.productions.len()).map(ProductionIdx::from_usize)
    }

    pub fn get_production(&self, production_idx: ProductionIdx) -> &Production {
        &self.productions[production_idx.as_usize()]
    }
}

impl Production {
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

pub struct ProductionDisplay<'a, 'b> {
    production: &'a Production,
    grammar: &'b Grammar,
}

impl<'a, 'b> ProductionDisplay<'a, 'b> {
    pub fn new(production: &'a Production, grammar: &'b Grammar) -> Self {
        Self {
            production,
            grammar,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (nt_idx, nt) in self.non_terminals.iter().enumerate() {
            writeln!(
                f,
                "{}: {}{} = {{",
                nt_idx,
                if nt_idx == self.start.as_usize() {
                    "start "
                } else {
                    ""
                },
                nt.non_terminal
            )?;

            for (p_idx, p) in nt.productions.iter().enumerate() {
                writeln!(
                    f,
                    "  {}: {}",
                    p_idx,
                    ProductionDisplay {
                        production: p,
                        grammar: self
                    }
                )?;
            }

            writeln!(f, "}}")?;
        }

        Ok(())
    }
}

impl<'a, 'b> fmt::Display for ProductionDisplay<'a, 'b> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.production.symbols.is_empty() {
            write!(f, "(empty)")?;
        }
        for (symbol_idx, symbol) in self.production.symbols().iter().enumerate() {
            write!(f, "{}", self.grammar.symbol_name(*symbol))?;
            if symbol_idx != self.production.symbols().len() - 1 {
                write!(f, " ")?;
            }
        }
        if self.production.prec != Prec::default() {
            write!(f, "  {{{}}}", self.production.prec)?;
        }
        Ok(())
    }
}
