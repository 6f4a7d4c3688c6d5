//! Implementation of "first" sets

use crate::bitset::BitSet;
use crate::grammar::{Grammar, NonTerminalIdx, Symbol};
use crate::terminal::TerminalIdx;

use std::fmt;

/// Maps non-terminals to their first sets
#[derive(Debug, Clone)]
pub struct FirstTable {
    sets: Vec<FirstSet>,
    n_terminals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSet {
    empty: bool,
    terminals: BitSet<TerminalIdx>,
}

impl FirstSet {
    pub fn new(n_terminals: usize) -> Self {
        FirstSet {
            empty: false,
            terminals: BitSet::new(n_terminals),
        }
    }

    /// Returns whether the terminal is added
    pub fn add(&mut self, terminal: TerminalIdx) -> bool {
        self.terminals.set(&terminal)
    }

    /// Returns whether the value is changed
    pub fn set_empty(&mut self) -> bool {
        let old_value = self.empty;
        self.empty = true;
        !old_value
    }

    pub fn has_empty(&self) -> bool {
        self.empty
    }

    pub fn contains(&self, terminal: TerminalIdx) -> bool {
        self.terminals.get(&terminal)
    }

    pub fn terminals(&self) -> impl Iterator<Item = TerminalIdx> + '_ {
        self.terminals.elems()
    }
}

impl FirstTable {
    fn new(n_non_terminals: usize, n_terminals: usize) -> FirstTable {
        FirstTable {
            sets: vec![FirstSet::new(n_terminals); n_non_terminals],
            n_terminals,
        }
    }

    pub fn get_first(&self, non_terminal_idx: NonTerminalIdx) -> &FirstSet {
        &self.sets[non_terminal_idx.as_usize()]
    }

    /// Whether the non-terminal derives the empty string
    pub fn is_nullable(&self, non_terminal_idx: NonTerminalIdx) -> bool {
        self.get_first(non_terminal_idx).has_empty()
    }

    pub fn first_of_symbol(&self, symbol: Symbol) -> FirstSet {
        match symbol {
            Symbol::NonTerminal(nt) => self.get_first(nt).clone(),
            Symbol::Terminal(t) => {
                let mut set = FirstSet::new(self.n_terminals);
                set.add(t);
                set
            }
        }
    }

    /// First set of a sequence of symbols. The set of an empty sequence has only the empty
    /// string.
    pub fn first_of_symbols(&self, symbols: &[Symbol]) -> FirstSet {
        let mut set = FirstSet::new(self.n_terminals);
        for symbol in symbols {
            match symbol {
                Symbol::NonTerminal(nt) => {
                    let nt_first = self.get_first(*nt);
                    set.terminals.union(&nt_first.terminals);
                    if !nt_first.empty {
                        return set;
                    }
                }
                Symbol::Terminal(t) => {
                    set.add(*t);
                    return set;
                }
            }
        }
        set.set_empty();
        set
    }
}

pub fn generate_first_table(grammar: &Grammar) -> FirstTable {
    let mut table = FirstTable::new(grammar.n_non_terminals(), grammar.n_terminals());

    let mut updated = true;
    while updated {
        updated = false;
        for (non_terminal_idx, non_terminal) in grammar.non_terminal_indices() {
            let nt = non_terminal_idx.as_usize();
            'production_loop: for production in &non_terminal.productions {
                for symbol in &production.symbols {
                    match symbol {
                        Symbol::NonTerminal(symbol_nt) => {
                            let symbol_nt = symbol_nt.as_usize();
                            if symbol_nt != nt {
                                let first = table.sets[symbol_nt].terminals.clone();
                                updated |= table.sets[nt].terminals.union(&first);
                            }
                            if !table.sets[symbol_nt].empty {
                                continue 'production_loop;
                            }
                        }
                        Symbol::Terminal(terminal) => {
                            updated |= table.sets[nt].add(*terminal);
                            continue 'production_loop;
                        }
                    }
                }
                // All symbols in the production can be empty, so the non-terminal can be empty
                updated |= table.sets[nt].set_empty();
            }
        }
    }

    table
}

pub struct FirstSetDisplay<'a, 'b> {
    pub set: &'a FirstSet,
    pub grammar: &'b Grammar,
}

impl<'a, 'b> fmt::Display for FirstSetDisplay<'a, 'b> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (t_idx, t) in self.set.terminals().enumerate() {
            if t_idx != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.grammar.terminals.get(t))?;
        }
        write!(f, "}}")?;

        if self.set.empty {
            write!(f, " (+ empty)")?;
        }

        Ok(())
    }
}

#[cfg(test)]
fn first_names(grammar: &Grammar, set: &FirstSet) -> fxhash::FxHashSet<String> {
    set.terminals()
        .map(|t| grammar.terminals.get(t).to_string())
        .collect()
}

#[test]
fn first_sets_of_expression_grammar() {
    let lang = crate::test_grammars::arithmetic();
    let grammar = lang.grammar();
    let first = lang.first_table();

    let expr = grammar.get_non_terminal_idx("Expr").unwrap();
    assert_eq!(
        first_names(grammar, first.get_first(expr)),
        hashset! {
            "Number".to_owned(),
            "\"(\"".to_owned(),
            "\"-\"".to_owned(),
        }
    );
    assert!(!first.is_nullable(expr));

    // Operator tails can end
    let tail = grammar.get_non_terminal_idx("Expr#10'").unwrap();
    assert!(first.is_nullable(tail));
    assert_eq!(
        first_names(grammar, first.get_first(tail)),
        hashset! { "\"+\"".to_owned(), "\"-\"".to_owned() }
    );
}

#[test]
fn first_of_empty_sequence() {
    let lang = crate::test_grammars::arithmetic();
    let set = lang.first_table().first_of_symbols(&[]);
    assert!(set.has_empty());
    assert_eq!(set.terminals().count(), 0);
}

#[test]
fn first_of_terminal_is_itself() {
    let lang = crate::test_grammars::arithmetic();
    let grammar = lang.grammar();
    let first = lang.first_table();
    assert!(grammar.n_terminals() > 0);
    for t in grammar.terminals.terminal_indices() {
        let set = first.first_of_symbol(Symbol::Terminal(t));
        assert_eq!(set.terminals().collect::<Vec<_>>(), vec![t]);
        assert!(!set.has_empty());
    }
}
