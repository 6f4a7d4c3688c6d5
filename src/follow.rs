//! Implementation of "follow" sets

use crate::first::FirstTable;
use crate::grammar::{Grammar, NonTerminalIdx, Symbol};
use crate::terminal::TerminalIdx;

use std::fmt;

use fxhash::FxHashSet;

/// Maps non-terminals to their follow sets
#[derive(Debug, Clone)]
pub struct FollowTable(Vec<FollowSet>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSet {
    end: bool,
    terminals: FxHashSet<TerminalIdx>,
}

impl FollowSet {
    pub fn terminals(&self) -> &FxHashSet<TerminalIdx> {
        &self.terminals
    }

    pub fn has_end(&self) -> bool {
        self.end
    }
}

impl FollowTable {
    fn new(n_non_terminals: usize) -> FollowTable {
        FollowTable(vec![FollowSet::default(); n_non_terminals])
    }

    /// Returns whether the value is added
    fn add_follow(&mut self, non_terminal_idx: NonTerminalIdx, terminal: TerminalIdx) -> bool {
        self.0[non_terminal_idx.as_usize()]
            .terminals
            .insert(terminal)
    }

    /// Returns whether the value is changed
    fn set_end(&mut self, non_terminal_idx: NonTerminalIdx) -> bool {
        let end = &mut self.0[non_terminal_idx.as_usize()].end;
        let old_value = *end;
        *end = true;
        !old_value
    }

    pub fn get_follow(&self, non_terminal_idx: NonTerminalIdx) -> &FollowSet {
        &self.0[non_terminal_idx.as_usize()]
    }
}

/// Non-terminals reachable from the start symbol, indexed by `NonTerminalIdx`
fn reachable(grammar: &Grammar) -> Vec<bool> {
    let mut reachable = vec![false; grammar.n_non_terminals()];
    let mut work_list = vec![grammar.start];
    reachable[grammar.start.as_usize()] = true;

    while let Some(nt_idx) = work_list.pop() {
        for production in grammar.get_non_terminal(nt_idx).productions() {
            for symbol in &production.symbols {
                if let Symbol::NonTerminal(next) = symbol {
                    if !reachable[next.as_usize()] {
                        reachable[next.as_usize()] = true;
                        work_list.push(*next);
                    }
                }
            }
        }
    }

    reachable
}

/// Computes follow sets. Only productions of non-terminals reachable from the start symbol
/// contribute; stratification leaves the original operator productions behind unreachable.
pub fn generate_follow_table(grammar: &Grammar, first_table: &FirstTable) -> FollowTable {
    let mut table = FollowTable::new(grammar.n_non_terminals());

    if grammar.n_non_terminals() == 0 {
        return table;
    }

    let reachable = reachable(grammar);

    table.set_end(grammar.start);

    let mut updated = true;
    while updated {
        updated = false;

        for (head_idx, _, production) in grammar.production_indices() {
            if !reachable[head_idx.as_usize()] {
                continue;
            }

            for (symbol_idx, symbol) in production.symbols.iter().enumerate() {
                let nt_idx = match symbol {
                    Symbol::NonTerminal(nt_idx) => *nt_idx,
                    Symbol::Terminal(_) => continue,
                };

                // Whatever can start the rest of the production follows the non-terminal
                let rest_first = first_table.first_of_symbols(&production.symbols[symbol_idx + 1..]);
                for terminal in rest_first.terminals() {
                    updated |= table.add_follow(nt_idx, terminal);
                }

                // When the rest can be empty the non-terminal is at the end of the production,
                // so it is followed by what follows the head
                if rest_first.has_empty() && head_idx != nt_idx {
                    let head_follows = table.get_follow(head_idx).clone();
                    if head_follows.end {
                        updated |= table.set_end(nt_idx);
                    }
                    for follow in head_follows.terminals {
                        updated |= table.add_follow(nt_idx, follow);
                    }
                }
            }
        }
    }

    table
}

pub struct FollowSetDisplay<'a, 'b> {
    pub set: &'a FollowSet,
    pub grammar: &'b Grammar,
}

impl<'a, 'b> fmt::Display for FollowSetDisplay<'a, 'b> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terminals: Vec<TerminalIdx> = self.set.terminals.iter().copied().collect();
        terminals.sort();

        write!(f, "{{")?;
        for (t_idx, t) in terminals.iter().enumerate() {
            if t_idx != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.grammar.terminals.get(*t))?;
        }
        if self.set.end {
            if !terminals.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "$")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
fn follow_names(grammar: &Grammar, set: &FollowSet) -> fxhash::FxHashSet<String> {
    set.terminals()
        .iter()
        .map(|t| grammar.terminals.get(*t).to_string())
        .collect()
}

#[test]
fn follow_sets_of_expression_grammar() {
    let lang = crate::test_grammars::arithmetic();
    let grammar = lang.grammar();
    let follow = lang.follow_table();

    let expr = grammar.get_non_terminal_idx("Expr").unwrap();
    assert!(follow.get_follow(expr).has_end());
    assert_eq!(
        follow_names(grammar, follow.get_follow(expr)),
        hashset! { "\")\"".to_owned() }
    );

    // Operands of `*` are followed by all operators
    let atom = grammar.get_non_terminal_idx("Expr#atom").unwrap();
    assert!(follow.get_follow(atom).has_end());
    assert_eq!(
        follow_names(grammar, follow.get_follow(atom)),
        hashset! {
            "\")\"".to_owned(),
            "\"+\"".to_owned(),
            "\"-\"".to_owned(),
            "\"*\"".to_owned(),
            "\"/\"".to_owned(),
        }
    );
}

#[test]
fn start_is_followed_by_end() {
    let lang = crate::test_grammars::number_list(true);
    let grammar = lang.grammar();
    assert!(lang.follow_table().get_follow(grammar.start).has_end());
}
