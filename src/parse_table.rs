//! Predictive parse table, with priority-based conflict resolution

use crate::error::AssemblyError;
use crate::first::FirstTable;
use crate::follow::FollowTable;
use crate::grammar::{Grammar, NonTerminalIdx, ProductionDisplay, ProductionIdx, Symbol};
use crate::terminal::TerminalIdx;

use std::collections::BTreeMap;
use std::fmt;

use fxhash::FxHashMap;

/// Predictive parse table
#[derive(Debug, Default, Clone)]
pub struct ParseTable {
    // Informally: if I'm parsing the non-terminal `NT` and next token is `c`, then `(NT, c)` in
    // the table tells me which production to expect. If there isn't an entry for `(NT, c)` then we
    // have an error in the input.
    pub table: FxHashMap<(NonTerminalIdx, TerminalIdx), ProductionIdx>,

    // Same as `table`, but for `$`
    pub end: FxHashMap<NonTerminalIdx, ProductionIdx>,

    /// Cells where more than one production applied and priorities picked one
    pub resolutions: Vec<Resolution>,
}

/// A table cell claimed by several productions, decided by production priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub non_terminal: NonTerminalIdx,
    /// `None` for the end of input
    pub lookahead: Option<TerminalIdx>,
    pub chosen: ProductionIdx,
    pub rejected: Vec<ProductionIdx>,
}

impl ParseTable {
    fn add(
        &mut self,
        non_terminal_idx: NonTerminalIdx,
        lookahead: Option<TerminalIdx>,
        production_idx: ProductionIdx,
    ) {
        let old = match lookahead {
            Some(token) => self.table.insert((non_terminal_idx, token), production_idx),
            None => self.end.insert(non_terminal_idx, production_idx),
        };
        debug_assert_eq!(old, None);
    }

    pub fn get(
        &self,
        non_terminal_idx: NonTerminalIdx,
        token: TerminalIdx,
    ) -> Option<ProductionIdx> {
        self.table.get(&(non_terminal_idx, token)).copied()
    }

    pub fn get_end(&self, non_terminal_idx: NonTerminalIdx) -> Option<ProductionIdx> {
        self.end.get(&non_terminal_idx).copied()
    }
}

fn lookahead_name(grammar: &Grammar, lookahead: Option<TerminalIdx>) -> String {
    match lookahead {
        Some(terminal) => grammar.symbol_name(Symbol::Terminal(terminal)),
        None => "end of input".to_owned(),
    }
}

/// Fills the table from the first and follow sets. A cell claimed by several productions goes to
/// the one with the highest priority; a tie between different productions is an ambiguity.
pub fn generate_parse_table(
    grammar: &Grammar,
    first_table: &FirstTable,
    follow_table: &FollowTable,
) -> Result<ParseTable, AssemblyError> {
    // Ordered so that errors and resolutions don't depend on hashing
    let mut candidates: BTreeMap<(NonTerminalIdx, Option<TerminalIdx>), Vec<ProductionIdx>> =
        BTreeMap::new();

    let mut add_candidate = |non_terminal_idx, lookahead, production_idx| {
        let cell: &mut Vec<ProductionIdx> = candidates
            .entry((non_terminal_idx, lookahead))
            .or_default();
        if !cell.contains(&production_idx) {
            cell.push(production_idx);
        }
    };

    for (non_terminal_idx, production_idx, production) in grammar.production_indices() {
        let first = first_table.first_of_symbols(&production.symbols);
        for terminal in first.terminals() {
            add_candidate(non_terminal_idx, Some(terminal), production_idx);
        }
        if first.has_empty() {
            let nt_follows = follow_table.get_follow(non_terminal_idx);
            for terminal in nt_follows.terminals() {
                add_candidate(non_terminal_idx, Some(*terminal), production_idx);
            }
            if nt_follows.has_end() {
                add_candidate(non_terminal_idx, None, production_idx);
            }
        }
    }

    let mut table: ParseTable = Default::default();

    for ((non_terminal_idx, lookahead), productions) in candidates {
        if let [production_idx] = productions[..] {
            table.add(non_terminal_idx, lookahead, production_idx);
            continue;
        }

        let priority = |p_idx: ProductionIdx| {
            grammar
                .get_production(non_terminal_idx, p_idx)
                .prec
                .priority
        };

        let max_priority = productions
            .iter()
            .map(|p_idx| priority(*p_idx))
            .max()
            .unwrap_or(i32::MIN);

        let (winners, rejected): (Vec<ProductionIdx>, Vec<ProductionIdx>) = productions
            .iter()
            .partition(|p_idx| priority(**p_idx) == max_priority);

        if winners.len() != 1 {
            return Err(AssemblyError::Ambiguous {
                non_terminal: grammar.get_non_terminal(non_terminal_idx).name().to_owned(),
                lookahead: lookahead_name(grammar, lookahead),
                productions: winners
                    .iter()
                    .map(|p_idx| {
                        ProductionDisplay::new(
                            grammar.get_production(non_terminal_idx, *p_idx),
                            grammar,
                        )
                        .to_string()
                    })
                    .collect(),
            });
        }

        table.add(non_terminal_idx, lookahead, winners[0]);
        table.resolutions.push(Resolution {
            non_terminal: non_terminal_idx,
            lookahead,
            chosen: winners[0],
            rejected,
        });
    }

    Ok(table)
}

/// Rejects grammars where a non-terminal can derive a sentence starting with itself. Such
/// grammars can't be parsed predictively, whatever the priorities.
pub fn check_left_recursion(
    grammar: &Grammar,
    first_table: &FirstTable,
) -> Result<(), AssemblyError> {
    // `A -> B` when `B` can be the leftmost non-terminal of a sentence derived from `A`
    let mut edges: Vec<Vec<NonTerminalIdx>> = vec![vec![]; grammar.n_non_terminals()];
    for (non_terminal_idx, _, production) in grammar.production_indices() {
        for symbol in &production.symbols {
            match symbol {
                Symbol::NonTerminal(nt_idx) => {
                    let successors = &mut edges[non_terminal_idx.as_usize()];
                    if !successors.contains(nt_idx) {
                        successors.push(*nt_idx);
                    }
                    if !first_table.is_nullable(*nt_idx) {
                        break;
                    }
                }
                Symbol::Terminal(_) => break,
            }
        }
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Visit {
        New,
        Active,
        Done,
    }

    let mut visits = vec![Visit::New; grammar.n_non_terminals()];

    for root in 0..grammar.n_non_terminals() {
        if visits[root] != Visit::New {
            continue;
        }

        // Explicit DFS stack of (non-terminal, next successor to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        visits[root] = Visit::Active;

        while let Some((nt, next)) = stack.last_mut() {
            let nt = *nt;
            match edges[nt].get(*next) {
                Some(successor) => {
                    *next += 1;
                    let successor = successor.as_usize();
                    match visits[successor] {
                        Visit::Active => {
                            return Err(AssemblyError::LeftRecursion {
                                non_terminal: grammar
                                    .get_non_terminal(NonTerminalIdx::from_usize(successor))
                                    .name()
                                    .to_owned(),
                            });
                        }
                        Visit::New => {
                            visits[successor] = Visit::Active;
                            stack.push((successor, 0));
                        }
                        Visit::Done => {}
                    }
                }
                None => {
                    visits[nt] = Visit::Done;
                    stack.pop();
                }
            }
        }
    }

    Ok(())
}

pub struct ParseTableDisplay<'a, 'b> {
    pub table: &'a ParseTable,
    pub grammar: &'b Grammar,
}

impl<'a, 'b> fmt::Display for ParseTableDisplay<'a, 'b> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cells: Vec<(NonTerminalIdx, Option<TerminalIdx>, ProductionIdx)> = self
            .table
            .table
            .iter()
            .map(|((nt, t), p)| (*nt, Some(*t), *p))
            .chain(self.table.end.iter().map(|(nt, p)| (*nt, None, *p)))
            .collect();
        cells.sort();

        for (nt_idx, lookahead, p_idx) in cells {
            writeln!(
                f,
                "{}, {} -> {}",
                self.grammar.get_non_terminal(nt_idx).name(),
                lookahead_name(self.grammar, lookahead),
                ProductionDisplay::new(self.grammar.get_production(nt_idx, p_idx), self.grammar)
            )?;
        }

        for resolution in &self.table.resolutions {
            write!(
                f,
                "resolved: {}, {}: chose {}, rejected",
                self.grammar.get_non_terminal(resolution.non_terminal).name(),
                lookahead_name(self.grammar, resolution.lookahead),
                resolution.chosen.as_usize(),
            )?;
            for rejected in &resolution.rejected {
                write!(f, " {}", rejected.as_usize())?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[test]
fn operators_win_over_ending_the_tail() {
    let lang = crate::test_grammars::arithmetic();
    let grammar = lang.grammar();
    let table = lang.parse_table();

    // `-` continues the tail, `)` and the end of input end it
    let tail = grammar.get_non_terminal_idx("Expr#10'").unwrap();
    let minus = grammar.terminals.find("-").unwrap();
    let p_idx = table.get(tail, minus).unwrap();
    assert!(!grammar.get_production(tail, p_idx).symbols.is_empty());

    let close = grammar.terminals.find(")").unwrap();
    let p_idx = table.get(tail, close).unwrap();
    assert!(grammar.get_production(tail, p_idx).symbols.is_empty());
    assert!(table.get_end(tail).is_some());
}

#[test]
fn equal_priorities_are_ambiguous() {
    use crate::{Field, Language, NodeType, Terminal};

    let stmt = NodeType::new("Stmt").start();
    let call = NodeType::new("Call")
        .generates(crate::body![Field::new("name", Terminal::raw_identifier()), "(", ")"])
        .replaces(&stmt);
    let var = NodeType::new("Var")
        .generates(crate::body![Field::new("name", Terminal::raw_identifier())])
        .replaces(&stmt);

    match Language::new(&[stmt, call, var]) {
        Err(AssemblyError::Ambiguous {
            non_terminal,
            lookahead,
            productions,
        }) => {
            assert_eq!(non_terminal, "Stmt");
            assert_eq!(lookahead, "RawIdentifier");
            assert_eq!(productions, vec!["Call".to_owned(), "Var".to_owned()]);
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn indirect_left_recursion_is_rejected() {
    use crate::{Field, Language, NodeType};

    let a = NodeType::new("A").start();
    let b = NodeType::new("B");
    let a = a.generates(crate::body![Field::new("b", &b), "x"]);
    let b = b.generates(crate::body![Field::new("a", &a), "y"]);

    assert_eq!(
        Language::new(&[a, b]).map(|_| ()),
        Err(AssemblyError::LeftRecursion {
            non_terminal: "A".to_owned()
        })
    );
}
