//! Table-driven predictive parser

use crate::error::{ParseError, Position};
use crate::grammar::{Grammar, NonTerminalIdx, ProductionIdx, Symbol};
use crate::lexer::Token;
use crate::parse_table::ParseTable;
use crate::terminal::Terminal;

use std::collections::VecDeque;
use std::fmt;

/// Concrete parse tree: the production chosen for each non-terminal and the tokens and subtrees
/// matched by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub non_terminal: NonTerminalIdx,
    pub production: ProductionIdx,
    pub children: Vec<ParseChild>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseChild {
    Token(Token),
    Tree(ParseTree),
}

enum Frame {
    /// Match a terminal, or expand a non-terminal
    Expect(Symbol),
    /// All symbols of the production are matched, the last `n_children` values are its children
    Reduce {
        non_terminal: NonTerminalIdx,
        production: ProductionIdx,
        n_children: usize,
    },
}

fn describe(grammar: &Grammar, token: &Token) -> String {
    match grammar.terminals.get(token.terminal) {
        Terminal::Literal(text) => format!("{:?}", text),
        Terminal::Class(class) => format!("{} {:?}", class.name, token.text),
    }
}

/// Position right after the last token
fn end_position(tokens: &VecDeque<Token>) -> Position {
    match tokens.back() {
        None => Position {
            offset: 0,
            line: 1,
            column: 1,
        },
        Some(token) => {
            let mut position = token.position;
            position.offset += token.text.len();
            for c in token.text.chars() {
                if c == '\n' {
                    position.line += 1;
                    position.column = 1;
                } else {
                    position.column += 1;
                }
            }
            position
        }
    }
}

/// Parses the whole token sequence as the start symbol of the grammar. Uses an explicit stack, so
/// deeply nested input doesn't overflow the native stack.
pub fn parse(
    grammar: &Grammar,
    table: &ParseTable,
    tokens: Vec<Token>,
) -> Result<ParseTree, ParseError> {
    let mut tokens: VecDeque<Token> = tokens.into();
    let end = end_position(&tokens);

    let mut stack: Vec<Frame> = vec![Frame::Expect(Symbol::NonTerminal(grammar.start))];
    let mut values: Vec<ParseChild> = vec![];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Expect(Symbol::Terminal(terminal)) => match tokens.pop_front() {
                Some(token) if token.terminal == terminal => {
                    values.push(ParseChild::Token(token));
                }
                Some(token) => {
                    return Err(ParseError::Mismatch {
                        expected: grammar.symbol_name(Symbol::Terminal(terminal)),
                        found: describe(grammar, &token),
                        position: token.position,
                    });
                }
                None => {
                    return Err(ParseError::UnexpectedEnd {
                        expected: grammar.symbol_name(Symbol::Terminal(terminal)),
                        position: end,
                    });
                }
            },

            Frame::Expect(Symbol::NonTerminal(non_terminal)) => {
                let type_name = grammar.get_non_terminal(non_terminal).type_name();
                let production = match tokens.front() {
                    Some(token) => table.get(non_terminal, token.terminal).ok_or_else(|| {
                        ParseError::UnexpectedToken {
                            non_terminal: type_name.to_owned(),
                            found: describe(grammar, token),
                            position: token.position,
                        }
                    })?,
                    None => table.get_end(non_terminal).ok_or_else(|| {
                        ParseError::UnexpectedEnd {
                            expected: type_name.to_owned(),
                            position: end,
                        }
                    })?,
                };

                let symbols = &grammar.get_production(non_terminal, production).symbols;
                stack.push(Frame::Reduce {
                    non_terminal,
                    production,
                    n_children: symbols.len(),
                });
                for symbol in symbols.iter().rev() {
                    stack.push(Frame::Expect(*symbol));
                }
            }

            Frame::Reduce {
                non_terminal,
                production,
                n_children,
            } => {
                let children = values.split_off(values.len() - n_children);
                values.push(ParseChild::Tree(ParseTree {
                    non_terminal,
                    production,
                    children,
                }));
            }
        }
    }

    if let Some(token) = tokens.pop_front() {
        return Err(ParseError::UnconsumedInput {
            found: describe(grammar, &token),
            position: token.position,
        });
    }

    match values.pop() {
        Some(ParseChild::Tree(tree)) => Ok(tree),
        _ => unreachable!("start symbol is a non-terminal"),
    }
}

/// Indented rendering of a parse tree, one node per line
pub struct ParseTreeDisplay<'a, 'b> {
    pub tree: &'a ParseTree,
    pub grammar: &'b Grammar,
}

impl<'a, 'b> fmt::Display for ParseTreeDisplay<'a, 'b> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack: Vec<(&ParseChild, usize)> = vec![];

        writeln!(
            f,
            "{}",
            self.grammar.get_non_terminal(self.tree.non_terminal).name()
        )?;
        for child in self.tree.children.iter().rev() {
            stack.push((child, 1));
        }

        while let Some((child, depth)) = stack.pop() {
            match child {
                ParseChild::Tree(tree) => {
                    writeln!(
                        f,
                        "{:indent$}{}",
                        "",
                        self.grammar.get_non_terminal(tree.non_terminal).name(),
                        indent = depth * 4
                    )?;
                    for child in tree.children.iter().rev() {
                        stack.push((child, depth + 1));
                    }
                }
                ParseChild::Token(token) => {
                    writeln!(
                        f,
                        "{:indent$}{}",
                        "",
                        describe(self.grammar, token),
                        indent = depth * 4
                    )?;
                }
            }
        }

        Ok(())
    }
}

#[test]
fn parse_tree_of_list() {
    let lang = crate::test_grammars::number_list(false);
    let tree = lang.parse_tree("1 ; 2").unwrap();
    assert_eq!(
        lang.display_tree(&tree).to_string(),
        "Numbers\n    Num\n        Number \"1\"\n    Numbers@rest\n        \";\"\n        Num\n            \
         Number \"2\"\n        Numbers@rest\n"
    );
}

#[test]
fn parse_errors() {
    let lang = crate::test_grammars::arithmetic();

    assert_eq!(
        lang.parse("1 +"),
        Err(ParseError::UnexpectedEnd {
            expected: "Expr".to_owned(),
            position: Position {
                offset: 3,
                line: 1,
                column: 4
            }
        })
    );

    assert_eq!(
        lang.parse("(1"),
        Err(ParseError::UnexpectedEnd {
            expected: "\")\"".to_owned(),
            position: Position {
                offset: 2,
                line: 1,
                column: 3
            }
        })
    );

    // The operator tail can't end before a number
    assert_eq!(
        lang.parse("1 2"),
        Err(ParseError::UnexpectedToken {
            non_terminal: "Expr".to_owned(),
            found: "Number \"2\"".to_owned(),
            position: Position {
                offset: 2,
                line: 1,
                column: 3
            }
        })
    );

    assert!(matches!(
        lang.parse("* 2"),
        Err(ParseError::UnexpectedToken { .. })
    ));
}

#[test]
fn errors_name_the_node_type() {
    let lang = crate::test_grammars::number_list(false);
    assert_eq!(
        lang.parse("1 2"),
        Err(ParseError::UnexpectedToken {
            non_terminal: "Numbers".to_owned(),
            found: "Number \"2\"".to_owned(),
            position: Position {
                offset: 2,
                line: 1,
                column: 3
            }
        })
    );

    let lang = crate::test_grammars::arithmetic();
    match lang.parse("1 * ") {
        Err(ParseError::UnexpectedEnd { expected, .. }) => assert_eq!(expected, "Expr"),
        other => panic!("unexpected result: {:?}", other),
    }
}
