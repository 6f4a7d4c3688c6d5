//! Scanner for the terminals of a grammar.
//!
//! Only terminals used by the grammar are recognized. Whitespace and `%` line comments separate
//! tokens. At each position the longest match wins; on equal lengths a literal beats a class, a
//! class with higher priority beats one with lower priority, and otherwise the terminal interned
//! first wins.

use crate::ast::Value;
use crate::error::{AssemblyError, ParseError, Position};
use crate::terminal::{Decode, Terminal, TerminalArena, TerminalIdx};

use std::cmp::Reverse;

use once_cell::sync::Lazy;
use regex::Regex;

static LAYOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A(?:\s+|%[^\n]*)+").unwrap());

/// A scanned token. The value is the decoded value of class terminals, or the matched text of
/// literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub terminal: TerminalIdx,
    pub text: String,
    pub value: Value,
    pub position: Position,
}

#[derive(Debug, Clone)]
struct ClassMatcher {
    name: String,
    terminal: TerminalIdx,
    regex: Regex,
    decode: Decode,
    priority: i32,
}

#[derive(Debug, Clone)]
pub struct Lexer {
    literals: Vec<(String, TerminalIdx)>,
    classes: Vec<ClassMatcher>,
}

impl Lexer {
    pub fn new(terminals: &TerminalArena) -> Result<Lexer, AssemblyError> {
        let mut literals = vec![];
        let mut classes = vec![];

        for (idx, terminal) in terminals.iter() {
            match terminal {
                Terminal::Literal(text) => literals.push((text.clone(), idx)),
                Terminal::Class(class) => {
                    // Anchored, matched against the rest of the input
                    let regex = Regex::new(&format!(r"\A(?:{})", class.pattern)).map_err(|err| {
                        AssemblyError::InvalidPattern {
                            terminal: class.name.clone(),
                            message: err.to_string(),
                        }
                    })?;
                    classes.push(ClassMatcher {
                        name: class.name.clone(),
                        terminal: idx,
                        regex,
                        decode: class.decode,
                        priority: class.priority,
                    });
                }
            }
        }

        Ok(Lexer { literals, classes })
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, ParseError> {
        let mut tokens = vec![];
        let mut position = Position {
            offset: 0,
            line: 1,
            column: 1,
        };

        loop {
            if let Some(layout) = LAYOUT.find(&text[position.offset..]) {
                advance(&mut position, layout.as_str());
            }

            let rest = &text[position.offset..];
            if rest.is_empty() {
                break;
            }

            let (len, terminal, class) = match self.longest_match(rest) {
                Some(found) => found,
                None => {
                    return Err(ParseError::UnrecognizedToken {
                        text: rest
                            .split(char::is_whitespace)
                            .next()
                            .unwrap_or(rest)
                            .to_owned(),
                        position,
                    })
                }
            };

            let matched = &rest[..len];
            let value = match class {
                None => Value::Token(matched.to_owned()),
                Some(class) => {
                    class
                        .decode
                        .decode(matched)
                        .ok_or_else(|| ParseError::InvalidLiteral {
                            terminal: class.name.clone(),
                            text: matched.to_owned(),
                            position,
                        })?
                }
            };

            tokens.push(Token {
                terminal,
                text: matched.to_owned(),
                value,
                position,
            });
            advance(&mut position, matched);
        }

        Ok(tokens)
    }

    /// Length, terminal and class (`None` for literals) of the best match at the start of `rest`
    fn longest_match(&self, rest: &str) -> Option<(usize, TerminalIdx, Option<&ClassMatcher>)> {
        // Ranked by (length, literal over class, priority, earlier terminal)
        let literals = self
            .literals
            .iter()
            .filter(|(literal, _)| rest.starts_with(literal.as_str()))
            .map(|(literal, terminal)| ((literal.len(), true, 0, Reverse(*terminal)), None));

        let classes = self.classes.iter().filter_map(|class| {
            let m = class.regex.find(rest)?;
            Some((
                (m.end(), false, class.priority, Reverse(class.terminal)),
                Some(class),
            ))
        });

        literals
            .chain(classes)
            .filter(|(rank, _)| rank.0 != 0)
            .max_by_key(|(rank, _)| *rank)
            .map(|((len, _, _, Reverse(terminal)), class)| (len, terminal, class))
    }

    /// A token for `terminal` that did not come from scanning, e.g. from a hand-written token
    /// stream
    pub fn token(
        terminals: &TerminalArena,
        terminal: TerminalIdx,
        text: &str,
    ) -> Result<Token, ParseError> {
        let value = match terminals.get(terminal) {
            Terminal::Literal(_) => Value::Token(text.to_owned()),
            Terminal::Class(class) => {
                class
                    .decode
                    .decode(text)
                    .ok_or_else(|| ParseError::InvalidLiteral {
                        terminal: class.name.clone(),
                        text: text.to_owned(),
                        position: Position::default(),
                    })?
            }
        };
        Ok(Token {
            terminal,
            text: text.to_owned(),
            value,
            position: Position::default(),
        })
    }
}

fn advance(position: &mut Position, consumed: &str) {
    position.offset += consumed.len();
    for c in consumed.chars() {
        if c == '\n' {
            position.line += 1;
            position.column = 1;
        } else {
            position.column += 1;
        }
    }
}

#[cfg(test)]
fn lexer_for(terminals: &[Terminal]) -> (TerminalArena, Lexer) {
    let mut arena = TerminalArena::new();
    for terminal in terminals {
        arena.intern(terminal).unwrap();
    }
    let lexer = Lexer::new(&arena).unwrap();
    (arena, lexer)
}

#[test]
fn longest_match_and_ties() {
    let (arena, lexer) = lexer_for(&[
        Terminal::raw_identifier(),
        Terminal::literal("let"),
        Terminal::literal("="),
        Terminal::literal("=="),
        Terminal::number(),
        Terminal::boolean(),
    ]);

    let tokens = lexer.tokenize("let letter == 12 = true").unwrap();
    let names: Vec<String> = tokens
        .iter()
        .map(|token| arena.get(token.terminal).to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "\"let\"",
            "RawIdentifier",
            "\"==\"",
            "Number",
            "\"=\"",
            "Boolean"
        ]
    );
    assert_eq!(tokens[1].value, Value::Ident("letter".to_owned()));
    assert_eq!(tokens[3].value, Value::Int(12));
    assert_eq!(tokens[5].value, Value::Bool(true));
}

#[test]
fn layout_and_positions() {
    let (_, lexer) = lexer_for(&[Terminal::number(), Terminal::literal("+")]);
    let tokens = lexer.tokenize("1 % one\n  + 2").unwrap();
    assert_eq!(tokens.len(), 3);
    assert_eq!(
        tokens[1].position,
        Position {
            offset: 10,
            line: 2,
            column: 3
        }
    );
    assert!(lexer.tokenize("  % only a comment").unwrap().is_empty());
}

#[test]
fn scanning_errors() {
    let (_, lexer) = lexer_for(&[Terminal::number(), Terminal::literal("+")]);
    assert_eq!(
        lexer.tokenize("1 + x"),
        Err(ParseError::UnrecognizedToken {
            text: "x".to_owned(),
            position: Position {
                offset: 4,
                line: 1,
                column: 5
            }
        })
    );
    assert!(matches!(
        lexer.tokenize("99999999999999999999"),
        Err(ParseError::InvalidLiteral { .. })
    ));
}

#[test]
fn invalid_pattern() {
    let mut arena = TerminalArena::new();
    arena
        .intern(&Terminal::class("Broken", "[a-", Decode::Raw))
        .unwrap();
    assert!(matches!(
        Lexer::new(&arena),
        Err(AssemblyError::InvalidPattern { .. })
    ));
}
