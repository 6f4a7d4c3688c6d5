//! Languages: assembling node types into a parser, extending them, and parsing with them.

use crate::action;
use crate::ast::Value;
use crate::config::{self, Config};
use crate::error::{AssemblyError, ParseError};
use crate::first::{generate_first_table, FirstSetDisplay, FirstTable};
use crate::follow::{generate_follow_table, FollowSetDisplay, FollowTable};
use crate::grammar::Grammar;
use crate::lexer::{Lexer, Token};
use crate::lower;
use crate::node_type::NodeType;
use crate::parse_table::{check_left_recursion, generate_parse_table, ParseTable, ParseTableDisplay};
use crate::parser::{self, ParseTree, ParseTreeDisplay};
use crate::precedence;

use std::fmt::Write;
use std::sync::Arc;

/// Everything derived from the node types of a language. Immutable once built.
#[derive(Debug)]
struct Compiled {
    grammar: Grammar,
    first: FirstTable,
    follow: FollowTable,
    table: ParseTable,
    lexer: Lexer,
}

/// A set of node types compiled into a parser. Parsing doesn't modify the language, so a
/// `Language` can be shared between threads; extending it with [`Language::add_types`] builds a
/// new one.
#[derive(Debug, Clone)]
pub struct Language {
    types: Vec<NodeType>,
    start: usize,
    config: Config,
    compiled: Arc<Compiled>,
}

impl Language {
    /// Assembles a language with the configuration from the environment.
    pub fn new(types: &[NodeType]) -> Result<Language, AssemblyError> {
        Language::with_config(types, Config::from_env())
    }

    pub fn with_config(types: &[NodeType], config: Config) -> Result<Language, AssemblyError> {
        let lower::Lowered {
            mut grammar,
            types,
            start,
        } = lower::lower(types)?;

        precedence::stratify(&mut grammar);

        let first = generate_first_table(&grammar);
        check_left_recursion(&grammar, &first)?;
        let follow = generate_follow_table(&grammar, &first);
        let table = generate_parse_table(&grammar, &first, &follow)?;
        let lexer = Lexer::new(&grammar.terminals)?;

        let compiled = Compiled {
            grammar,
            first,
            follow,
            table,
            lexer,
        };

        if let Some(target) = &config.dump_grammar {
            config::write_dump(&compiled.dump(), &start, target);
        }

        let start = types
            .iter()
            .position(|ty| ty.name() == start)
            .unwrap_or_default();

        Ok(Language {
            types,
            start,
            config,
            compiled: Arc::new(compiled),
        })
    }

    /// A new language with the types of this one plus `types`. This language is unchanged.
    pub fn add_types(&self, types: &[NodeType]) -> Result<Language, AssemblyError> {
        let mut all_types = self.types.clone();
        all_types.extend(types.iter().cloned());
        Language::with_config(&all_types, self.config.clone())
    }

    pub fn parse(&self, text: &str) -> Result<Value, ParseError> {
        let tokens = self.tokenize(text)?;
        self.parse_tokens(tokens)
    }

    pub fn parse_tree(&self, text: &str) -> Result<ParseTree, ParseError> {
        let tokens = self.tokenize(text)?;
        parser::parse(&self.compiled.grammar, &self.compiled.table, tokens)
    }

    /// Parses a token sequence, e.g. one produced by an external lexer with [`Language::token`].
    pub fn parse_tokens(&self, tokens: Vec<Token>) -> Result<Value, ParseError> {
        let tree = parser::parse(&self.compiled.grammar, &self.compiled.table, tokens)?;
        Ok(action::fold(&self.compiled.grammar, tree))
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, ParseError> {
        self.compiled.lexer.tokenize(text)
    }

    /// Builds a token of the terminal named `terminal`: a class name (`"Number"`) or the text of
    /// a literal (`"+"`).
    pub fn token(&self, terminal: &str, text: &str) -> Result<Token, ParseError> {
        let terminals = &self.compiled.grammar.terminals;
        let idx = terminals
            .find(terminal)
            .ok_or_else(|| ParseError::UnknownTerminal {
                name: terminal.to_owned(),
            })?;
        Lexer::token(terminals, idx, text)
    }

    /// The node types of the language, after upgrades
    pub fn types(&self) -> &[NodeType] {
        &self.types
    }

    pub fn start_type(&self) -> &NodeType {
        &self.types[self.start]
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grammar(&self) -> &Grammar {
        &self.compiled.grammar
    }

    pub fn first_table(&self) -> &FirstTable {
        &self.compiled.first
    }

    pub fn follow_table(&self) -> &FollowTable {
        &self.compiled.follow
    }

    pub fn parse_table(&self) -> &ParseTable {
        &self.compiled.table
    }

    pub fn display_tree<'a>(&'a self, tree: &'a ParseTree) -> ParseTreeDisplay<'a, 'a> {
        ParseTreeDisplay {
            tree,
            grammar: &self.compiled.grammar,
        }
    }

    /// The grammar, its first and follow sets and the parse table, as written by grammar dumps
    pub fn dump(&self) -> String {
        self.compiled.dump()
    }
}

impl Compiled {
    fn dump(&self) -> String {
        let grammar = &self.grammar;
        let mut out = String::new();

        let _ = writeln!(out, "GRAMMAR");
        let _ = write!(out, "{}", grammar);

        let _ = writeln!(out, "\nFIRST");
        for (nt_idx, nt) in grammar.non_terminal_indices() {
            let _ = writeln!(
                out,
                "{}: {}",
                nt.name(),
                FirstSetDisplay {
                    set: self.first.get_first(nt_idx),
                    grammar,
                }
            );
        }

        let _ = writeln!(out, "\nFOLLOW");
        for (nt_idx, nt) in grammar.non_terminal_indices() {
            let _ = writeln!(
                out,
                "{}: {}",
                nt.name(),
                FollowSetDisplay {
                    set: self.follow.get_follow(nt_idx),
                    grammar,
                }
            );
        }

        let _ = writeln!(out, "\nTABLE");
        let _ = write!(
            out,
            "{}",
            ParseTableDisplay {
                table: &self.table,
                grammar,
            }
        );

        out
    }
}

#[test]
fn precedence_and_associativity() {
    let lang = crate::test_grammars::arithmetic();
    assert_eq!(
        lang.parse("2 + 3 * 4").unwrap().to_string(),
        "Add(Num(2), Mul(Num(3), Num(4)))"
    );
    assert_eq!(
        lang.parse("10 - 3 - 2").unwrap().to_string(),
        "Sub(Sub(Num(10), Num(3)), Num(2))"
    );
    assert_eq!(
        lang.parse("-(1 + 2) * 3").unwrap().to_string(),
        "Mul(Neg(Add(Num(1), Num(2))), Num(3))"
    );
    assert_eq!(lang.parse("((42))").unwrap(), lang.parse("42").unwrap());

    let pow = crate::test_grammars::power();
    assert_eq!(
        pow.parse("2 ^ 3 ^ 4").unwrap().to_string(),
        "Pow(Num(2), Pow(Num(3), Num(4)))"
    );
}

#[test]
fn lists() {
    let lang = crate::test_grammars::number_list(false);
    assert_eq!(lang.parse("1;2;3").unwrap().to_string(), "[Num(1), Num(2), Num(3)]");
    assert!(lang.parse("").is_err());

    let lang = crate::test_grammars::number_list(true);
    assert_eq!(lang.parse("").unwrap(), Value::List(vec![]));
    assert_eq!(lang.parse("7").unwrap().to_string(), "[Num(7)]");
}

#[test]
fn external_tokens() {
    let lang = crate::test_grammars::arithmetic();
    let tokens = vec![
        lang.token("Number", "1").unwrap(),
        lang.token("+", "+").unwrap(),
        lang.token("Number", "2").unwrap(),
    ];
    assert_eq!(
        lang.parse_tokens(tokens).unwrap(),
        lang.parse("1 + 2").unwrap()
    );
    assert_eq!(
        lang.token("Identifier", "x"),
        Err(ParseError::UnknownTerminal {
            name: "Identifier".to_owned()
        })
    );
}

#[test]
fn language_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Language>();

    let lang = crate::test_grammars::arithmetic();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let lang = lang.clone();
            std::thread::spawn(move || lang.parse(&format!("{} * {}", i, i)).unwrap())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().to_string().starts_with("Mul("));
    }
}
