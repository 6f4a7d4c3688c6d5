//! Compose small languages from node type declarations.
//!
//! A node type declares how it is written (`generates`), where else it may appear (`replaces`),
//! transparent wrappers (`skip`), separated lists (`make_list`) and which type it stands in for
//! (`upgrades`). A [`Language`] lowers a set of node types to a grammar, stratifies operator
//! productions by priority, builds an LL(1) table and parses text into typed syntax trees.
//!
//! ```
//! use langkit::{body, Field, Language, NodeType, Prec, Terminal};
//!
//! let expr = NodeType::new("Expr").start();
//! let num = NodeType::new("Num")
//!     .generates(body![Field::new("value", Terminal::number())])
//!     .replaces(&expr);
//! let add = NodeType::new("Add")
//!     .generates_with(
//!         body![Field::new("left", &expr), "+", Field::new("right", &expr)],
//!         Prec::left(10),
//!     )
//!     .replaces(&expr);
//!
//! let lang = Language::new(&[expr, num, add]).unwrap();
//! let ast = lang.parse("1 + 2 + 3").unwrap();
//! assert_eq!(ast.to_string(), "Add(Add(Num(1), Num(2)), Num(3))");
//! ```

#[macro_use]
mod maplit;

mod action;
mod ast;
mod bitset;
mod config;
mod error;
pub mod first;
pub mod follow;
pub mod grammar;
mod language;
mod lexer;
mod lower;
mod node_type;
pub mod parse_table;
mod parser;
mod precedence;
mod registry;
mod terminal;

#[cfg(test)]
mod test_grammars;

pub use ast::{FieldInfo, FreeVars, Node, NodeShape, Value};
pub use config::{Config, DUMP_GRAMMAR_VAR};
pub use error::{AssemblyError, ParseError, Position};
pub use language::Language;
pub use lexer::Token;
pub use node_type::{Assoc, Field, NodeType, Prec, Sym, THIS};
pub use parser::{ParseChild, ParseTree, ParseTreeDisplay};
pub use terminal::{Decode, Terminal, TerminalClass, TerminalIdx};
