//! Errors raised while assembling a language and while parsing with it

use std::fmt;

/// A location in the parsed text. `offset` is in bytes, `line` and `column` start from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Construction-time errors. A language that fails with one of these is never built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("can't upgrade `{upgraded}` both to `{first}` and `{second}`")]
    ConflictingUpgrade {
        upgraded: String,
        first: String,
        second: String,
    },

    #[error("upgrades of `{type_name}` form a cycle")]
    UpgradeCycle { type_name: String },

    #[error("there is no unique start type (found {found:?})")]
    NoUniqueStart { found: Vec<String> },

    #[error("two different node types are named `{name}`")]
    DuplicateType { name: String },

    #[error("`{referenced_by}` refers to `{name}`, which is not part of the language")]
    UnknownType { name: String, referenced_by: String },

    #[error("fields of `{type_name}` differ between productions: {expected:?} vs. {found:?}")]
    FieldMismatch {
        type_name: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("field `{field}` is declared twice in one production of `{type_name}`")]
    DuplicateField { type_name: String, field: String },

    #[error("`{type_name}` has no field named `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("skip production of `{type_name}` needs exactly one THIS, found {count}")]
    SkipPlaceholder { type_name: String, count: usize },

    #[error("terminal `{name}` is declared with two different definitions")]
    ConflictingTerminal { name: String },

    #[error("invalid pattern for terminal `{terminal}`: {message}")]
    InvalidPattern { terminal: String, message: String },

    #[error("non-terminal `{non_terminal}` is left recursive")]
    LeftRecursion { non_terminal: String },

    #[error("ambiguous grammar: `{non_terminal}` on {lookahead} can start with any of {productions:?}")]
    Ambiguous {
        non_terminal: String,
        lookahead: String,
        productions: Vec<String>,
    },
}

/// Errors of a single parse call. The language stays usable after any of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{position}: unexpected token {found} for `{non_terminal}`")]
    UnexpectedToken {
        non_terminal: String,
        found: String,
        position: Position,
    },

    #[error("{position}: expected {expected}, found {found}")]
    Mismatch {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("{position}: unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String, position: Position },

    #[error("{position}: unconsumed input starting at {found}")]
    UnconsumedInput { found: String, position: Position },

    #[error("{position}: unrecognized token {text:?}")]
    UnrecognizedToken { text: String, position: Position },

    #[error("{position}: invalid {terminal} literal {text:?}")]
    InvalidLiteral {
        terminal: String,
        text: String,
        position: Position,
    },

    #[error("unknown terminal `{name}`")]
    UnknownTerminal { name: String },
}

impl ParseError {
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::Mismatch { position, .. }
            | ParseError::UnexpectedEnd { position, .. }
            | ParseError::UnconsumedInput { position, .. }
            | ParseError::UnrecognizedToken { position, .. }
            | ParseError::InvalidLiteral { position, .. } => Some(*position),
            ParseError::UnknownTerminal { .. } => None,
        }
    }
}
