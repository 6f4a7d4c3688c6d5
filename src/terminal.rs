//! Terminal descriptors, the built-in terminal classes, and an arena for the terminals of a
//! grammar

use crate::ast::Value;
use crate::bitset::{FromBitIdx, ToBitIdx};
use crate::error::AssemblyError;

use std::fmt;

use fxhash::FxHashMap;
use once_cell::sync::Lazy;

/// How the matched text of a terminal class turns into a semantic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decode {
    /// Decimal integer
    Integer,
    /// `true` or `false`
    Boolean,
    /// Quoted text, the value is the text between the quotes
    Text,
    /// Bare identifier, the value is the name as written
    Identifier,
    /// Keep the matched text as a token value
    Raw,
}

impl Decode {
    /// Returns `None` when the text does not fit the decoder (e.g. integer overflow).
    pub fn decode(self, text: &str) -> Option<Value> {
        match self {
            Decode::Integer => text.parse::<i64>().ok().map(Value::Int),
            Decode::Boolean => match text {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            Decode::Text => {
                let inner = text.strip_prefix('"')?.strip_suffix('"')?;
                Some(Value::Text(inner.to_owned()))
            }
            Decode::Identifier => Some(Value::Ident(text.to_owned())),
            Decode::Raw => Some(Value::Token(text.to_owned())),
        }
    }
}

/// A named token class recognized by a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TerminalClass {
    pub name: String,
    pub pattern: String,
    pub decode: Decode,
    /// Breaks ties between classes matching the same length of text
    pub priority: i32,
}

/// A token kind: either an exact literal string or a class of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminal {
    Literal(String),
    Class(TerminalClass),
}

const DEFAULT_CLASS_PRIORITY: i32 = 10;

static NUMBER: Lazy<TerminalClass> = Lazy::new(|| TerminalClass {
    name: "Number".to_owned(),
    pattern: r"[0-9]+".to_owned(),
    decode: Decode::Integer,
    priority: DEFAULT_CLASS_PRIORITY,
});

static BOOLEAN: Lazy<TerminalClass> = Lazy::new(|| TerminalClass {
    name: "Boolean".to_owned(),
    pattern: r"true|false".to_owned(),
    decode: Decode::Boolean,
    priority: 100,
});

static STRING: Lazy<TerminalClass> = Lazy::new(|| TerminalClass {
    name: "String".to_owned(),
    pattern: r#""[^"]*""#.to_owned(),
    decode: Decode::Text,
    priority: DEFAULT_CLASS_PRIORITY,
});

static RAW_IDENTIFIER: Lazy<TerminalClass> = Lazy::new(|| TerminalClass {
    name: "RawIdentifier".to_owned(),
    pattern: r"[A-Za-z_][A-Za-z0-9_]*".to_owned(),
    decode: Decode::Identifier,
    priority: DEFAULT_CLASS_PRIORITY,
});

impl Terminal {
    pub fn literal(text: impl Into<String>) -> Terminal {
        Terminal::Literal(text.into())
    }

    pub fn class(name: impl Into<String>, pattern: impl Into<String>, decode: Decode) -> Terminal {
        Terminal::Class(TerminalClass {
            name: name.into(),
            pattern: pattern.into(),
            decode,
            priority: DEFAULT_CLASS_PRIORITY,
        })
    }

    /// Only meaningful for classes, literals always win over classes of the same length.
    pub fn with_priority(self, priority: i32) -> Terminal {
        match self {
            Terminal::Literal(_) => self,
            Terminal::Class(class) => Terminal::Class(TerminalClass { priority, ..class }),
        }
    }

    pub fn number() -> Terminal {
        Terminal::Class(NUMBER.clone())
    }

    pub fn boolean() -> Terminal {
        Terminal::Class(BOOLEAN.clone())
    }

    pub fn string() -> Terminal {
        Terminal::Class(STRING.clone())
    }

    pub fn raw_identifier() -> Terminal {
        Terminal::Class(RAW_IDENTIFIER.clone())
    }

    /// Literals are named by their text, classes by their class name.
    pub fn name(&self) -> &str {
        match self {
            Terminal::Literal(text) => text,
            Terminal::Class(class) => &class.name,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Literal(text) => write!(f, "{:?}", text),
            Terminal::Class(class) => write!(f, "{}", class.name),
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct TerminalIdx(usize);

impl fmt::Debug for TerminalIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#t{}", self.0)
    }
}

impl TerminalIdx {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl ToBitIdx for TerminalIdx {
    fn to_bit_idx(&self) -> usize {
        self.0
    }
}

impl FromBitIdx for TerminalIdx {
    fn from_bit_idx(idx: usize) -> Self {
        TerminalIdx(idx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TerminalKey {
    Literal(String),
    Class(String),
}

impl TerminalKey {
    fn of(terminal: &Terminal) -> TerminalKey {
        match terminal {
            Terminal::Literal(text) => TerminalKey::Literal(text.clone()),
            Terminal::Class(class) => TerminalKey::Class(class.name.clone()),
        }
    }
}

/// Interns the terminals used by a grammar. Literals are identified by their text, classes by
/// their name.
#[derive(Debug, Clone, Default)]
pub struct TerminalArena {
    /// Where we allocate terminals
    arena: Vec<Terminal>,

    /// Maps terminal identities to their indices in the arena
    map: FxHashMap<TerminalKey, TerminalIdx>,
}

impl TerminalArena {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the index of the terminal, allocating it on first use. A class with the same name
    /// as an already interned class but a different definition is an error.
    pub fn intern(&mut self, terminal: &Terminal) -> Result<TerminalIdx, AssemblyError> {
        let key = TerminalKey::of(terminal);
        if let Some(idx) = self.map.get(&key) {
            if &self.arena[idx.0] != terminal {
                return Err(AssemblyError::ConflictingTerminal {
                    name: terminal.name().to_owned(),
                });
            }
            return Ok(*idx);
        }
        let idx = TerminalIdx(self.arena.len());
        self.map.insert(key, idx);
        self.arena.push(terminal.clone());
        Ok(idx)
    }

    pub fn get(&self, idx: TerminalIdx) -> &Terminal {
        &self.arena[idx.0]
    }

    /// Looks a terminal up by class name first, then by literal text.
    pub fn find(&self, name: &str) -> Option<TerminalIdx> {
        self.map
            .get(&TerminalKey::Class(name.to_owned()))
            .or_else(|| self.map.get(&TerminalKey::Literal(name.to_owned())))
            .copied()
    }

    pub fn n_terminals(&self) -> usize {
        self.arena.len()
    }

    pub fn terminal_indices(&self) -> impl Iterator<Item = TerminalIdx> {
        (0..self.arena.len()).map(TerminalIdx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TerminalIdx, &Terminal)> {
        self.arena
            .iter()
            .enumerate()
            .map(|(idx, terminal)| (TerminalIdx(idx), terminal))
    }
}

#[test]
fn literals_are_interned_by_text() {
    let mut arena = TerminalArena::new();
    let plus_1 = arena.intern(&Terminal::literal("+")).unwrap();
    let number = arena.intern(&Terminal::number()).unwrap();
    let plus_2 = arena.intern(&Terminal::literal("+")).unwrap();
    assert_eq!(plus_1, plus_2);
    assert_ne!(plus_1, number);
    assert_eq!(arena.n_terminals(), 2);
    assert_eq!(arena.find("Number"), Some(number));
    assert_eq!(arena.find("+"), Some(plus_1));
}

#[test]
fn conflicting_class_definitions() {
    let mut arena = TerminalArena::new();
    arena.intern(&Terminal::number()).unwrap();
    let other = Terminal::class("Number", "[0-9a-f]+", Decode::Integer);
    assert_eq!(
        arena.intern(&other),
        Err(AssemblyError::ConflictingTerminal {
            name: "Number".to_owned()
        })
    );
}

#[test]
fn builtin_decoders() {
    assert_eq!(Decode::Integer.decode("42"), Some(Value::Int(42)));
    assert_eq!(Decode::Integer.decode("99999999999999999999"), None);
    assert_eq!(Decode::Boolean.decode("false"), Some(Value::Bool(false)));
    assert_eq!(
        Decode::Text.decode("\"hi there\""),
        Some(Value::Text("hi there".to_owned()))
    );
    assert_eq!(
        Decode::Identifier.decode("x_1"),
        Some(Value::Ident("x_1".to_owned()))
    );
}
