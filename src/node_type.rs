//! Declaring node types and the productions that build them.
//!
//! A [`NodeType`] is a plain declaration: a name plus the abstract productions, upgrade edges and
//! scoping information attached to it through the builder methods below. Nothing is checked or
//! resolved here; [`Language`](crate::Language) assembly turns declarations into a grammar and
//! reports malformed ones.

use crate::ast::Value;
use crate::terminal::Terminal;

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assoc {
    #[default]
    None,
    Left,
    Right,
}

/// Priority and associativity of a production. Higher priorities bind tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prec {
    pub priority: i32,
    pub assoc: Assoc,
}

impl Prec {
    pub const DEFAULT_PRIORITY: i32 = 100;

    pub fn left(priority: i32) -> Prec {
        Prec {
            priority,
            assoc: Assoc::Left,
        }
    }

    pub fn right(priority: i32) -> Prec {
        Prec {
            priority,
            assoc: Assoc::Right,
        }
    }

    pub fn none(priority: i32) -> Prec {
        Prec {
            priority,
            assoc: Assoc::None,
        }
    }

    /// Loses against every other production in table conflicts
    pub(crate) fn lowest() -> Prec {
        Prec::none(i32::MIN)
    }
}

impl Default for Prec {
    fn default() -> Self {
        Prec::none(Prec::DEFAULT_PRIORITY)
    }
}

impl fmt::Display for Prec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.priority == i32::MIN {
            write!(f, "lowest")?;
        } else {
            write!(f, "priority {}", self.priority)?;
        }
        match self.assoc {
            Assoc::None => Ok(()),
            Assoc::Left => write!(f, ", left"),
            Assoc::Right => write!(f, ", right"),
        }
    }
}

/// A named child of a node, declared inside a production body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub target: Box<Sym>,
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, target: impl Into<Sym>) -> Field {
        Field {
            name: name.into(),
            target: Box::new(target.into()),
            default: None,
        }
    }

    pub fn with_default(self, default: Value) -> Field {
        Field {
            default: Some(default),
            ..self
        }
    }
}

/// An element of a production body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sym {
    /// The node type owning the production
    This,
    /// A node type, by name
    Node(String),
    Terminal(Terminal),
    Field(Field),
}

pub const THIS: Sym = Sym::This;

impl From<&NodeType> for Sym {
    fn from(ty: &NodeType) -> Sym {
        Sym::Node(ty.name().to_owned())
    }
}

impl From<&str> for Sym {
    fn from(literal: &str) -> Sym {
        Sym::Terminal(Terminal::literal(literal))
    }
}

impl From<Terminal> for Sym {
    fn from(terminal: Terminal) -> Sym {
        Sym::Terminal(terminal)
    }
}

impl From<&Terminal> for Sym {
    fn from(terminal: &Terminal) -> Sym {
        Sym::Terminal(terminal.clone())
    }
}

impl From<Field> for Sym {
    fn from(field: Field) -> Sym {
        Sym::Field(field)
    }
}

/// Builds a production body from heterogeneous elements:
/// `body![Field::new("a", &expr), "+", Field::new("b", &expr)]`.
#[macro_export]
macro_rules! body {
    ($($sym:expr),* $(,)?) => {
        vec![$($crate::Sym::from($sym)),*]
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Head {
    This,
    Type(String),
    /// Internal symbol named after the owning type, e.g. `ExprList@rest`
    Helper(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Element {
    Sym(Sym),
    Helper(&'static str),
}

/// What the construction action of a production does, before it is bound to a node shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Template {
    /// Build a node of the owning type from the fields in the body
    Construct,
    /// Return the child at the index verbatim
    PassThrough(usize),
    /// Return the child at the `THIS` placeholder
    Skip,
    EmptyList,
    /// `elem rest`
    ListHead,
    /// `divider elem rest`
    ListNext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AbstractProduction {
    pub(crate) head: Head,
    pub(crate) body: Vec<Element>,
    pub(crate) template: Template,
    pub(crate) prec: Prec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeTypeDecl {
    pub(crate) name: String,
    pub(crate) productions: Vec<AbstractProduction>,
    pub(crate) upgrades: Vec<String>,
    pub(crate) start: bool,
    pub(crate) variable: Option<String>,
    /// `(binder fields, scope fields)`
    pub(crate) bindings: Vec<(Vec<String>, Vec<String>)>,
}

/// A node type declaration. Cheap to clone; every builder method returns the updated
/// declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeType {
    decl: Arc<NodeTypeDecl>,
}

impl NodeType {
    pub fn new(name: impl Into<String>) -> NodeType {
        NodeType {
            decl: Arc::new(NodeTypeDecl {
                name: name.into(),
                productions: vec![],
                upgrades: vec![],
                start: false,
                variable: None,
                bindings: vec![],
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn is_start(&self) -> bool {
        self.decl.start
    }

    /// Names of the types this type stands in for
    pub fn upgraded_types(&self) -> &[String] {
        &self.decl.upgrades
    }

    pub(crate) fn decl(&self) -> &NodeTypeDecl {
        &self.decl
    }

    pub(crate) fn same_decl(&self, other: &NodeType) -> bool {
        Arc::ptr_eq(&self.decl, &other.decl) || self.decl == other.decl
    }

    fn update(mut self, f: impl FnOnce(&mut NodeTypeDecl)) -> NodeType {
        f(Arc::make_mut(&mut self.decl));
        self
    }

    fn add_production(self, production: AbstractProduction) -> NodeType {
        self.update(|decl| decl.productions.push(production))
    }

    /// This type is built from `body`. The `Field`s in the body become the fields of the type;
    /// every `generates` of one type has to declare the same field names.
    pub fn generates(self, body: Vec<Sym>) -> NodeType {
        self.generates_with(body, Prec::default())
    }

    pub fn generates_with(self, body: Vec<Sym>, prec: Prec) -> NodeType {
        self.add_production(AbstractProduction {
            head: Head::This,
            body: body.into_iter().map(Element::Sym).collect(),
            template: Template::Construct,
            prec,
        })
    }

    /// Wherever `target` is expected this type is accepted as well.
    pub fn replaces(self, target: &NodeType) -> NodeType {
        self.replaces_with(target, Prec::default())
    }

    pub fn replaces_with(self, target: &NodeType, prec: Prec) -> NodeType {
        self.add_production(AbstractProduction {
            head: Head::Type(target.name().to_owned()),
            body: vec![Element::Sym(Sym::This)],
            template: Template::PassThrough(0),
            prec,
        })
    }

    /// A transparent wrapper around this type, e.g. `skip(body!["(", THIS, ")"])`. The body has
    /// to mention `THIS` exactly once; the wrapped node is returned as is.
    pub fn skip(self, body: Vec<Sym>) -> NodeType {
        self.skip_with(body, Prec::default())
    }

    pub fn skip_with(self, body: Vec<Sym>, prec: Prec) -> NodeType {
        self.add_production(AbstractProduction {
            head: Head::This,
            body: body.into_iter().map(Element::Sym).collect(),
            template: Template::Skip,
            prec,
        })
    }

    /// Use this type in place of `source` everywhere, including in bodies that mention `source`.
    pub fn upgrades(self, source: &NodeType) -> NodeType {
        let source = source.name().to_owned();
        self.update(|decl| decl.upgrades.push(source))
    }

    /// Marks the type as the start of the language.
    pub fn start(self) -> NodeType {
        self.update(|decl| decl.start = true)
    }

    /// This type is a `divider`-separated sequence of `element`s, empty only when `empty` is set.
    /// The value of the type is the list of element values.
    pub fn make_list(self, element: impl Into<Sym>, divider: &str, empty: bool) -> NodeType {
        let element = element.into();
        let divider = Sym::from(divider);

        let mut ty = self;
        if empty {
            ty = ty.add_production(AbstractProduction {
                head: Head::This,
                body: vec![],
                template: Template::EmptyList,
                prec: Prec::default(),
            });
        }
        ty.add_production(AbstractProduction {
            head: Head::This,
            body: vec![Element::Sym(element.clone()), Element::Helper("rest")],
            template: Template::ListHead,
            prec: Prec::default(),
        })
        .add_production(AbstractProduction {
            head: Head::Helper("rest"),
            body: vec![
                Element::Sym(divider),
                Element::Sym(element),
                Element::Helper("rest"),
            ],
            template: Template::ListNext,
            prec: Prec::default(),
        })
        .add_production(AbstractProduction {
            head: Head::Helper("rest"),
            body: vec![],
            template: Template::EmptyList,
            prec: Prec::default(),
        })
    }

    /// Copies productions, scoping and the start marker of `base`. Productions building `base`
    /// build this type instead.
    pub fn inherits(self, base: &NodeType) -> NodeType {
        let base = base.decl.clone();
        self.update(|decl| {
            decl.productions.extend(base.productions.iter().cloned());
            if decl.variable.is_none() {
                decl.variable = base.variable.clone();
            }
            decl.start |= base.start;
            decl.bindings.extend(base.bindings.iter().cloned());
        })
    }

    /// Nodes of this type refer to the variable named by `field`.
    pub fn variable(self, field: &str) -> NodeType {
        let field = field.to_owned();
        self.update(|decl| decl.variable = Some(field))
    }

    /// Names in the `binders` fields are bound inside the `scope` fields.
    pub fn binds(self, binders: &[&str], scope: &[&str]) -> NodeType {
        let binders = binders.iter().map(|s| s.to_string()).collect();
        let scope = scope.iter().map(|s| s.to_string()).collect();
        self.update(|decl| decl.bindings.push((binders, scope)))
    }
}

#[test]
fn builder_is_persistent() {
    let expr = NodeType::new("Expr");
    let paren = expr.clone().skip(crate::body!["(", THIS, ")"]);
    assert!(expr.decl().productions.is_empty());
    assert_eq!(paren.decl().productions.len(), 1);
    assert!(!paren.same_decl(&expr));
    assert!(paren.same_decl(&paren.clone()));
}

#[test]
fn make_list_productions() {
    let item = NodeType::new("Item");
    let list = NodeType::new("Items").make_list(&item, ";", true);
    let templates: Vec<Template> = list
        .decl()
        .productions
        .iter()
        .map(|p| p.template)
        .collect();
    assert_eq!(
        templates,
        vec![
            Template::EmptyList,
            Template::ListHead,
            Template::ListNext,
            Template::EmptyList
        ]
    );
}
