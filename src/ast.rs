//! Typed syntax trees built by construction actions.
//!
//! Every node carries the shape of its node type: the type name, the declared fields and the
//! scoping information used to enumerate free variables. Shapes are shared between all nodes of
//! a type and are created once when a language is assembled.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Text(String),
    Ident(String),
    /// Matched text of a literal terminal
    Token(String),
    List(Vec<Value>),
    Node(Box<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Scoping {
    /// Field holding the name of the variable this node refers to
    pub(crate) variable: Option<usize>,
    pub(crate) bindings: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Binding {
    /// Fields holding the bound names
    pub(crate) binders: Vec<usize>,
    /// Fields in which the names are bound
    pub(crate) scope: Vec<usize>,
}

impl Scoping {
    fn is_binder(&self, field_idx: usize) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.binders.contains(&field_idx))
    }
}

#[derive(Debug)]
pub struct NodeShape {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) scoping: Scoping,
}

impl NodeShape {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub(crate) fn field_idx(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

#[derive(Clone)]
pub struct Node {
    shape: Arc<NodeShape>,
    // Indexed like `shape.fields`
    values: Vec<Value>,
}

impl Node {
    pub(crate) fn new(shape: Arc<NodeShape>, values: Vec<Value>) -> Node {
        debug_assert_eq!(shape.fields.len(), values.len());
        Node { shape, values }
    }

    /// Name of the node type that built this node
    pub fn kind(&self) -> &str {
        &self.shape.name
    }

    pub fn shape(&self) -> &NodeShape {
        &self.shape
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.shape.field_idx(name).map(|idx| &self.values[idx])
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.shape
            .fields
            .iter()
            .map(|field| field.name.as_str())
            .zip(self.values.iter())
    }

    /// Names of variables referenced in this node but not bound by it or by its children. Calling
    /// this again (or cloning the iterator) starts a new enumeration.
    pub fn free_vars(&self) -> FreeVars<'_> {
        FreeVars {
            stack: vec![(Item::Node(self), None)],
        }
    }
}

// Structural: nodes built by different languages compare equal when they have the same type name
// and field values.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.shape.name == other.shape.name
            && self.shape.fields.len() == other.shape.fields.len()
            && self
                .shape
                .fields
                .iter()
                .zip(other.shape.fields.iter())
                .all(|(f1, f2)| f1.name == f2.name)
            && self.values == other.values
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(&self.shape.name);
        for (name, value) in self.fields() {
            s.field(name, value);
        }
        s.finish()
    }
}

impl Value {
    pub fn node(node: Node) -> Value {
        Value::Node(Box::new(node))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text of a text, identifier or token value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Ident(s) | Value::Token(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn free_vars(&self) -> FreeVars<'_> {
        FreeVars {
            stack: vec![(Item::Value(self), None)],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) | Value::Token(s) => write!(f, "{:?}", s),
            Value::Ident(s) => write!(f, "{}", s),
            Value::List(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Node(node) => write!(f, "{}", node),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shape.name)?;
        if self.values.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (idx, value) in self.values.iter().enumerate() {
            if idx != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

type Scope<'a> = Option<Rc<Bound<'a>>>;

struct Bound<'a> {
    names: Vec<&'a str>,
    parent: Scope<'a>,
}

fn is_bound(mut scope: &Scope<'_>, name: &str) -> bool {
    while let Some(bound) = scope {
        if bound.names.contains(&name) {
            return true;
        }
        scope = &bound.parent;
    }
    false
}

fn collect_names<'a>(value: &'a Value, names: &mut Vec<&'a str>) {
    match value {
        Value::List(values) => {
            for value in values {
                collect_names(value, names);
            }
        }
        _ => {
            if let Some(name) = value.as_str() {
                names.push(name);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Item<'a> {
    Value(&'a Value),
    Node(&'a Node),
}

/// Lazy enumeration of free variable names, see [`Node::free_vars`]. A name is yielded once per
/// free occurrence.
#[derive(Clone)]
pub struct FreeVars<'a> {
    stack: Vec<(Item<'a>, Scope<'a>)>,
}

impl<'a> FreeVars<'a> {
    /// Schedules the children of `node` and returns the variable it refers to, if that variable is
    /// free.
    fn expand_node(&mut self, node: &'a Node, scope: Scope<'a>) -> Option<&'a str> {
        let scoping = &node.shape.scoping;

        for (field_idx, value) in node.values.iter().enumerate().rev() {
            if scoping.variable == Some(field_idx) || scoping.is_binder(field_idx) {
                continue;
            }

            let mut names: Vec<&'a str> = vec![];
            for binding in &scoping.bindings {
                if binding.scope.contains(&field_idx) {
                    for binder in &binding.binders {
                        collect_names(&node.values[*binder], &mut names);
                    }
                }
            }

            let field_scope = if names.is_empty() {
                scope.clone()
            } else {
                Some(Rc::new(Bound {
                    names,
                    parent: scope.clone(),
                }))
            };

            self.stack.push((Item::Value(value), field_scope));
        }

        let variable = node.values[scoping.variable?].as_str()?;
        if is_bound(&scope, variable) {
            None
        } else {
            Some(variable)
        }
    }
}

impl<'a> Iterator for FreeVars<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while let Some((item, scope)) = self.stack.pop() {
            match item {
                Item::Node(node) => {
                    if let Some(name) = self.expand_node(node, scope) {
                        return Some(name);
                    }
                }
                Item::Value(Value::Node(node)) => {
                    if let Some(name) = self.expand_node(node, scope) {
                        return Some(name);
                    }
                }
                Item::Value(Value::List(values)) => {
                    for value in values.iter().rev() {
                        self.stack.push((Item::Value(value), scope.clone()));
                    }
                }
                Item::Value(_) => {}
            }
        }
        None
    }
}
