//! Option specs: the per-parameter CLI rules a command declares next to its handler.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// How many values a parameter takes on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arity {
    /// Exactly one value, delivered as a scalar.
    #[default]
    Single,
    /// Exactly `n` values. `Exactly(1)` is delivered unwrapped, as a scalar.
    Exactly(usize),
    /// Zero or one value (`?`).
    Optional,
    /// Any number of values (`*`).
    ZeroOrMore,
    /// At least one value (`+`).
    OneOrMore,
}

impl Arity {
    /// Whether the bound value is a list rather than a scalar.
    pub fn is_list(self) -> bool {
        match self {
            Arity::Single | Arity::Optional | Arity::Exactly(1) => false,
            Arity::Exactly(_) | Arity::ZeroOrMore | Arity::OneOrMore => true,
        }
    }

    /// Whether a positional with this arity may be left out.
    pub fn may_be_empty(self) -> bool {
        matches!(self, Arity::Optional | Arity::ZeroOrMore)
    }
}

/// The type values of a parameter are parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    #[default]
    Str,
    Int,
    Float,
    Path,
    /// A flag without value, bound to `true` when given.
    Switch,
}

/// A parsed (or default) argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<Value>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Path(p) => p.to_str(),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            Value::Str(s) => Some(Path::new(s)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// CLI rules for one parameter.
///
/// Without a [`flag`](OptionSpec::flag) the parameter becomes a positional argument;
/// with one it becomes an optional `-f/--name` argument.
#[derive(Debug, Clone, Default)]
pub struct OptionSpec {
    pub flag: Option<char>,
    pub kind: ValueKind,
    pub arity: Arity,
    pub default: Option<Value>,
    pub help: Option<String>,
    pub choices: Vec<String>,
    pub required: bool,
}

impl OptionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `-f/--name` switch bound to `true` when present and `false` otherwise.
    pub fn switch(flag: char) -> Self {
        Self {
            flag: Some(flag),
            kind: ValueKind::Switch,
            default: Some(Value::Bool(false)),
            ..Self::default()
        }
    }

    pub fn flag(mut self, flag: char) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn nargs(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Make a flagged option mandatory.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Option specs keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct OptionTable {
    options: HashMap<String, OptionSpec>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, name: impl Into<String>, spec: OptionSpec) -> Self {
        self.options.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.get(name)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, OptionSpec)> for OptionTable {
    fn from_iter<I: IntoIterator<Item = (S, OptionSpec)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
