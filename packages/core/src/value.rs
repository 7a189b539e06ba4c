//! The GXL value algebra.
//!
//! Inside a document, values are elements (`<int>`, `<bag>`, ...). This
//! module provides the owned, detached form [`Value`], which is what typed
//! getters return, what the typed constructors accept, and where value
//! equality lives:
//!
//! | Kind | Equality |
//! |------|----------|
//! | atomic, locator | same kind and same typed payload |
//! | `seq`, `tup` | same length, pairwise equal in order |
//! | `set` | identical membership, order ignored |
//! | `bag` | identical multiplicity of every member, order ignored |

use serde::Serialize;

use crate::error::{GxlError, Result};
use crate::types::ElementKind;

/// A detached value tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    Locator(String),
    Bag(Vec<Value>),
    Set(Vec<Value>),
    Seq(Vec<Value>),
    Tup(Vec<Value>),
}

impl Value {
    /// Parse the textual payload of an atomic kind.
    ///
    /// `bool`, `int`, and `float` parse the trimmed text; `string` and `enum`
    /// keep it verbatim.
    pub fn parse_atomic(kind: ElementKind, text: &str) -> Result<Value> {
        let invalid = || GxlError::InvalidValue {
            kind,
            text: text.to_string(),
        };
        match kind {
            ElementKind::Bool => match text.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            ElementKind::Int => text.trim().parse().map(Value::Int).map_err(|_| invalid()),
            ElementKind::Float => text.trim().parse().map(Value::Float).map_err(|_| invalid()),
            ElementKind::String => Ok(Value::String(text.to_string())),
            ElementKind::Enum => Ok(Value::Enum(text.to_string())),
            _ => Err(GxlError::WrongKind {
                expected: "an atomic value",
                found: kind,
            }),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Value::Bool(_) => ElementKind::Bool,
            Value::Int(_) => ElementKind::Int,
            Value::Float(_) => ElementKind::Float,
            Value::String(_) => ElementKind::String,
            Value::Enum(_) => ElementKind::Enum,
            Value::Locator(_) => ElementKind::Locator,
            Value::Bag(_) => ElementKind::Bag,
            Value::Set(_) => ElementKind::Set,
            Value::Seq(_) => ElementKind::Seq,
            Value::Tup(_) => ElementKind::Tup,
        }
    }

    /// The textual payload of an atomic value.
    pub fn text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(x) => Some(x.to_string()),
            Value::String(s) | Value::Enum(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
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
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Members of a composite, in stored order.
    pub fn members(&self) -> &[Value] {
        match self {
            Value::Bag(v) | Value::Set(v) | Value::Seq(v) | Value::Tup(v) => v,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.members().get(index)
    }

    /// How many members of this composite equal `member`.
    pub fn cardinal(&self, member: &Value) -> usize {
        self.members().iter().filter(|m| *m == member).count()
    }

    pub fn contains(&self, member: &Value) -> bool {
        self.cardinal(member) > 0
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Locator(a), Value::Locator(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) | (Value::Tup(a), Value::Tup(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
            }
            (Value::Bag(_), Value::Bag(_)) => {
                self.len() == other.len()
                    && self
                        .members()
                        .iter()
                        .all(|x| self.cardinal(x) == other.cardinal(x))
            }
            _ => false,
        }
    }
}

// --- tests -------------------------------------------------------------------
