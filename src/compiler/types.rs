//! Type definitions for the goat type system.
//!
//! This module defines the closed set of types produced by constraint-based
//! Hindley-Milner inference, plus the factory that hands out fresh type
//! variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An unresolved type placeholder.
///
/// Identities are short lowercase strings issued by [`TypeFactory`]
/// (`a`, `b`, ..., `z`, `aa`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeVariable(String);

impl TypeVariable {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.0)
    }
}

/// Core type representation.
///
/// Types compare structurally: same variant and, recursively, equal payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Type variable for inference (unresolved type).
    Variable(TypeVariable),
    /// Numeric type: `number`
    Number,
    /// String type: `string`
    String,
    /// Boolean type: `bool`
    Bool,
    /// Type of an empty program: `none`
    NoType,
    /// Function type. Parameters followed by the return type, so the
    /// list always holds at least one element.
    Function(Vec<Type>),
}

impl Type {
    /// Create a new function type from its parameters and return type.
    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        let mut types = params;
        types.push(ret);
        Type::Function(types)
    }

    pub fn var(id: impl Into<String>) -> Type {
        Type::Variable(TypeVariable::new(id))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Type::Variable(_))
    }

    /// Parameter types of a function type; empty for every other type.
    pub fn params(&self) -> &[Type] {
        match self {
            Type::Function(types) => match types.split_last() {
                Some((_, params)) => params,
                None => &[],
            },
            _ => &[],
        }
    }

    /// Return type of a function type.
    pub fn ret(&self) -> Option<&Type> {
        match self {
            Type::Function(types) => types.last(),
            _ => None,
        }
    }

    /// Check if this type contains any type variables.
    pub fn has_type_vars(&self) -> bool {
        match self {
            Type::Number | Type::String | Type::Bool | Type::NoType => false,
            Type::Variable(_) => true,
            Type::Function(types) => types.iter().any(Type::has_type_vars),
        }
    }

    /// Whether `var` occurs anywhere inside this type.
    pub fn contains(&self, var: &TypeVariable) -> bool {
        match self {
            Type::Number | Type::String | Type::Bool | Type::NoType => false,
            Type::Variable(v) => v == var,
            Type::Function(types) => types.iter().any(|t| t.contains(var)),
        }
    }

    /// Collect all free type variables in this type.
    pub fn free_type_vars(&self) -> BTreeSet<TypeVariable> {
        let mut vars = BTreeSet::new();
        self.collect_type_vars(&mut vars);
        vars
    }

    fn collect_type_vars(&self, vars: &mut BTreeSet<TypeVariable>) {
        match self {
            Type::Number | Type::String | Type::Bool | Type::NoType => {}
            Type::Variable(v) => {
                vars.insert(v.clone());
            }
            Type::Function(types) => {
                for t in types {
                    t.collect_type_vars(vars);
                }
            }
        }
    }
}

impl From<TypeVariable> for Type {
    fn from(var: TypeVariable) -> Self {
        Type::Variable(var)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Variable(v) => write!(f, "{}", v),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::NoType => write!(f, "none"),
            Type::Function(_) => {
                write!(f, "(")?;
                for (i, param) in self.params().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ")")?;
                match self.ret() {
                    Some(ret) => write!(f, " -> {}", ret),
                    None => Ok(()),
                }
            }
        }
    }
}

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Issues fresh type variables.
///
/// Ids are the counter rendered in bijective base 26, least significant
/// digit first, so `0 -> a`, `25 -> z`, `26 -> aa`, `27 -> ba`. The counter
/// only moves forward; one factory never reissues an id.
#[derive(Debug, Default)]
pub struct TypeFactory {
    next: u64,
}

impl TypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh type variable.
    pub fn next(&mut self) -> TypeVariable {
        let id = render_id(self.next);
        self.next += 1;
        TypeVariable(id)
    }

    /// Generate a fresh type variable wrapped as a [`Type`].
    pub fn fresh(&mut self) -> Type {
        Type::Variable(self.next())
    }

    /// Number of variables issued so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

fn render_id(counter: u64) -> String {
    let base = ALPHABET.len() as u64;
    let mut current = counter + 1;
    let mut id = String::new();
    while current > 0 {
        current -= 1;
        id.push(ALPHABET[(current % base) as usize] as char);
        current /= base;
    }
    id
}
