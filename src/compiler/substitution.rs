//! Substitutions: variable-to-type replacement rules produced by solving.

use crate::compiler::types::{Type, TypeVariable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single replacement rule, or the sentinel produced by a failed
/// unification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Substitution {
    Replace { source: TypeVariable, target: Type },
    Error,
}

impl Substitution {
    pub fn new(source: TypeVariable, target: Type) -> Self {
        Substitution::Replace { source, target }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Substitution::Error)
    }

    /// The variable this rule replaces.
    pub fn source(&self) -> Option<&TypeVariable> {
        match self {
            Substitution::Replace { source, .. } => Some(source),
            Substitution::Error => None,
        }
    }

    /// Rewrite `ty`, replacing every occurrence of the source variable.
    /// The error sentinel leaves types untouched.
    pub fn apply(&self, ty: &Type) -> Type {
        match self {
            Substitution::Error => ty.clone(),
            Substitution::Replace { source, target } => replace(ty, source, target),
        }
    }
}

fn replace(ty: &Type, source: &TypeVariable, target: &Type) -> Type {
    match ty {
        Type::Variable(v) if v == source => target.clone(),
        Type::Function(types) => {
            Type::Function(types.iter().map(|t| replace(t, source, target)).collect())
        }
        _ => ty.clone(),
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Substitution::Replace { source, target } => write!(f, "{} := {}", source, target),
            Substitution::Error => write!(f, "error"),
        }
    }
}

/// A set of substitutions acting as one simultaneous mapping.
///
/// A set that contains [`Substitution::Error`] contains nothing else: one
/// failure poisons the whole result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstitutionSet {
    entries: BTreeSet<Substitution>,
}

impl SubstitutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The poisoned set `{Error}`.
    pub fn error() -> Self {
        let mut entries = BTreeSet::new();
        entries.insert(Substitution::Error);
        Self { entries }
    }

    pub fn singleton(source: TypeVariable, target: Type) -> Self {
        let mut set = Self::new();
        set.insert(Substitution::new(source, target));
        set
    }

    pub fn is_error(&self) -> bool {
        self.entries.contains(&Substitution::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Substitution> {
        self.entries.iter()
    }

    pub fn contains(&self, substitution: &Substitution) -> bool {
        self.entries.contains(substitution)
    }

    /// Target bound to `var`, if any.
    pub fn target_of(&self, var: &TypeVariable) -> Option<&Type> {
        // `Variable("")` is the least `Type`, so the range starts at the
        // first entry for `var`.
        let lowest = Substitution::new(var.clone(), Type::Variable(TypeVariable::new("")));
        match self.entries.range(lowest..).next() {
            Some(Substitution::Replace { source, target }) if source == var => Some(target),
            _ => None,
        }
    }

    /// Add one substitution. Inserting `Error` collapses the set to `{Error}`,
    /// and a poisoned set ignores further insertions.
    pub fn insert(&mut self, substitution: Substitution) {
        if self.is_error() {
            return;
        }
        if substitution.is_error() {
            *self = Self::error();
            return;
        }
        self.entries.insert(substitution);
    }

    /// Add `substitution` after rewriting every existing target with it, so
    /// that no source variable appears in any target afterwards.
    pub fn compose(&mut self, substitution: Substitution) {
        let Some(bound) = substitution.source() else {
            self.insert(substitution);
            return;
        };
        if self.is_error() {
            return;
        }
        let rewrites = self.entries.iter().any(|existing| match existing {
            Substitution::Replace { target, .. } => target.contains(bound),
            Substitution::Error => false,
        });
        if !rewrites {
            self.entries.insert(substitution);
            return;
        }
        self.entries = std::mem::take(&mut self.entries)
            .into_iter()
            .map(|existing| match existing {
                Substitution::Replace { source, target } => Substitution::Replace {
                    target: substitution.apply(&target),
                    source,
                },
                Substitution::Error => Substitution::Error,
            })
            .collect();
        self.entries.insert(substitution);
    }

    /// Resolve a type through the whole set.
    ///
    /// Every bound variable is replaced by its target, and the target is
    /// resolved in turn, so the result does not depend on iteration order.
    /// The depth limit only matters for cyclic sets, which
    /// [`compose`](Self::compose) never builds.
    pub fn apply(&self, ty: &Type) -> Type {
        self.resolve(ty, self.entries.len())
    }

    fn resolve(&self, ty: &Type, depth: usize) -> Type {
        match ty {
            Type::Variable(var) => match self.target_of(var) {
                Some(target) if depth > 0 => self.resolve(target, depth - 1),
                _ => ty.clone(),
            },
            Type::Function(types) => {
                Type::Function(types.iter().map(|t| self.resolve(t, depth)).collect())
            }
            _ => ty.clone(),
        }
    }
}

impl FromIterator<Substitution> for SubstitutionSet {
    fn from_iter<I: IntoIterator<Item = Substitution>>(iter: I) -> Self {
        let mut set = Self::new();
        for substitution in iter {
            set.insert(substitution);
        }
        set
    }
}

impl IntoIterator for SubstitutionSet {
    type Item = Substitution;
    type IntoIter = std::collections::btree_set::IntoIter<Substitution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a SubstitutionSet {
    type Item = &'a Substitution;
    type IntoIter = std::collections::btree_set::Iter<'a, Substitution>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for SubstitutionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, substitution) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", substitution)?;
        }
        write!(f, "}}")
    }
}
