//! Typing constraints emitted by the generator and consumed by the solver.

use crate::compiler::substitution::Substitution;
use crate::compiler::types::{Type, TypeVariable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How the two sides of a constraint relate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    Equality,
    /// The left side is an instance of the right side once the right side
    /// is generalized over everything except `monomorphic`.
    ImplicitInstance { monomorphic: BTreeSet<TypeVariable> },
    /// Like `ImplicitInstance`, but waits until no other pending constraint
    /// mentions the variables it would generalize.
    ExplicitInstance { monomorphic: BTreeSet<TypeVariable> },
}

/// A required relationship between two types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub left: Type,
    pub right: Type,
    pub relation: Relation,
}

impl Constraint {
    pub fn equality(left: Type, right: Type) -> Self {
        Self {
            left,
            right,
            relation: Relation::Equality,
        }
    }

    pub fn implicit_instance(left: Type, right: Type, monomorphic: BTreeSet<TypeVariable>) -> Self {
        Self {
            left,
            right,
            relation: Relation::ImplicitInstance { monomorphic },
        }
    }

    pub fn explicit_instance(left: Type, right: Type, monomorphic: BTreeSet<TypeVariable>) -> Self {
        Self {
            left,
            right,
            relation: Relation::ExplicitInstance { monomorphic },
        }
    }

    /// Variables that are frozen for this constraint; empty for equalities.
    pub fn monomorphic(&self) -> Option<&BTreeSet<TypeVariable>> {
        match &self.relation {
            Relation::Equality => None,
            Relation::ImplicitInstance { monomorphic }
            | Relation::ExplicitInstance { monomorphic } => Some(monomorphic),
        }
    }

    /// Free variables on either side.
    pub fn active_vars(&self) -> BTreeSet<TypeVariable> {
        let mut vars = self.left.free_type_vars();
        vars.extend(self.right.free_type_vars());
        vars
    }

    /// Whether `var` appears on either side or in the monomorphic set.
    pub fn mentions(&self, var: &TypeVariable) -> bool {
        self.left.contains(var)
            || self.right.contains(var)
            || self.monomorphic().is_some_and(|m| m.contains(var))
    }

    /// Free variables of the right side that are not frozen. These are the
    /// variables an instance constraint would generalize.
    pub fn generalizable_vars(&self) -> BTreeSet<TypeVariable> {
        let free = self.right.free_type_vars();
        match self.monomorphic() {
            Some(monomorphic) => free.difference(monomorphic).cloned().collect(),
            None => free,
        }
    }

    /// Rewrite both sides with `substitution`. A frozen variable that gets
    /// replaced is swapped for the free variables of its replacement.
    pub fn apply(&self, substitution: &Substitution) -> Constraint {
        let relation = match &self.relation {
            Relation::Equality => Relation::Equality,
            Relation::ImplicitInstance { monomorphic } => Relation::ImplicitInstance {
                monomorphic: apply_to_vars(monomorphic, substitution),
            },
            Relation::ExplicitInstance { monomorphic } => Relation::ExplicitInstance {
                monomorphic: apply_to_vars(monomorphic, substitution),
            },
        };
        Constraint {
            left: substitution.apply(&self.left),
            right: substitution.apply(&self.right),
            relation,
        }
    }

    /// The same pair of types under a different relation.
    pub fn with_relation(self, relation: Relation) -> Constraint {
        Constraint { relation, ..self }
    }
}

fn apply_to_vars(
    vars: &BTreeSet<TypeVariable>,
    substitution: &Substitution,
) -> BTreeSet<TypeVariable> {
    vars.iter()
        .flat_map(|v| substitution.apply(&Type::Variable(v.clone())).free_type_vars())
        .collect()
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relation {
            Relation::Equality => write!(f, "{} == {}", self.left, self.right),
            Relation::ImplicitInstance { monomorphic } => {
                write!(f, "{} <=[", self.left)?;
                write_vars(f, monomorphic)?;
                write!(f, "] {}", self.right)
            }
            Relation::ExplicitInstance { monomorphic } => {
                write!(f, "{} <[", self.left)?;
                write_vars(f, monomorphic)?;
                write!(f, "] {}", self.right)
            }
        }
    }
}

fn write_vars(f: &mut fmt::Formatter<'_>, vars: &BTreeSet<TypeVariable>) -> fmt::Result {
    for (i, v) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

/// An unordered collection of constraints.
///
/// Iteration is sorted, which keeps dumps and solver traces reproducible;
/// the solver's outcome does not depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintSet {
    constraints: BTreeSet<Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, constraint: Constraint) {
        self.constraints.insert(constraint);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn contains(&self, constraint: &Constraint) -> bool {
        self.constraints.contains(constraint)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ConstraintSet {
    type Item = Constraint;
    type IntoIter = std::collections::btree_set::IntoIter<Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::collections::btree_set::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen(ids: &[&str]) -> BTreeSet<TypeVariable> {
        ids.iter().map(|id| TypeVariable::new(*id)).collect()
    }

    #[test]
    fn test_apply_rewrites_both_sides() {
        let c = Constraint::equality(Type::var("a"), Type::function(vec![Type::var("a")], Type::var("b")));
        let s = Substitution::new(TypeVariable::new("a"), Type::Number);
        let applied = c.apply(&s);
        assert_eq!(applied.left, Type::Number);
        assert_eq!(applied.right, Type::function(vec![Type::Number], Type::var("b")));
        assert_eq!(applied.relation, Relation::Equality);
    }

    #[test]
    fn test_apply_updates_monomorphic_set() {
        let c = Constraint::implicit_instance(Type::var("x"), Type::var("a"), frozen(&["a"]));
        let s = Substitution::new(
            TypeVariable::new("a"),
            Type::function(vec![Type::var("c")], Type::Number),
        );
        let applied = c.apply(&s);
        assert_eq!(applied.monomorphic(), Some(&frozen(&["c"])));

        let concrete = Substitution::new(TypeVariable::new("a"), Type::Number);
        assert_eq!(c.apply(&concrete).monomorphic(), Some(&frozen(&[])));
    }

    #[test]
    fn test_mentions() {
        let c = Constraint::implicit_instance(Type::var("x"), Type::var("a"), frozen(&["m"]));
        assert!(c.mentions(&TypeVariable::new("x")));
        assert!(c.mentions(&TypeVariable::new("a")));
        assert!(c.mentions(&TypeVariable::new("m")));
        assert!(!c.mentions(&TypeVariable::new("b")));
    }

    #[test]
    fn test_generalizable_vars_skip_frozen() {
        let c = Constraint::explicit_instance(
            Type::var("x"),
            Type::function(vec![Type::var("a")], Type::var("b")),
            frozen(&["a"]),
        );
        assert_eq!(c.generalizable_vars(), frozen(&["b"]));
        assert_eq!(c.active_vars(), frozen(&["a", "b", "x"]));
    }

    #[test]
    fn test_set_deduplicates() {
        let mut set = ConstraintSet::new();
        set.insert(Constraint::equality(Type::var("a"), Type::Number));
        set.insert(Constraint::equality(Type::var("a"), Type::Number));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_display() {
        let eq = Constraint::equality(Type::var("a"), Type::Number);
        assert_eq!(eq.to_string(), "'a == number");

        let implicit = Constraint::implicit_instance(Type::var("b"), Type::var("c"), frozen(&["d"]));
        assert_eq!(implicit.to_string(), "'b <=['d] 'c");

        let explicit = Constraint::explicit_instance(Type::var("b"), Type::Number, frozen(&[]));
        assert_eq!(explicit.to_string(), "'b <[] number");
    }
}
