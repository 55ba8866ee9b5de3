//! Robinson unification over [`Type`].

use crate::compiler::substitution::SubstitutionSet;
use crate::compiler::types::Type;

/// Unify two types, returning the substitutions that make them equal.
///
/// Rules, in order:
/// 1. identical types need nothing;
/// 2. a variable on the right is swapped to the left;
/// 3. two function types of equal length unify element by element;
/// 4. a variable that does not occur in the other side is replaced by it;
/// 5. anything else fails with `{Error}`.
///
/// Element pairs of a function type are unified left to right, and each pair
/// sees the substitutions found for the pairs before it.
pub fn unify(left: &Type, right: &Type) -> SubstitutionSet {
    if left == right {
        return SubstitutionSet::new();
    }

    match (left, right) {
        (l, Type::Variable(_)) if !l.is_variable() => unify(right, left),

        (Type::Function(ls), Type::Function(rs)) => {
            if ls.len() != rs.len() {
                tracing::debug!(%left, %right, "arity mismatch");
                return SubstitutionSet::error();
            }
            decompose(ls, rs)
        }

        (Type::Variable(var), other) => {
            if other.contains(var) {
                tracing::debug!(%var, %other, "occurs check failed");
                SubstitutionSet::error()
            } else {
                SubstitutionSet::singleton(var.clone(), other.clone())
            }
        }

        _ => {
            tracing::debug!(%left, %right, "type mismatch");
            SubstitutionSet::error()
        }
    }
}

fn decompose(lefts: &[Type], rights: &[Type]) -> SubstitutionSet {
    let mut result = SubstitutionSet::new();
    for (l, r) in lefts.iter().zip(rights) {
        let found = unify(&result.apply(l), &result.apply(r));
        if found.is_error() {
            return found;
        }
        for substitution in found {
            result.compose(substitution);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::substitution::Substitution;
    use crate::compiler::types::TypeVariable;

    fn var(id: &str) -> TypeVariable {
        TypeVariable::new(id)
    }

    #[test]
    fn test_unify_identical_base_types() {
        for ty in [Type::Number, Type::String, Type::Bool, Type::NoType] {
            assert_eq!(unify(&ty, &ty), SubstitutionSet::new());
        }
    }

    #[test]
    fn test_unify_identical_functions() {
        let ty = Type::function(vec![Type::Number, Type::var("a")], Type::String);
        assert_eq!(unify(&ty, &ty), SubstitutionSet::new());
    }

    #[test]
    fn test_unify_same_var() {
        assert_eq!(unify(&Type::var("a"), &Type::var("a")), SubstitutionSet::new());
    }

    #[test]
    fn test_unify_var_with_concrete() {
        let result = unify(&Type::var("a"), &Type::Number);
        assert_eq!(result, SubstitutionSet::singleton(var("a"), Type::Number));
    }

    #[test]
    fn test_unify_concrete_with_var() {
        let result = unify(&Type::Number, &Type::var("a"));
        assert_eq!(result, SubstitutionSet::singleton(var("a"), Type::Number));
    }

    #[test]
    fn test_unify_two_vars() {
        let result = unify(&Type::var("a"), &Type::var("b"));
        assert_eq!(result, SubstitutionSet::singleton(var("a"), Type::var("b")));
    }

    #[test]
    fn test_unify_mismatch_concrete() {
        assert!(unify(&Type::Number, &Type::String).is_error());
        assert!(unify(&Type::Bool, &Type::NoType).is_error());
    }

    #[test]
    fn test_unify_mismatch_shape() {
        let func = Type::function(vec![Type::Number], Type::Number);
        assert!(unify(&Type::Number, &func).is_error());
        assert!(unify(&func, &Type::Number).is_error());
    }

    #[test]
    fn test_unify_arity_mismatch() {
        let two = Type::function(vec![Type::var("a")], Type::var("b"));
        let three = Type::function(vec![Type::var("a"), Type::var("b")], Type::var("c"));
        assert_eq!(unify(&two, &three), SubstitutionSet::error());

        let concrete_two = Type::function(vec![Type::Number], Type::Number);
        let concrete_three = Type::function(vec![Type::Number, Type::Number], Type::Number);
        assert_eq!(unify(&concrete_two, &concrete_three), SubstitutionSet::error());
    }

    #[test]
    fn test_unify_occurs_check() {
        let ty = Type::function(vec![Type::var("v")], Type::Number);
        assert_eq!(unify(&Type::var("v"), &ty), SubstitutionSet::error());
        assert_eq!(unify(&ty, &Type::var("v")), SubstitutionSet::error());
    }

    #[test]
    fn test_unify_function_types_with_vars() {
        let t1 = Type::function(vec![Type::var("a")], Type::Number);
        let t2 = Type::function(vec![Type::String], Type::var("b"));
        let result = unify(&t1, &t2);

        assert!(result.contains(&Substitution::new(var("a"), Type::String)));
        assert!(result.contains(&Substitution::new(var("b"), Type::Number)));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_unify_threads_substitutions_through_pairs() {
        // ('a, 'a) -> 'b  ~  (number, string) -> 'b
        let t1 = Type::function(vec![Type::var("a"), Type::var("a")], Type::var("b"));
        let t2 = Type::function(vec![Type::Number, Type::String], Type::var("b"));
        assert!(unify(&t1, &t2).is_error());

        // ('a, 'b) -> 'a  ~  ('b, number) -> 'c
        let t1 = Type::function(vec![Type::var("a"), Type::var("b")], Type::var("a"));
        let t2 = Type::function(vec![Type::var("b"), Type::Number], Type::var("c"));
        let result = unify(&t1, &t2);
        assert_eq!(result.apply(&Type::var("a")), Type::Number);
        assert_eq!(result.apply(&Type::var("b")), Type::Number);
        assert_eq!(result.apply(&Type::var("c")), Type::Number);
    }

    #[test]
    fn test_unify_nested_functions() {
        let t1 = Type::function(
            vec![Type::function(vec![Type::Number], Type::var("a"))],
            Type::String,
        );
        let t2 = Type::function(
            vec![Type::function(vec![Type::Number], Type::Bool)],
            Type::String,
        );
        let result = unify(&t1, &t2);
        assert_eq!(result, SubstitutionSet::singleton(var("a"), Type::Bool));
    }

    #[test]
    fn test_no_type_only_unifies_with_itself_or_vars() {
        assert!(unify(&Type::NoType, &Type::NoType).is_empty());
        assert!(unify(&Type::NoType, &Type::Number).is_error());
        assert_eq!(
            unify(&Type::NoType, &Type::var("a")),
            SubstitutionSet::singleton(var("a"), Type::NoType)
        );
    }

    #[test]
    fn test_occurs_check_sees_nested_variable() {
        let nested = Type::function(
            vec![Type::Number, Type::function(vec![Type::var("v")], Type::Bool)],
            Type::String,
        );
        assert!(unify(&Type::var("v"), &nested).is_error());
        assert!(!unify(&Type::var("w"), &nested).is_error());
    }
}
