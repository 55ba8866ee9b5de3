//! Worklist constraint solver.
//!
//! Constraints are taken off the front of a queue one at a time. Equalities
//! are unified and their substitutions are pushed into every constraint still
//! waiting. Instance constraints are turned into equalities once nothing
//! else pending depends on the variables they would generalize.

use crate::compiler::constraints::{Constraint, ConstraintSet, Relation};
use crate::compiler::substitution::SubstitutionSet;
use crate::compiler::unify::unify;
use crate::config::InferConfig;
use std::collections::VecDeque;
use thiserror::Error;

/// The solver could not finish. Distinct from a type error in the program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("solver made no progress with {remaining} constraint(s) left")]
    NoProgress { remaining: usize },
    #[error("solver exceeded its budget of {budget} step(s)")]
    BudgetExhausted { budget: usize },
}

/// Solve `constraints` without a step budget.
pub fn solve(constraints: ConstraintSet) -> Result<SubstitutionSet, SolverError> {
    solve_with(constraints, &InferConfig::default())
}

/// Solve `constraints`, taking them in the set's order.
pub fn solve_with(
    constraints: ConstraintSet,
    config: &InferConfig,
) -> Result<SubstitutionSet, SolverError> {
    solve_worklist(constraints.into_iter().collect(), config)
}

/// Solve the constraints in `worklist`, starting from the front.
///
/// Returns the accumulated substitutions, or `{Error}` as soon as one
/// unification fails. The result is composed as it grows, so it can be
/// applied as a single simultaneous mapping.
#[tracing::instrument(level = "debug", skip_all, fields(constraints = worklist.len()))]
pub fn solve_worklist(
    mut worklist: VecDeque<Constraint>,
    config: &InferConfig,
) -> Result<SubstitutionSet, SolverError> {
    let mut result = SubstitutionSet::new();
    let mut steps = 0usize;
    // Constraints popped in a row without any of them changing.
    let mut stalled = 0usize;

    while let Some(constraint) = worklist.pop_front() {
        steps += 1;
        if config.is_bounded() && steps > config.max_solver_steps {
            tracing::debug!(budget = config.max_solver_steps, "solver budget exhausted");
            return Err(SolverError::BudgetExhausted {
                budget: config.max_solver_steps,
            });
        }
        tracing::trace!(step = steps, %constraint, pending = worklist.len(), "pop");

        match constraint.relation {
            Relation::Equality => {
                stalled = 0;
                let found = unify(&constraint.left, &constraint.right);
                if found.is_error() {
                    tracing::debug!(%constraint, "unification failed");
                    return Ok(SubstitutionSet::error());
                }
                for substitution in found {
                    tracing::trace!(%substitution, "substitute");
                    if let Some(source) = substitution.source() {
                        for pending in worklist.iter_mut().filter(|c| c.mentions(source)) {
                            *pending = pending.apply(&substitution);
                        }
                    }
                    result.compose(substitution);
                }
            }
            Relation::ImplicitInstance { .. } => {
                stalled = 0;
                worklist.push_back(constraint.with_relation(Relation::Equality));
            }
            Relation::ExplicitInstance { ref monomorphic } => {
                let generalizable = constraint.generalizable_vars();
                let blocked = worklist.iter().any(|other| {
                    other
                        .active_vars()
                        .iter()
                        .any(|var| generalizable.contains(var))
                });

                if blocked {
                    stalled += 1;
                    tracing::trace!(%constraint, "defer");
                    worklist.push_back(constraint);
                    if stalled > worklist.len() {
                        tracing::debug!(remaining = worklist.len(), "solver stuck");
                        return Err(SolverError::NoProgress {
                            remaining: worklist.len(),
                        });
                    }
                } else {
                    stalled = 0;
                    let relation = Relation::ImplicitInstance {
                        monomorphic: monomorphic.clone(),
                    };
                    worklist.push_back(constraint.with_relation(relation));
                }
            }
        }
    }

    tracing::debug!(steps, substitutions = result.len(), "solved");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::{Argument, BinaryOp, Identifier, Node, Program};
    use crate::compiler::generator::generate;
    use crate::compiler::substitution::Substitution;
    use crate::compiler::types::{Type, TypeVariable};
    use pretty_assertions::{assert_eq, assert_ne};
    use std::collections::BTreeSet;

    fn id(name: &str) -> Identifier {
        Identifier::plain(name)
    }

    fn var(id: &str) -> TypeVariable {
        TypeVariable::new(id)
    }

    fn frozen(ids: &[&str]) -> BTreeSet<TypeVariable> {
        ids.iter().map(|id| TypeVariable::new(*id)).collect()
    }

    fn solve_program(nodes: Vec<Node>) -> (Program<Type>, SubstitutionSet) {
        let (typed, constraints) = generate(Program::new(nodes)).unwrap();
        (typed, solve(constraints).unwrap())
    }

    fn declared_type(typed: &Program<Type>, index: usize) -> Type {
        match &typed.nodes[index] {
            Node::Declaration(decl) => decl.identifier.info.clone(),
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(solve(ConstraintSet::new()).unwrap(), SubstitutionSet::new());
    }

    #[test]
    fn test_literal_inference() {
        let (_, subs) = solve_program(vec![Node::declaration(id("a"), Node::number(1.0), None)]);
        assert_eq!(subs, SubstitutionSet::singleton(var("a"), Type::Number));
    }

    #[test]
    fn test_propagation_through_binding() {
        let (typed, subs) = solve_program(vec![
            Node::declaration(id("a"), Node::number(1.0), None),
            Node::declaration(id("b"), Node::ident(id("a")), None),
        ]);
        assert_eq!(subs.apply(&declared_type(&typed, 0)), Type::Number);
        assert_eq!(subs.apply(&declared_type(&typed, 1)), Type::Number);
    }

    #[test]
    fn test_arithmetic_declaration() {
        let (typed, subs) = solve_program(vec![Node::declaration(
            id("x"),
            Node::operation(Node::number(2.0), BinaryOp::Add, Node::number(3.0)),
            None,
        )]);
        assert_eq!(subs.apply(&declared_type(&typed, 0)), Type::Number);
    }

    #[test]
    fn test_operand_must_be_number() {
        let (_, subs) = solve_program(vec![Node::operation(
            Node::string("a"),
            BinaryOp::Sub,
            Node::number(1.0),
        )]);
        assert_eq!(subs, SubstitutionSet::error());
    }

    #[test]
    fn test_conditional_branch_agreement() {
        let (typed, subs) = solve_program(vec![
            Node::declaration(id("cond"), Node::boolean(true), None),
            Node::conditional(
                Node::ident(id("cond")),
                Program::new(vec![Node::number(1.0)]),
                Program::new(vec![Node::number(2.0)]),
            ),
        ]);
        assert!(!subs.is_error());
        assert_eq!(subs.apply(&typed.info), Type::Number);
        assert_eq!(subs.apply(&declared_type(&typed, 0)), Type::Bool);
    }

    #[test]
    fn test_conditional_branch_mismatch() {
        let (_, subs) = solve_program(vec![Node::conditional(
            Node::boolean(true),
            Program::new(vec![Node::number(1.0)]),
            Program::new(vec![Node::string("no")]),
        )]);
        assert_eq!(subs, SubstitutionSet::error());
    }

    #[test]
    fn test_conditional_needs_bool_condition() {
        let (_, subs) = solve_program(vec![Node::conditional(
            Node::number(0.0),
            Program::new(vec![Node::number(1.0)]),
            Program::new(vec![Node::number(2.0)]),
        )]);
        assert!(subs.is_error());
    }

    #[test]
    fn test_conditional_without_else_only_fits_empty_then() {
        let (_, subs) = solve_program(vec![Node::conditional(
            Node::boolean(true),
            Program::new(vec![]),
            Program::new(vec![]),
        )]);
        assert!(!subs.is_error());

        let (_, subs) = solve_program(vec![Node::conditional(
            Node::boolean(true),
            Program::new(vec![Node::number(1.0)]),
            Program::new(vec![]),
        )]);
        assert!(subs.is_error());
    }

    #[test]
    fn test_function_application_round_trip() {
        // f = program(p: 1) do p done; r = f(p: 5)
        let (typed, subs) = solve_program(vec![
            Node::declaration(
                id("f"),
                Node::function(
                    vec![Argument::with_default(id("p"), Node::number(1.0))],
                    Program::new(vec![Node::ident(id("p"))]),
                ),
                None,
            ),
            Node::declaration(
                id("r"),
                Node::application(id("f"), vec![("p", Node::number(5.0))]),
                None,
            ),
        ]);
        assert!(!subs.is_error());
        assert_eq!(subs.apply(&declared_type(&typed, 1)), Type::Number);
        assert_eq!(
            subs.apply(&declared_type(&typed, 0)),
            Type::function(vec![Type::Number], Type::Number)
        );
    }

    #[test]
    fn test_application_arity_mismatch() {
        let (_, subs) = solve_program(vec![
            Node::declaration(
                id("f"),
                Node::function(vec![Argument::new(id("p"))], Program::new(vec![])),
                None,
            ),
            Node::application(id("f"), vec![("p", Node::number(1.0)), ("q", Node::number(2.0))]),
        ]);
        assert_eq!(subs, SubstitutionSet::error());
    }

    #[test]
    fn test_parameter_used_at_two_types_fails() {
        // program(p) do p + 1; if p then 1 else 2 done done
        let body = Program::new(vec![
            Node::operation(Node::ident(id("p")), BinaryOp::Add, Node::number(1.0)),
            Node::conditional(
                Node::ident(id("p")),
                Program::new(vec![Node::number(1.0)]),
                Program::new(vec![Node::number(2.0)]),
            ),
        ]);
        let (_, subs) =
            solve_program(vec![Node::function(vec![Argument::new(id("p"))], body)]);
        assert!(subs.is_error());
    }

    #[test]
    fn test_self_application_fails_occurs_check() {
        // program(f) do f(f: f) done
        let body = Program::new(vec![Node::application(
            id("f"),
            vec![("f", Node::ident(id("f")))],
        )]);
        let (_, subs) =
            solve_program(vec![Node::function(vec![Argument::new(id("f"))], body)]);
        assert_eq!(subs, SubstitutionSet::error());
    }

    #[test]
    fn test_result_is_idempotent() {
        let (_, subs) = solve_program(vec![
            Node::declaration(id("a"), Node::number(1.0), None),
            Node::declaration(id("b"), Node::ident(id("a")), None),
            Node::declaration(id("c"), Node::ident(id("b")), None),
        ]);
        for substitution in subs.iter() {
            if let Substitution::Replace { target, .. } = substitution {
                assert_eq!(subs.apply(target), *target);
            }
        }
    }

    #[test]
    fn test_explicit_instance_waits_for_dependents() {
        // 'a <[] 'b is popped first and stays blocked by 'b == number until
        // that equality is solved.
        let constraints: ConstraintSet = [
            Constraint::explicit_instance(Type::var("a"), Type::var("b"), frozen(&[])),
            Constraint::equality(Type::var("b"), Type::Number),
        ]
        .into_iter()
        .collect();
        let subs = solve(constraints).unwrap();
        assert_eq!(subs.apply(&Type::var("a")), Type::Number);
        assert_eq!(subs.apply(&Type::var("b")), Type::Number);
    }

    #[test]
    fn test_explicit_instance_frozen_vars_do_not_block() {
        let constraints: ConstraintSet = [
            Constraint::explicit_instance(Type::var("x"), Type::var("a"), frozen(&["a"])),
            Constraint::explicit_instance(Type::var("y"), Type::var("a"), frozen(&["a"])),
        ]
        .into_iter()
        .collect();
        let subs = solve(constraints).unwrap();
        assert_eq!(subs.apply(&Type::var("x")), subs.apply(&Type::var("y")));
    }

    #[test]
    fn test_mutually_blocking_explicit_instances() {
        let constraints: ConstraintSet = [
            Constraint::explicit_instance(Type::var("a"), Type::var("b"), frozen(&[])),
            Constraint::explicit_instance(Type::var("b"), Type::var("a"), frozen(&[])),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            solve(constraints),
            Err(SolverError::NoProgress { remaining: 2 })
        );
    }

    #[test]
    fn test_budget_exhausted() {
        let constraints: ConstraintSet = [
            Constraint::implicit_instance(Type::var("a"), Type::Number, frozen(&[])),
            Constraint::implicit_instance(Type::var("b"), Type::String, frozen(&[])),
        ]
        .into_iter()
        .collect();
        let config = InferConfig {
            max_solver_steps: 3,
            trace_solver: false,
        };
        assert_eq!(
            solve_with(constraints.clone(), &config),
            Err(SolverError::BudgetExhausted { budget: 3 })
        );

        let unbounded = InferConfig {
            max_solver_steps: 0,
            trace_solver: false,
        };
        assert_eq!(solve_with(constraints, &unbounded).unwrap().len(), 2);
    }

    #[test]
    fn test_error_poisons_everything() {
        let constraints: ConstraintSet = [
            Constraint::equality(Type::var("a"), Type::Number),
            Constraint::equality(Type::var("b"), Type::String),
            Constraint::equality(Type::Number, Type::String),
        ]
        .into_iter()
        .collect();
        assert_eq!(solve(constraints).unwrap(), SubstitutionSet::error());
    }

    #[test]
    fn test_order_independent_outcome() {
        let constraints = vec![
            Constraint::equality(Type::var("a"), Type::var("b")),
            Constraint::equality(Type::var("b"), Type::var("c")),
            Constraint::equality(Type::var("c"), Type::Number),
            Constraint::implicit_instance(
                Type::var("d"),
                Type::function(vec![Type::var("a")], Type::var("c")),
                frozen(&[]),
            ),
        ];
        let config = InferConfig::default();
        let forward = solve_worklist(constraints.iter().cloned().collect(), &config).unwrap();
        let backward =
            solve_worklist(constraints.iter().rev().cloned().collect(), &config).unwrap();
        for v in ["a", "b", "c", "d"] {
            assert_eq!(forward.apply(&Type::var(v)), backward.apply(&Type::var(v)));
        }
        assert_eq!(
            forward.apply(&Type::var("d")),
            Type::function(vec![Type::Number], Type::Number)
        );
    }

    #[test]
    fn test_instance_order_does_not_change_outcome() {
        // With the instance in front it is deferred until both equalities
        // are solved.
        let eqs_first: VecDeque<Constraint> = [
            Constraint::equality(Type::var("b"), Type::Number),
            Constraint::equality(Type::var("c"), Type::String),
            Constraint::explicit_instance(
                Type::var("a"),
                Type::function(vec![Type::var("b")], Type::var("c")),
                frozen(&[]),
            ),
        ]
        .into_iter()
        .collect();
        let instance_first: VecDeque<Constraint> = eqs_first.iter().rev().cloned().collect();
        assert_ne!(eqs_first, instance_first);

        let config = InferConfig::default();
        let one = solve_worklist(eqs_first, &config).unwrap();
        let other = solve_worklist(instance_first, &config).unwrap();
        assert_eq!(one, other);
        assert_eq!(
            one.apply(&Type::var("a")),
            Type::function(vec![Type::Number], Type::String)
        );
    }

    #[test]
    fn test_large_program_needs_no_budget() {
        let nodes = (0..6000)
            .map(|i| Node::declaration(id(&format!("x_{}", i)), Node::number(1.0), None))
            .collect();
        let (typed, subs) = solve_program(nodes);
        assert!(!subs.is_error());
        assert_eq!(subs.len(), 6000);
        assert_eq!(subs.apply(&declared_type(&typed, 5999)), Type::Number);
    }
}
