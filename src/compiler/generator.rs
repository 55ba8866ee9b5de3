//! Constraint generation.
//!
//! A single walk over the program tree that rebuilds it with a type on every
//! node and collects the constraints implied by the typing rules. Names are
//! looked up by their internal (already unique) name.

use crate::compiler::ast::{
    Application, Argument, BoolLit, Conditional, Declaration, Function, Identifier, Labeled,
    Node, NumberLit, Operation, Program, StringLit,
};
use crate::compiler::constraints::{Constraint, ConstraintSet};
use crate::compiler::types::{Type, TypeFactory, TypeVariable};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Faults raised while generating constraints. These mean an earlier pass
/// broke its contract, not that the program is ill-typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferError {
    #[error("identifier `{name}` (internal name `{internal}`) is used before it is bound")]
    Unbound { name: String, internal: String },
}

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, Type>,
    /// Parameter variables introduced by the function owning this frame.
    monomorphic: BTreeSet<TypeVariable>,
}

/// Assumptions in force during the walk: name bindings and the variables
/// frozen by enclosing function parameters.
///
/// Each function body gets its own frame; leaving the body drops every
/// binding and frozen variable it introduced.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn exit_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the innermost frame, shadowing any earlier binding.
    pub fn bind(&mut self, name: String, ty: Type) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name, ty);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name))
    }

    /// Mark `var` as bound by a parameter of the innermost function.
    pub fn freeze(&mut self, var: TypeVariable) {
        if let Some(frame) = self.frames.last_mut() {
            frame.monomorphic.insert(var);
        }
    }

    /// Every variable frozen by the functions currently being walked.
    pub fn monomorphic(&self) -> BTreeSet<TypeVariable> {
        self.frames
            .iter()
            .flat_map(|frame| frame.monomorphic.iter().cloned())
            .collect()
    }
}

/// Walks a program tree and emits typing constraints.
#[derive(Debug, Default)]
pub struct ConstraintGenerator {
    factory: TypeFactory,
    scope: Scope,
    constraints: ConstraintSet,
}

impl ConstraintGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotate `program` and return it together with its constraints.
    #[tracing::instrument(level = "debug", skip_all, fields(nodes = program.nodes.len()))]
    pub fn generate(
        mut self,
        program: Program,
    ) -> Result<(Program<Type>, ConstraintSet), InferError> {
        let annotated = self.program(program)?;
        tracing::debug!(
            constraints = self.constraints.len(),
            variables = self.factory.issued(),
            "constraint generation complete"
        );
        Ok((annotated, self.constraints))
    }

    fn constrain(&mut self, constraint: Constraint) {
        tracing::trace!(%constraint, "emit");
        self.constraints.insert(constraint);
    }

    /// Run `f` inside a fresh frame, restoring the outer frame on every exit
    /// path.
    fn in_function_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scope.enter_scope();
        let result = f(self);
        self.scope.exit_scope();
        result
    }

    fn program(&mut self, program: Program) -> Result<Program<Type>, InferError> {
        let nodes = program
            .nodes
            .into_iter()
            .map(|node| self.node(node))
            .collect::<Result<Vec<_>, _>>()?;
        let info = nodes.last().map_or(Type::NoType, |last| last.info().clone());
        Ok(Program { nodes, info })
    }

    fn node(&mut self, node: Node) -> Result<Node<Type>, InferError> {
        match node {
            Node::Number(n) => Ok(Node::Number(NumberLit {
                value: n.value,
                info: Type::Number,
            })),
            Node::Str(s) => Ok(Node::Str(StringLit {
                value: s.value,
                info: Type::String,
            })),
            Node::Bool(b) => Ok(Node::Bool(BoolLit {
                value: b.value,
                info: Type::Bool,
            })),
            Node::Identifier(ident) => Ok(Node::Identifier(self.identifier(ident)?)),
            Node::Function(function) => Ok(Node::Function(self.function(function)?)),
            Node::Application(app) => Ok(Node::Application(self.application(app)?)),
            Node::Conditional(cond) => Ok(Node::Conditional(self.conditional(cond)?)),
            Node::Operation(op) => Ok(Node::Operation(self.operation(op)?)),
            Node::Declaration(decl) => Ok(Node::Declaration(self.declaration(decl)?)),
            Node::Program(program) => Ok(Node::Program(self.program(program)?)),
        }
    }

    fn identifier(&self, ident: Identifier) -> Result<Identifier<Type>, InferError> {
        let ty = self
            .scope
            .lookup(&ident.internal)
            .cloned()
            .ok_or_else(|| InferError::Unbound {
                name: ident.name.clone(),
                internal: ident.internal.clone(),
            })?;
        Ok(Identifier {
            name: ident.name,
            internal: ident.internal,
            info: ty,
        })
    }

    fn argument(&mut self, argument: Argument) -> Result<Argument<Type>, InferError> {
        let var = self.factory.next();
        let ty = Type::Variable(var.clone());
        self.scope.bind(argument.identifier.internal.clone(), ty.clone());
        self.scope.freeze(var);

        let identifier = self.identifier(argument.identifier)?;
        let default = match argument.default {
            Some(expr) => {
                let expr = self.node(*expr)?;
                self.constrain(Constraint::equality(ty.clone(), expr.info().clone()));
                Some(Box::new(expr))
            }
            None => None,
        };

        Ok(Argument {
            identifier,
            default,
            info: ty,
        })
    }

    fn function(&mut self, function: Function) -> Result<Function<Type>, InferError> {
        self.in_function_scope(|this| {
            let parameters = function
                .parameters
                .into_iter()
                .map(|p| this.argument(p))
                .collect::<Result<Vec<_>, _>>()?;
            let body = this.program(function.body)?;

            let ret = this.factory.fresh();
            this.constrain(Constraint::equality(ret.clone(), body.info.clone()));

            let params = parameters.iter().map(|p| p.info.clone()).collect();
            Ok(Function {
                parameters,
                body,
                info: Type::function(params, ret),
            })
        })
    }

    fn application(&mut self, app: Application) -> Result<Application<Type>, InferError> {
        let callee = self.identifier(app.callee)?;
        let arguments = app
            .arguments
            .into_iter()
            .map(|arg| {
                Ok(Labeled {
                    label: arg.label,
                    value: self.node(arg.value)?,
                })
            })
            .collect::<Result<Vec<_>, InferError>>()?;

        let result = self.factory.fresh();
        let expected = Type::function(
            arguments.iter().map(|arg| arg.value.info().clone()).collect(),
            result.clone(),
        );
        self.constrain(Constraint::equality(callee.info.clone(), expected));

        Ok(Application {
            callee,
            arguments,
            info: result,
        })
    }

    fn conditional(&mut self, cond: Conditional) -> Result<Conditional<Type>, InferError> {
        let condition = self.node(*cond.condition)?;
        let true_branch = self.program(cond.true_branch)?;
        let false_branch = self.program(cond.false_branch)?;

        self.constrain(Constraint::equality(
            true_branch.info.clone(),
            false_branch.info.clone(),
        ));
        self.constrain(Constraint::equality(condition.info().clone(), Type::Bool));

        let info = true_branch.info.clone();
        Ok(Conditional {
            condition: Box::new(condition),
            true_branch,
            false_branch,
            info,
        })
    }

    fn operation(&mut self, op: Operation) -> Result<Operation<Type>, InferError> {
        let left = self.node(*op.left)?;
        let right = self.node(*op.right)?;

        self.constrain(Constraint::equality(left.info().clone(), Type::Number));
        self.constrain(Constraint::equality(right.info().clone(), Type::Number));

        let info = if op.op.is_comparison() {
            Type::Bool
        } else {
            Type::Number
        };
        Ok(Operation {
            left: Box::new(left),
            op: op.op,
            right: Box::new(right),
            info,
        })
    }

    fn declaration(&mut self, decl: Declaration) -> Result<Declaration<Type>, InferError> {
        let ty = self.factory.fresh();
        self.scope.bind(decl.identifier.internal.clone(), ty.clone());
        let identifier = self.identifier(decl.identifier)?;

        let value = self.node(*decl.value)?;
        self.constrain(Constraint::implicit_instance(
            ty.clone(),
            value.info().clone(),
            self.scope.monomorphic(),
        ));

        let rest = match decl.rest {
            Some(rest) => Some(Box::new(self.node(*rest)?)),
            None => None,
        };
        let info = rest.as_ref().map_or(ty, |rest| rest.info().clone());

        Ok(Declaration {
            identifier,
            value: Box::new(value),
            rest,
            info,
        })
    }
}

/// Annotate `program` and collect its constraints.
pub fn generate(program: Program) -> Result<(Program<Type>, ConstraintSet), InferError> {
    ConstraintGenerator::new().generate(program)
}
