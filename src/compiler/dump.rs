//! Pretty-printers for the annotated program tree and solver inputs/outputs.
//!
//! This module provides human-readable output for debugging the inference
//! pipeline.

use crate::compiler::ast::{Argument, Node, Program};
use crate::compiler::constraints::ConstraintSet;
use crate::compiler::substitution::SubstitutionSet;
use std::fmt::Display;

const BRANCH: &str = "├── ";
const LAST: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Pretty-printer for a program tree, with each node's annotation after a
/// colon.
pub struct TreePrinter {
    output: String,
}

impl TreePrinter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    pub fn print_program<T: Display>(&mut self, program: &Program<T>) -> &str {
        self.write(&format!("Program : {}", program.info));
        self.newline();
        self.print_nodes(&program.nodes, "");
        &self.output
    }

    fn print_nodes<T: Display>(&mut self, nodes: &[Node<T>], parent_prefix: &str) {
        for (i, node) in nodes.iter().enumerate() {
            let is_last = i == nodes.len() - 1;
            self.print_child(node, is_last, parent_prefix);
        }
    }

    fn print_child<T: Display>(&mut self, node: &Node<T>, is_last: bool, parent_prefix: &str) {
        let (prefix, extension) = if is_last { (LAST, SPACE) } else { (BRANCH, PIPE) };
        let child_prefix = format!("{}{}", parent_prefix, extension);
        self.write(parent_prefix);
        self.print_node(node, prefix, &child_prefix);
    }

    /// A heading line such as `condition:` with a single node below it.
    fn print_section<T: Display>(
        &mut self,
        label: &str,
        node: &Node<T>,
        is_last: bool,
        parent_prefix: &str,
    ) {
        let (prefix, extension) = if is_last { (LAST, SPACE) } else { (BRANCH, PIPE) };
        self.write(&format!("{}{}{}:", parent_prefix, prefix, label));
        self.newline();
        self.print_child(node, true, &format!("{}{}", parent_prefix, extension));
    }

    /// A heading line such as `then: number` followed by the block's nodes.
    fn print_block<T: Display>(
        &mut self,
        label: &str,
        block: &Program<T>,
        is_last: bool,
        parent_prefix: &str,
    ) {
        let (prefix, extension) = if is_last { (LAST, SPACE) } else { (BRANCH, PIPE) };
        self.write(&format!("{}{}{}: {}", parent_prefix, prefix, label, block.info));
        self.newline();
        self.print_nodes(&block.nodes, &format!("{}{}", parent_prefix, extension));
    }

    fn print_node<T: Display>(&mut self, node: &Node<T>, prefix: &str, child_prefix: &str) {
        match node {
            Node::Number(n) => self.write_line(prefix, &format!("Number: {}", n.value), &n.info),

            Node::Str(s) => {
                let escaped = s.value.replace('\n', "\\n").replace('\t', "\\t");
                self.write_line(prefix, &format!("String: \"{}\"", escaped), &s.info);
            }

            Node::Bool(b) => self.write_line(prefix, &format!("Bool: {}", b.value), &b.info),

            Node::Identifier(ident) => self.write_line(
                prefix,
                &format!("Ident: {} ({})", ident.name, ident.internal),
                &ident.info,
            ),

            Node::Function(function) => {
                self.write_line(prefix, "Function", &function.info);
                for argument in &function.parameters {
                    self.print_argument(argument, child_prefix);
                }
                self.print_block("body", &function.body, true, child_prefix);
            }

            Node::Application(app) => {
                self.write_line(
                    prefix,
                    &format!("Apply: {} ({})", app.callee.name, app.callee.internal),
                    &app.info,
                );
                self.write(child_prefix);
                self.write(&format!("{}callee : {}", BRANCH, app.callee.info));
                self.newline();
                for (i, arg) in app.arguments.iter().enumerate() {
                    let is_last = i == app.arguments.len() - 1;
                    self.print_section(&format!("arg {}", arg.label), &arg.value, is_last, child_prefix);
                }
                if app.arguments.is_empty() {
                    self.write(&format!("{}{}(no arguments)", child_prefix, LAST));
                    self.newline();
                }
            }

            Node::Conditional(cond) => {
                self.write_line(prefix, "If", &cond.info);
                self.print_section("condition", &cond.condition, false, child_prefix);
                self.print_block("then", &cond.true_branch, false, child_prefix);
                self.print_block("else", &cond.false_branch, true, child_prefix);
            }

            Node::Operation(op) => {
                self.write_line(prefix, &format!("Binary: {}", op.op), &op.info);
                self.print_child(&op.left, false, child_prefix);
                self.print_child(&op.right, true, child_prefix);
            }

            Node::Declaration(decl) => {
                self.write_line(
                    prefix,
                    &format!(
                        "Declare: {} ({}) : {}",
                        decl.identifier.name, decl.identifier.internal, decl.identifier.info
                    ),
                    &decl.info,
                );
                let has_rest = decl.rest.is_some();
                self.print_section("value", &decl.value, !has_rest, child_prefix);
                if let Some(rest) = &decl.rest {
                    self.print_section("rest", rest, true, child_prefix);
                }
            }

            Node::Program(program) => {
                self.write_line(prefix, "Program", &program.info);
                self.print_nodes(&program.nodes, child_prefix);
            }
        }
    }

    fn print_argument<T: Display>(&mut self, argument: &Argument<T>, parent_prefix: &str) {
        let label = format!(
            "Param: {} ({})",
            argument.identifier.name, argument.identifier.internal
        );
        self.write(parent_prefix);
        self.write_line(BRANCH, &label, &argument.info);
        if let Some(default) = &argument.default {
            self.print_section("default", default, true, &format!("{}{}", parent_prefix, PIPE));
        }
    }

    fn write_line(&mut self, prefix: &str, content: &str, info: &impl Display) {
        self.write(prefix);
        self.write(content);
        self.write(&format!(" : {}", info));
        self.newline();
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn newline(&mut self) {
        self.output.push('\n');
    }
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format an annotated program as a tree.
pub fn format_tree<T: Display>(program: &Program<T>) -> String {
    let mut printer = TreePrinter::new();
    printer.print_program(program).to_string()
}

/// Format a constraint set, one constraint per line.
pub fn format_constraints(constraints: &ConstraintSet) -> String {
    let mut output = format!("Constraints ({})\n", constraints.len());
    for constraint in constraints {
        output.push_str(&format!("  {}\n", constraint));
    }
    output
}

/// Format a solved substitution set, one substitution per line.
pub fn format_substitutions(substitutions: &SubstitutionSet) -> String {
    let mut output = format!("Substitutions ({})\n", substitutions.len());
    for substitution in substitutions {
        output.push_str(&format!("  {}\n", substitution));
    }
    output
}
