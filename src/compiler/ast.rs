//! Program tree handed over by the parser and name-resolution passes.
//!
//! Every node carries an annotation `info: T`. Trees arrive as `Program<()>`
//! and leave inference as `Program<Type>`. Identifiers already hold their
//! globally unique internal names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of expressions. Its type is the type of the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Program<T = ()> {
    pub nodes: Vec<Node<T>>,
    #[serde(default)]
    pub info: T,
}

/// Expressions in the language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node<T = ()> {
    Number(NumberLit<T>),
    Str(StringLit<T>),
    Bool(BoolLit<T>),
    Identifier(Identifier<T>),
    Function(Function<T>),
    Application(Application<T>),
    Conditional(Conditional<T>),
    Operation(Operation<T>),
    Declaration(Declaration<T>),
    Program(Program<T>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct NumberLit<T = ()> {
    pub value: f64,
    #[serde(default)]
    pub info: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct StringLit<T = ()> {
    pub value: String,
    #[serde(default)]
    pub info: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct BoolLit<T = ()> {
    pub value: bool,
    #[serde(default)]
    pub info: T,
}

/// A reference to a bound name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Identifier<T = ()> {
    /// Name as written in the source.
    pub name: String,
    /// Unique name assigned by name resolution.
    pub internal: String,
    #[serde(default)]
    pub info: T,
}

/// A function parameter, optionally with a default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Argument<T = ()> {
    pub identifier: Identifier<T>,
    #[serde(default)]
    pub default: Option<Box<Node<T>>>,
    #[serde(default)]
    pub info: T,
}

/// `program(p: 1, q) do ... done`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Function<T = ()> {
    pub parameters: Vec<Argument<T>>,
    pub body: Program<T>,
    #[serde(default)]
    pub info: T,
}

/// A labeled argument at a call site. Arguments bind by position; the label
/// is kept for the back end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Labeled<T = ()> {
    pub label: String,
    pub value: Node<T>,
}

/// `f(p: 5)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Application<T = ()> {
    pub callee: Identifier<T>,
    pub arguments: Vec<Labeled<T>>,
    #[serde(default)]
    pub info: T,
}

/// `if cond then ... else ... done`. A missing else is an empty program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Conditional<T = ()> {
    pub condition: Box<Node<T>>,
    pub true_branch: Program<T>,
    pub false_branch: Program<T>,
    #[serde(default)]
    pub info: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Comparisons produce `bool`; the arithmetic operators produce `number`.
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Operation<T = ()> {
    pub left: Box<Node<T>>,
    pub op: BinaryOp,
    pub right: Box<Node<T>>,
    #[serde(default)]
    pub info: T,
}

/// `name = value; rest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Declaration<T = ()> {
    pub identifier: Identifier<T>,
    pub value: Box<Node<T>>,
    #[serde(default)]
    pub rest: Option<Box<Node<T>>>,
    #[serde(default)]
    pub info: T,
}

impl<T> Node<T> {
    /// The annotation attached to this node.
    pub fn info(&self) -> &T {
        match self {
            Node::Number(n) => &n.info,
            Node::Str(s) => &s.info,
            Node::Bool(b) => &b.info,
            Node::Identifier(i) => &i.info,
            Node::Function(f) => &f.info,
            Node::Application(a) => &a.info,
            Node::Conditional(c) => &c.info,
            Node::Operation(o) => &o.info,
            Node::Declaration(d) => &d.info,
            Node::Program(p) => &p.info,
        }
    }

    /// Rebuild the tree with every annotation passed through `f`.
    pub fn map_info<U>(self, f: &mut impl FnMut(T) -> U) -> Node<U> {
        match self {
            Node::Number(n) => Node::Number(NumberLit {
                value: n.value,
                info: f(n.info),
            }),
            Node::Str(s) => Node::Str(StringLit {
                value: s.value,
                info: f(s.info),
            }),
            Node::Bool(b) => Node::Bool(BoolLit {
                value: b.value,
                info: f(b.info),
            }),
            Node::Identifier(i) => Node::Identifier(i.map_info(f)),
            Node::Function(func) => Node::Function(Function {
                parameters: func
                    .parameters
                    .into_iter()
                    .map(|p| p.map_info(f))
                    .collect(),
                body: func.body.map_info(f),
                info: f(func.info),
            }),
            Node::Application(a) => Node::Application(Application {
                callee: a.callee.map_info(f),
                arguments: a
                    .arguments
                    .into_iter()
                    .map(|arg| Labeled {
                        label: arg.label,
                        value: arg.value.map_info(f),
                    })
                    .collect(),
                info: f(a.info),
            }),
            Node::Conditional(c) => Node::Conditional(Conditional {
                condition: Box::new(c.condition.map_info(f)),
                true_branch: c.true_branch.map_info(f),
                false_branch: c.false_branch.map_info(f),
                info: f(c.info),
            }),
            Node::Operation(o) => Node::Operation(Operation {
                left: Box::new(o.left.map_info(f)),
                op: o.op,
                right: Box::new(o.right.map_info(f)),
                info: f(o.info),
            }),
            Node::Declaration(d) => Node::Declaration(Declaration {
                identifier: d.identifier.map_info(f),
                value: Box::new(d.value.map_info(f)),
                rest: d.rest.map(|rest| Box::new(rest.map_info(f))),
                info: f(d.info),
            }),
            Node::Program(p) => Node::Program(p.map_info(f)),
        }
    }
}

impl<T> Program<T> {
    pub fn map_info<U>(self, f: &mut impl FnMut(T) -> U) -> Program<U> {
        Program {
            nodes: self.nodes.into_iter().map(|n| n.map_info(f)).collect(),
            info: f(self.info),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T> Identifier<T> {
    pub fn map_info<U>(self, f: &mut impl FnMut(T) -> U) -> Identifier<U> {
        Identifier {
            name: self.name,
            internal: self.internal,
            info: f(self.info),
        }
    }
}

impl<T> Argument<T> {
    pub fn map_info<U>(self, f: &mut impl FnMut(T) -> U) -> Argument<U> {
        Argument {
            identifier: self.identifier.map_info(f),
            default: self.default.map(|d| Box::new(d.map_info(f))),
            info: f(self.info),
        }
    }
}

// Constructors for unannotated trees, as produced by the parser.

impl Program {
    pub fn new(nodes: Vec<Node>) -> Self {
        Program { nodes, info: () }
    }
}

impl Identifier {
    pub fn new(name: impl Into<String>, internal: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            internal: internal.into(),
            info: (),
        }
    }

    /// An identifier whose internal name equals its source name.
    pub fn plain(name: impl Into<String>) -> Self {
        let name = name.into();
        Identifier::new(name.clone(), name)
    }
}

impl Argument {
    pub fn new(identifier: Identifier) -> Self {
        Argument {
            identifier,
            default: None,
            info: (),
        }
    }

    pub fn with_default(identifier: Identifier, default: Node) -> Self {
        Argument {
            identifier,
            default: Some(Box::new(default)),
            info: (),
        }
    }
}

impl Node {
    pub fn number(value: f64) -> Self {
        Node::Number(NumberLit { value, info: () })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::Str(StringLit {
            value: value.into(),
            info: (),
        })
    }

    pub fn boolean(value: bool) -> Self {
        Node::Bool(BoolLit { value, info: () })
    }

    pub fn ident(identifier: Identifier) -> Self {
        Node::Identifier(identifier)
    }

    pub fn function(parameters: Vec<Argument>, body: Program) -> Self {
        Node::Function(Function {
            parameters,
            body,
            info: (),
        })
    }

    pub fn application(callee: Identifier, arguments: Vec<(&str, Node)>) -> Self {
        Node::Application(Application {
            callee,
            arguments: arguments
                .into_iter()
                .map(|(label, value)| Labeled {
                    label: label.to_string(),
                    value,
                })
                .collect(),
            info: (),
        })
    }

    pub fn conditional(condition: Node, true_branch: Program, false_branch: Program) -> Self {
        Node::Conditional(Conditional {
            condition: Box::new(condition),
            true_branch,
            false_branch,
            info: (),
        })
    }

    pub fn operation(left: Node, op: BinaryOp, right: Node) -> Self {
        Node::Operation(Operation {
            left: Box::new(left),
            op,
            right: Box::new(right),
            info: (),
        })
    }

    pub fn declaration(identifier: Identifier, value: Node, rest: Option<Node>) -> Self {
        Node::Declaration(Declaration {
            identifier,
            value: Box::new(value),
            rest: rest.map(Box::new),
            info: (),
        })
    }

    pub fn program(nodes: Vec<Node>) -> Self {
        Node::Program(Program::new(nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_without_info() {
        let json = r#"{
            "nodes": [
                {
                    "kind": "declaration",
                    "identifier": { "name": "a", "internal": "a_0" },
                    "value": { "kind": "number", "value": 1.0 }
                }
            ]
        }"#;
        let program: Program = serde_json::from_str(json).unwrap();
        let expected = Program::new(vec![Node::declaration(
            Identifier::new("a", "a_0"),
            Node::number(1.0),
            None,
        )]);
        assert_eq!(program, expected);
    }

    #[test]
    fn test_deserialize_operation_and_conditional() {
        let json = r#"{
            "nodes": [
                {
                    "kind": "conditional",
                    "condition": {
                        "kind": "operation",
                        "left": { "kind": "number", "value": 1 },
                        "op": "lt",
                        "right": { "kind": "number", "value": 2 }
                    },
                    "true_branch": { "nodes": [{ "kind": "str", "value": "yes" }] },
                    "false_branch": { "nodes": [] }
                }
            ]
        }"#;
        let program: Program = serde_json::from_str(json).unwrap();
        let expected = Program::new(vec![Node::conditional(
            Node::operation(Node::number(1.0), BinaryOp::Lt, Node::number(2.0)),
            Program::new(vec![Node::string("yes")]),
            Program::new(vec![]),
        )]);
        assert_eq!(program, expected);
    }

    #[test]
    fn test_map_info_visits_every_node() {
        let program = Program::new(vec![
            Node::declaration(
                Identifier::plain("f"),
                Node::function(
                    vec![Argument::with_default(Identifier::plain("p"), Node::number(1.0))],
                    Program::new(vec![Node::ident(Identifier::plain("p"))]),
                ),
                None,
            ),
            Node::application(Identifier::plain("f"), vec![("p", Node::number(5.0))]),
        ]);

        let mut count = 0;
        let counted = program.map_info(&mut |()| {
            count += 1;
            count
        });
        // program, declaration, f, function, argument, p, default, body, p,
        // application, f, 5
        assert_eq!(count, 12);
        assert_eq!(counted.info, 12);
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(BinaryOp::Add.to_string(), "+");
        assert_eq!(BinaryOp::Ge.to_string(), ">=");
        assert!(BinaryOp::Lt.is_comparison());
        assert!(!BinaryOp::Mul.is_comparison());
    }
}
