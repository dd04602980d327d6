//! AST node definitions.
//!
//! Every node carries a class, a kind, an optional literal tag, its primary
//! token, up to three named children (`left`, `right`, `condition`) and an
//! ordered child list — the shape the resolver and the lowering engine
//! traverse. Nodes are identified by a [`NodeId`] so later phases can attach
//! side tables (e.g. resolved expression types) without mutating the tree.

use netuno_common::Position;
use netuno_lexer::Token;
use serde::{Deserialize, Serialize};

/// Stable identity of a node within one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeClass {
    None,
    Expr,
    Stmt,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    None,
    Literal,
    Unary,
    Binary,
    Variable,
    Assign,
    Logical,
    Get,
    Call,
    Block,
    If,
    While,
    Until,
    Return,
    Break,
    Continue,
    Def,
    Sub,
    Var,
    Global,
    Local,
    Expr,
    Module,
    Type,
    Import,
    Public,
    Private,
    Param,
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralType {
    None,
    Bool,
    String,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub class: NodeClass,
    pub kind: NodeKind,
    pub literal_type: LiteralType,
    /// Primary token (name, operator or literal lexeme).
    pub token: Token,
    /// Token that closed the construct, when one exists (`end`, `next`, ...).
    pub token2: Option<Token>,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
    pub condition: Option<Box<Node>>,
    /// Ordered children: block statements, call arguments, parameters.
    pub children: Vec<Node>,
}

impl Node {
    pub fn position(&self) -> Position {
        Position::new(self.token.line)
    }

    pub fn is(&self, class: NodeClass, kind: NodeKind) -> bool {
        self.class == class && self.kind == kind
    }

    pub fn left(&self) -> Option<&Node> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node> {
        self.right.as_deref()
    }

    pub fn condition(&self) -> Option<&Node> {
        self.condition.as_deref()
    }
}
