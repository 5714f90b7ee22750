/// Script expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    This,

    /// Variable reference; `undefined` is an ordinary name bound globally
    Identifier(String),

    Array(Vec<Expr>),

    /// Object literal, keys in source order
    Object(Vec<(String, Expr)>),

    /// `obj.name` or `obj[expr]`
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `&&` and `||`, which return one of their operands
    Logical {
        and: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// `target = value`; target is an identifier or a member expression
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    LooseEqual,
    LooseNotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

/// Script statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var a = 1, b;`
    Declare(Vec<(String, Option<Expr>)>),
    Expression(Expr),
    Return(Option<Expr>),
    If {
        test: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Empty,
}
