#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Numeric literal; scripts have a single number type
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// ```
    Number(f64),

    /// String literal in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "cows"
    /// 'x'
    /// ```
    String(String),

    Boolean(bool),

    Null,

    /// Variable or property name
    Identifier(String),

    // Keywords
    This,
    /// `var`, `let` or `const`
    Declare,
    Return,
    If,
    Else,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `!`
    Bang,
    /// `=`
    Assign,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`
    NotEq,
    /// `!==`
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    Question,

    // Delimiters
    Dot,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    Eof,
}
