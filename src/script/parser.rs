use std::mem;

use crate::script::{
    BridgeError,
    lexer::Lexer,
    syntax::{BinaryOp, Expr, Stmt, UnaryOp},
    tokens::Token,
};

type ParseResult<T> = Result<T, BridgeError>;

/// Deepest syntactic nesting accepted. Parsing and evaluation both recurse
/// along the tree, so deeper sources are rejected instead of exhausting the stack.
const MAX_NESTING: usize = 128;

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    /// Open nesting levels: sub-expressions, statements and operator chains
    depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> ParseResult<Self> {
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            depth: 0,
        })
    }

    fn descend(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(BridgeError::Syntax("nesting too deep".to_string()));
        }
        Ok(())
    }

    /// Run `parse` one nesting level down.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn advance(&mut self) -> ParseResult<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if !self.check(&expected) {
            return Err(self.unexpected(&format!("{:?}", expected)));
        }
        self.advance()
    }

    fn unexpected(&self, wanted: &str) -> BridgeError {
        BridgeError::Syntax(format!(
            "expected {}, got {:?}",
            wanted, self.current_token
        ))
    }

    /// Consume an optional `;`.
    fn skip_semicolon(&mut self) -> ParseResult<()> {
        if self.check(&Token::Semicolon) {
            self.advance()?;
        }
        Ok(())
    }

    /// Parse a source that is a single expression, as in `js("2 + 2")`.
    pub fn parse_expression_source(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_expression()?;
        self.skip_semicolon()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }

    /// Parse a function body, as in `js_body("return 0;")`.
    pub fn parse_body(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![];
        while !self.check(&Token::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Stmt> {
        match &self.current_token {
            Token::Semicolon => {
                self.advance()?;
                Ok(Stmt::Empty)
            }
            Token::Declare => self.parse_declaration(),
            Token::Return => {
                self.advance()?;
                let value = if matches!(
                    self.current_token,
                    Token::Semicolon | Token::RBrace | Token::Eof
                ) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.skip_semicolon()?;
                Ok(Stmt::Return(value))
            }
            Token::If => {
                self.advance()?;
                self.expect(Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let then = Box::new(self.parse_statement()?);
                let otherwise = if self.check(&Token::Else) {
                    self.advance()?;
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    then,
                    otherwise,
                })
            }
            Token::LBrace => {
                self.advance()?;
                let mut statements = vec![];
                while !self.check(&Token::RBrace) {
                    if self.check(&Token::Eof) {
                        return Err(self.unexpected("'}'"));
                    }
                    statements.push(self.parse_statement()?);
                }
                self.advance()?;
                Ok(Stmt::Block(statements))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.skip_semicolon()?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn parse_declaration(&mut self) -> ParseResult<Stmt> {
        self.advance()?; // consume var/let/const
        let mut declarations = vec![];
        loop {
            let name = match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Identifier(name) => name,
                other => {
                    self.current_token = other;
                    return Err(self.unexpected("identifier"));
                }
            };
            self.advance()?;
            let init = if self.check(&Token::Assign) {
                self.advance()?;
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push((name, init));
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance()?;
        }
        self.skip_semicolon()?;
        Ok(Stmt::Declare(declarations))
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> ParseResult<Expr> {
        let target = self.parse_conditional()?;
        if !self.check(&Token::Assign) {
            return Ok(target);
        }
        if !matches!(target, Expr::Identifier(_) | Expr::Member { .. }) {
            return Err(BridgeError::Syntax(
                "invalid left-hand side in assignment".to_string(),
            ));
        }
        self.advance()?;
        let value = self.parse_assignment()?; // Right-associative
        Ok(Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_logical(false)?;
        if !self.check(&Token::Question) {
            return Ok(test);
        }
        self.advance()?;
        let then = self.parse_assignment()?;
        self.expect(Token::Colon)?;
        let otherwise = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// `||` when `and` is false, `&&` when true; `&&` binds tighter.
    fn parse_logical(&mut self, and: bool) -> ParseResult<Expr> {
        let operator = if and { Token::AndAnd } else { Token::OrOr };
        let mut left = if and {
            self.parse_equality()?
        } else {
            self.parse_logical(true)?
        };

        // Each operator nests the tree built so far one level deeper
        let base = self.depth;
        while self.check(&operator) {
            self.descend()?;
            self.advance()?;
            let right = if and {
                self.parse_equality()?
            } else {
                self.parse_logical(true)?
            };
            left = Expr::Logical {
                and,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_binary_level(
        &mut self,
        operators: fn(&Token) -> Option<BinaryOp>,
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut left = next(self)?;
        let base = self.depth;
        while let Some(op) = operators(&self.current_token) {
            self.descend()?;
            self.advance()?;
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            |t| match t {
                Token::EqEq => Some(BinaryOp::LooseEqual),
                Token::NotEq => Some(BinaryOp::LooseNotEqual),
                Token::EqEqEq => Some(BinaryOp::StrictEqual),
                Token::NotEqEq => Some(BinaryOp::StrictNotEqual),
                _ => None,
            },
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            |t| match t {
                Token::Lt => Some(BinaryOp::LessThan),
                Token::LtEq => Some(BinaryOp::LessEqual),
                Token::Gt => Some(BinaryOp::GreaterThan),
                Token::GtEq => Some(BinaryOp::GreaterEqual),
                _ => None,
            },
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            |t| match t {
                Token::Plus => Some(BinaryOp::Add),
                Token::Minus => Some(BinaryOp::Subtract),
                _ => None,
            },
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            |t| match t {
                Token::Star => Some(BinaryOp::Multiply),
                Token::Slash => Some(BinaryOp::Divide),
                Token::Percent => Some(BinaryOp::Modulo),
                _ => None,
            },
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current_token {
            Token::Minus => UnaryOp::Negate,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_member(),
        };
        self.advance()?;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_member(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        let base = self.depth;

        loop {
            if self.check(&Token::Dot) {
                self.descend()?;
                self.advance()?;
                let name = match mem::replace(&mut self.current_token, Token::Eof) {
                    Token::Identifier(name) => name,
                    other => {
                        self.current_token = other;
                        return Err(self.unexpected("property name after '.'"));
                    }
                };
                self.advance()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(Expr::String(name)),
                };
            } else if self.check(&Token::LBracket) {
                self.descend()?;
                self.advance()?;
                let property = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                };
            } else if self.check(&Token::LParen) {
                return Err(BridgeError::Syntax(
                    "function calls are not supported".to_string(),
                ));
            } else {
                break;
            }
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let expr = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Number(n) => Expr::Number(n),
            Token::String(s) => Expr::String(s),
            Token::Boolean(b) => Expr::Boolean(b),
            Token::Null => Expr::Null,
            Token::This => Expr::This,
            Token::Identifier(name) => Expr::Identifier(name),
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                return Ok(expr);
            }
            Token::LBracket => {
                self.advance()?;
                return self.parse_array_literal();
            }
            Token::LBrace => {
                self.advance()?;
                return self.parse_object_literal();
            }
            token => {
                self.current_token = token;
                return Err(self.unexpected("an expression"));
            }
        };
        self.advance()?;
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let mut elements = vec![];
        while !self.check(&Token::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.check(&Token::RBracket) {
                self.expect(Token::Comma)?;
            }
        }
        self.advance()?;
        Ok(Expr::Array(elements))
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        let mut pairs = vec![];
        while !self.check(&Token::RBrace) {
            let key = match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Identifier(s) | Token::String(s) => s,
                Token::Number(n) => n.to_string(),
                other => {
                    self.current_token = other;
                    return Err(self.unexpected("property name"));
                }
            };
            self.advance()?;
            self.expect(Token::Colon)?;
            let value = self.parse_assignment()?;
            pairs.push((key, value));
            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }
        self.advance()?;
        Ok(Expr::Object(pairs))
    }
}
