use crate::script::{BridgeError, tokens::Token};

type LexResult<T> = Result<T, BridgeError>;

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_char(1) == Some('/') {
                while self.current_char().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> LexResult<String> {
        let mut result = String::new();
        self.advance();

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('0') => result.push('\0'),
                        // Unknown escapes stand for the character itself
                        Some(ch) => result.push(ch),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(BridgeError::Syntax("unterminated string literal".to_string()))
    }

    fn read_number(&mut self) -> LexResult<Token> {
        let start = self.position;
        let mut seen_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !seen_dot && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_dot = true;
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && (self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
                    || (matches!(self.peek_char(1), Some('+' | '-'))
                        && self.peek_char(2).is_some_and(|c| c.is_ascii_digit())))
            {
                self.advance();
                self.advance();
                while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
                break;
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| BridgeError::Syntax(format!("invalid number literal {}", text)))
    }

    /// Consume `ch` and return `then` if it is next, otherwise return `otherwise`.
    fn either(&mut self, ch: char, then: Token, otherwise: Token) -> Token {
        if self.current_char() == Some(ch) {
            self.advance();
            then
        } else {
            otherwise
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_whitespace_and_comments();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        if ch == '"' || ch == '\'' {
            return self.read_string(ch).map(Token::String);
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.read_number();
        }
        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let ident = self.read_identifier();
            return Ok(match ident.as_str() {
                "true" => Token::Boolean(true),
                "false" => Token::Boolean(false),
                "null" => Token::Null,
                "this" => Token::This,
                "var" | "let" | "const" => Token::Declare,
                "return" => Token::Return,
                "if" => Token::If,
                "else" => Token::Else,
                _ => Token::Identifier(ident),
            });
        }

        self.advance();
        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '?' => Token::Question,
            '.' => Token::Dot,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '<' => self.either('=', Token::LtEq, Token::Lt),
            '>' => self.either('=', Token::GtEq, Token::Gt),
            '=' => match self.either('=', Token::EqEq, Token::Assign) {
                Token::EqEq => self.either('=', Token::EqEqEq, Token::EqEq),
                other => other,
            },
            '!' => match self.either('=', Token::NotEq, Token::Bang) {
                Token::NotEq => self.either('=', Token::NotEqEq, Token::NotEq),
                other => other,
            },
            '&' if self.current_char() == Some('&') => {
                self.advance();
                Token::AndAnd
            }
            '|' if self.current_char() == Some('|') => {
                self.advance();
                Token::OrOr
            }
            other => {
                return Err(BridgeError::Syntax(format!(
                    "unexpected character '{}' at position {}",
                    other,
                    self.position - 1
                )));
            }
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = vec![];
        loop {
            match lexer.next_token().unwrap() {
                Token::Eof => return out,
                t => out.push(t),
            }
        }
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens("var let const return this null true false"),
            vec![
                Token::Declare,
                Token::Declare,
                Token::Declare,
                Token::Return,
                Token::This,
                Token::Null,
                Token::Boolean(true),
                Token::Boolean(false),
            ]
        );
    }

    #[test]
    fn test_equality_operators() {
        assert_eq!(
            tokens("= == === != !== !"),
            vec![
                Token::Assign,
                Token::EqEq,
                Token::EqEqEq,
                Token::NotEq,
                Token::NotEqEq,
                Token::Bang,
            ]
        );
    }

    #[test]
    fn test_member_access_on_row() {
        assert_eq!(
            tokens("var_3.id == 1"),
            vec![
                Token::Identifier("var_3".into()),
                Token::Dot,
                Token::Identifier("id".into()),
                Token::EqEq,
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(
            tokens("2.5 1e3 'a\\'b' \"c\""),
            vec![
                Token::Number(2.5),
                Token::Number(1000.0),
                Token::String("a'b".into()),
                Token::String("c".into()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(tokens("1 // one\n+ 2"), vec![Token::Number(1.0), Token::Plus, Token::Number(2.0)]);
    }

    #[test]
    fn test_errors_instead_of_panics() {
        assert!(matches!(Lexer::new("\"open").next_token(), Err(BridgeError::Syntax(_))));
        assert!(matches!(Lexer::new("#").next_token(), Err(BridgeError::Syntax(_))));
    }
}
