// src/core/calc.rs

//! Arithmetic evaluator behind `$calc()`.
//!
//! Supports `+ - * /`, unary `+`/`-`, `^` (binds tighter than unary minus, right
//! associative), parentheses and the functions `sqrt`, `sin`, `cos`, `tan` with
//! angles in degrees.

use thiserror::Error;

/// Deepest nesting of parentheses and unary operators an expression may use.
pub const MAX_DEPTH: usize = 128;

/// Errors produced while evaluating an expression. Their text is what `$calc()` outputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// The expression contains nothing to evaluate.
    #[error("Empty expression")]
    Empty,
    /// A character that does not belong to the grammar.
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// A token in a place where it is not allowed.
    #[error("Unexpected '{0}' at position {1}")]
    UnexpectedToken(String, usize),
    /// The expression ended too early.
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    /// A function name that is not supported.
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    /// A malformed number literal.
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    /// Nesting deeper than [`MAX_DEPTH`].
    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Open,
    Close,
}

impl Token {
    fn text(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Name(name) => name.clone(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::Caret => "^".to_string(),
            Token::Open => "(".to_string(),
            Token::Close => ")".to_string(),
        }
    }
}

/// Evaluates `expression` and formats the result: whole numbers without a
/// fraction, anything else as a plain float.
pub fn calculate(expression: &str) -> Result<String, CalcError> {
    evaluate(expression).map(format_number)
}

/// Evaluates `expression` to a number.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = ExpressionParser {
        tokens,
        current: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    match parser.tokens.get(parser.current) {
        Some((token, pos)) => Err(CalcError::UnexpectedToken(token.text(), *pos)),
        None => Ok(value),
    }
}

fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn tokenize(expression: &str) -> Result<Vec<(Token, usize)>, CalcError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while let Some(&c) = chars.get(i) {
        let start = i;
        i += 1;
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::Open,
            ')' => Token::Close,
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::from(c);
                while let Some(&next) = chars.get(i) {
                    if !(next.is_ascii_digit() || next == '.') {
                        break;
                    }
                    literal.push(next);
                    i += 1;
                }
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
                Token::Number(number)
            }
            c if c.is_ascii_alphabetic() => {
                let mut name = String::from(c);
                while let Some(&next) = chars.get(i) {
                    if !next.is_ascii_alphabetic() {
                        break;
                    }
                    name.push(next);
                    i += 1;
                }
                Token::Name(name.to_ascii_lowercase())
            }
            other => return Err(CalcError::UnexpectedChar(other, start)),
        };
        tokens.push((token, start));
    }
    Ok(tokens)
}

struct ExpressionParser {
    tokens: Vec<(Token, usize)>,
    current: usize,
    depth: usize,
}

impl ExpressionParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), CalcError> {
        match self.advance() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, pos)) => Err(CalcError::UnexpectedToken(token.text(), pos)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    value /= self.unary()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // Every recursive path passes through here.
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(-self.unary()?)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.advance() {
            Some((Token::Number(n), _)) => Ok(n),
            Some((Token::Open, _)) => {
                let value = self.expression()?;
                self.expect(Token::Close)?;
                Ok(value)
            }
            Some((Token::Name(name), _)) => {
                self.expect(Token::Open)?;
                let argument = self.expression()?;
                self.expect(Token::Close)?;
                match name.as_str() {
                    "sqrt" => Ok(argument.sqrt()),
                    "sin" => Ok(argument.to_radians().sin()),
                    "cos" => Ok(argument.to_radians().cos()),
                    "tan" => Ok(argument.to_radians().tan()),
                    _ => Err(CalcError::UnknownFunction(name)),
                }
            }
            Some((token, pos)) => Err(CalcError::UnexpectedToken(token.text(), pos)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(calculate("1 + 2 * 3").unwrap(), "7");
        assert_eq!(calculate("(1 + 2) * 3").unwrap(), "9");
        assert_eq!(calculate("10 / 4").unwrap(), "2.5");
        assert_eq!(calculate("2 - 5").unwrap(), "-3");
    }

    #[test]
    fn test_power_binds_tighter_than_unary() {
        assert_eq!(calculate("-2^2").unwrap(), "-4");
        assert_eq!(calculate("2^3^2").unwrap(), "512");
        assert_eq!(calculate("2^-1").unwrap(), "0.5");
    }

    #[test]
    fn test_functions_use_degrees() {
        assert_eq!(calculate("sqrt(16)").unwrap(), "4");
        assert_eq!(calculate("cos(0)").unwrap(), "1");
        assert!((evaluate("sin(30)").unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_errors_are_reported() {
        assert_eq!(calculate(""), Err(CalcError::Empty));
        assert_eq!(calculate("1 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(calculate("2 $ 3"), Err(CalcError::UnexpectedChar('$', 2)));
        assert_eq!(
            calculate("foo(1)"),
            Err(CalcError::UnknownFunction("foo".to_string()))
        );
        assert_eq!(
            calculate("1 2"),
            Err(CalcError::UnexpectedToken("2".to_string(), 2))
        );
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(calculate(&deep), Err(CalcError::TooDeep(MAX_DEPTH)));
        assert_eq!(calculate(&"-".repeat(100_000)), Err(CalcError::TooDeep(MAX_DEPTH)));

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(calculate(&shallow).unwrap(), "1");
    }
}
