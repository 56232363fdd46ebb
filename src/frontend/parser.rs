use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parse_error::ParseError;
use crate::frontend::token::Token;
use crate::lang::{BinaryOperator, Call, Expression, Function, Program, Statement};

/// Recursive-descent parser.
///
/// Consumes lexed `Spanned` tokens and produces a `Program`. Binary operators
/// are left-associative with three precedence levels: comparison, additive,
/// multiplicative.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token, used for errors at end of
    /// input.
    last_span: Option<Span>,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            last_span: None,
        }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&Token> {
        self.current().map(|s| &s.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let spanned = self.tokens.get(self.pos)?;
        self.last_span = Some(spanned.span);
        self.pos += 1;
        Some(spanned.token.clone())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Eof))
    }

    /// Builds an error at the current token, or the last consumed one past
    /// the end of input.
    fn error(&self, message: impl Into<String>) -> ParseError {
        let span = self
            .current()
            .map(|s| s.span)
            .or(self.last_span)
            .unwrap_or(Span { line: 1, col: 1 });
        ParseError::new(message, span.line, span.col)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => self.error(format!("expected {}, found {}", expected, token)),
            None => self.error(format!("expected {}, found end of input", expected)),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.check(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Parses a complete program: a sequence of function declarations.
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut functions = Vec::new();

        while !self.at_eof() {
            if !self.check(&Token::Fn) {
                return Err(self.unexpected("'fn'"));
            }
            functions.push(self.parse_function()?);
        }

        Ok(Program::new(functions))
    }

    /// ```text
    /// fn name(a, b) { ... }
    /// ```
    fn parse_function(&mut self) -> Result<Function, ParseError> {
        self.expect(Token::Fn)?;
        let name = self.expect_ident("function name")?;

        self.expect(Token::LParen)?;
        let mut parameters = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                parameters.push(self.expect_ident("parameter name")?);
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;

        let body = self.parse_block()?;
        Ok(Function::new(name, parameters, body))
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect(Token::LBrace)?;

        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.at_eof() {
                return Err(self.error("unterminated block, expected '}'"));
            }
            body.push(self.parse_statement()?);
        }

        self.expect(Token::RBrace)?;
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let statement = match self.peek() {
            Some(Token::Let) => {
                self.advance();
                let name = self.expect_ident("variable name")?;
                self.expect(Token::Assign)?;
                let value = self.parse_expression()?;
                Statement::Let { name, value }
            }
            Some(Token::When) => {
                self.advance();
                self.expect(Token::LParen)?;
                let condition = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = if self.check(&Token::LBrace) {
                    self.parse_block()?
                } else {
                    vec![self.parse_statement()?]
                };
                Statement::When { condition, body }
            }
            Some(Token::Return) => {
                self.advance();
                Statement::Return(self.parse_expression()?)
            }
            Some(Token::Fn) => return Err(self.error("nested functions are not allowed")),
            _ => return Err(self.unexpected("statement")),
        };

        if self.check(&Token::Semicolon) {
            self.advance();
        }
        Ok(statement)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;

        while let Some(operator) = self.peek().and_then(comparison_operator) {
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_term()?;

        loop {
            let operator = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Plus,
                Some(Token::Minus) => BinaryOperator::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expression::binary(left, operator, right);
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match self.peek() {
                Some(Token::Star) => BinaryOperator::Times,
                Some(Token::Slash) => BinaryOperator::Divide,
                Some(Token::Percent) => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::binary(left, operator, right);
        }

        Ok(left)
    }

    /// Only integer literals can be negated.
    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        if !self.check(&Token::Minus) {
            return self.parse_primary();
        }

        match self.peek_next() {
            Some(Token::Integer(n)) => {
                let value = i32::try_from(-n)
                    .map_err(|_| self.error(format!("integer literal -{} out of range", n)))?;
                self.advance();
                self.advance();
                Ok(Expression::Integer(value))
            }
            _ => {
                self.advance();
                Err(self.unexpected("integer literal after '-'"))
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.peek() {
            Some(Token::Integer(n)) => {
                let value = i32::try_from(*n)
                    .map_err(|_| self.error(format!("integer literal {} out of range", n)))?;
                self.advance();
                Ok(Expression::Integer(value))
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();

                if self.check(&Token::LParen) {
                    let arguments = self.parse_arguments()?;
                    Ok(Expression::Call(Call::new(name, arguments)))
                } else {
                    Ok(Expression::Identifier(name))
                }
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(Token::LParen)?;

        let mut arguments = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if self.check(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.expect(Token::RParen)?;
        Ok(arguments)
    }
}

fn comparison_operator(token: &Token) -> Option<BinaryOperator> {
    match token {
        Token::EqEq => Some(BinaryOperator::DoubleEqual),
        Token::Lt => Some(BinaryOperator::LessThan),
        Token::LtEq => Some(BinaryOperator::LessThanOrEqual),
        Token::Gt => Some(BinaryOperator::GreaterThan),
        Token::GtEq => Some(BinaryOperator::GreaterThanOrEqual),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::parse;
    use crate::lang::{BinaryOperator, Expression, Statement};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn expression(source: &str) -> Expression {
        let program = parse(&format!("fn main() {{ return {} }}", source)).unwrap();
        match &program.functions[0].body[0] {
            Statement::Return(e) => e.clone(),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_function_declarations() {
        let program = parse(indoc! {"
            fn add(a, b) { return a + b }
            fn main() { return add(4, 5) }
        "})
        .unwrap();

        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[0].name, "add");
        assert_eq!(program.functions[0].parameters, vec!["a", "b"]);
        assert_eq!(program.functions[1].parameters, Vec::<String>::new());
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(expression("1 + 2 * 3").to_string(), "(1 + (2 * 3))");
        assert_eq!(expression("10 - 4 - 3").to_string(), "((10 - 4) - 3)");
        assert_eq!(expression("a + 1 < b * 2").to_string(), "((a + 1) < (b * 2))");
        assert_eq!(expression("(1 + 2) * 3").to_string(), "((1 + 2) * 3)");
    }

    #[test]
    fn test_negative_literal() {
        assert_eq!(expression("-5"), Expression::Integer(-5));
        assert_eq!(expression("-2147483648"), Expression::Integer(i32::MIN));
        assert_eq!(
            expression("3 - -2"),
            Expression::binary(
                Expression::Integer(3),
                BinaryOperator::Minus,
                Expression::Integer(-2)
            )
        );
    }

    #[test]
    fn test_call_expression() {
        assert_eq!(
            expression("f(x, g(1))"),
            Expression::call(
                "f",
                vec![
                    Expression::identifier("x"),
                    Expression::call("g", vec![Expression::Integer(1)]),
                ]
            )
        );
    }

    #[test]
    fn test_statements() {
        let program = parse(indoc! {"
            fn main() {
                let a = 1;
                when (a > 0) { let b = 2 }
                when (a == 1) return 7
                return a
            }
        "})
        .unwrap();

        let body = &program.functions[0].body;
        assert_eq!(body.len(), 4);
        assert!(matches!(&body[0], Statement::Let { name, .. } if name == "a"));
        assert!(matches!(&body[1], Statement::When { body, .. } if body.len() == 1));
        assert!(matches!(&body[2], Statement::When { body, .. } if matches!(body[0], Statement::Return(_))));
        assert_eq!(body[3], Statement::Return(Expression::identifier("a")));
    }

    #[test]
    fn test_nested_function_rejected() {
        let err = parse(indoc! {"
            fn main() {
                fn inner() { return 1 }
                return 0
            }
        "})
        .unwrap_err();

        assert_eq!(err.message, "nested functions are not allowed");
        assert_eq!((err.line, err.col), (2, 5));
    }

    #[test]
    fn test_error_locations() {
        let err = parse("fn main() { return }").unwrap_err();
        assert_eq!((err.line, err.col), (1, 20));

        let err = parse("fn main() { return 1").unwrap_err();
        assert!(err.message.contains("'}'"), "{}", err.message);

        let err = parse("let x = 1").unwrap_err();
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn test_literal_out_of_range() {
        assert!(parse("fn main() { return 2147483648 }").is_err());
    }
}
