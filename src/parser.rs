use std::{io::Read, rc::Rc};

use crate::{
    ast::{
        Expression, FunctionDecl, InfixOperator, Literal, LogicalOperator, MethodDecl,
        PrefixOperator, Program, Statement,
    },
    resolver::ScopeStack,
    tokenizer::{LexError, Lexer, PeekingLexer, Token, TokenType},
};

#[derive(Debug)]
pub struct ParseErrors(pub Vec<ParseError>);

impl std::error::Error for ParseErrors {}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Found {} errors during parsing", self.0.len())?;
        for error in &self.0 {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        ParseErrors(vec![error])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. } => Some(*line),
            ParseError::Lex(_) => None,
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser that resolves the scope level of every variable reference as it goes.
pub struct Parser<R> {
    lexer: PeekingLexer<R>,
    scopes: ScopeStack,
}

impl<R: Read> Parser<R> {
    pub fn new(lexer: PeekingLexer<R>) -> Self {
        Self {
            lexer,
            scopes: ScopeStack::new(),
        }
    }

    /// Parses the next top-level statement, `None` once the source is exhausted. After a failure the
    /// offending statement is skipped so that parsing can resume with the one following it.
    pub fn next_statement(&mut self) -> ParseResult<Option<Statement>> {
        if self.peek_type()? == TokenType::Eof {
            return Ok(None);
        }
        match self.declaration() {
            Ok(statement) => Ok(Some(statement)),
            Err(err) => {
                self.synchronize()?;
                Err(err)
            }
        }
    }

    /// Parses every remaining statement, collecting one error per malformed statement.
    pub fn program(mut self) -> Result<Program, ParseErrors> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();
        loop {
            match self.next_statement() {
                Ok(Some(statement)) => statements.push(statement),
                Ok(None) => break,
                Err(err @ ParseError::Lex(_)) => {
                    errors.push(err);
                    break;
                }
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "parsing failed");
            return Err(ParseErrors(errors));
        }
        tracing::debug!(statements = statements.len(), "parsed program");
        Ok(Program(statements))
    }

    fn synchronize(&mut self) -> ParseResult<()> {
        loop {
            match self.lexer.next_token()?.token_type {
                TokenType::Eof | TokenType::Semicolon | TokenType::RightBrace => return Ok(()),
                _ => {}
            }
        }
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.scopes.begin();
        let result = f(self);
        self.scopes.end();
        result
    }

    fn declaration(&mut self) -> ParseResult<Statement> {
        match self.peek_type()? {
            TokenType::Var => self.var_declaration(),
            _ => self.statement(),
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Statement> {
        self.expect(&[TokenType::Var])?;
        let name = self.identifier()?;
        self.declare(&name)?;
        if self.peek_type()? == TokenType::Semicolon {
            self.lexer.discard();
            return Ok(Statement::Declaration {
                name,
                initializer: None,
            });
        }
        self.expect(&[TokenType::Equal])?;
        let initializer = self.logical()?;
        self.expect(&[TokenType::Semicolon])?;
        Ok(Statement::Declaration {
            name,
            initializer: Some(initializer),
        })
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek_type()? {
            TokenType::LeftBrace => self.scoped(|parser| Ok(Statement::Block(parser.block()?))),
            TokenType::If => self.if_statement(),
            TokenType::While => self.while_statement(),
            TokenType::Semicolon => {
                self.lexer.discard();
                Ok(Statement::Noop)
            }
            TokenType::Function => self.function(),
            TokenType::Return => self.return_statement(),
            TokenType::Break => {
                self.lexer.discard();
                self.expect(&[TokenType::Semicolon])?;
                Ok(Statement::Break)
            }
            TokenType::Continue => {
                self.lexer.discard();
                self.expect(&[TokenType::Semicolon])?;
                Ok(Statement::Continue)
            }
            TokenType::Import => self.import(),
            TokenType::Export => self.export(),
            _ => self.expression_statement(),
        }
    }

    fn function(&mut self) -> ParseResult<Statement> {
        self.expect(&[TokenType::Function])?;
        // Declared in the enclosing scope so that the body can refer to the function itself.
        let name = self.identifier()?;
        self.declare(&name)?;
        let decl = self.scoped(|parser| {
            let params = parser.parameters()?;
            for param in &params {
                parser.declare(param)?;
            }
            let body = parser.block()?;
            Ok(FunctionDecl { name, params, body })
        })?;
        Ok(Statement::Function(Rc::new(decl)))
    }

    fn return_statement(&mut self) -> ParseResult<Statement> {
        self.expect(&[TokenType::Return])?;
        if self.peek_type()? == TokenType::Semicolon {
            self.lexer.discard();
            return Ok(Statement::Return(None));
        }
        let value = self.logical()?;
        self.expect(&[TokenType::Semicolon])?;
        Ok(Statement::Return(Some(value)))
    }

    fn import(&mut self) -> ParseResult<Statement> {
        self.expect(&[TokenType::Import])?;
        let source = self.primary()?;
        self.expect(&[TokenType::Semicolon])?;
        match source {
            Expression::Variable { .. } | Expression::Literal(Literal::String(_)) => {
                Ok(Statement::Import(source))
            }
            other => Err(self.error(format!("{other} is not a valid import source"))),
        }
    }

    fn export(&mut self) -> ParseResult<Statement> {
        self.expect(&[TokenType::Export])?;
        let value = self.assignment()?;
        let token = self.expect(&[TokenType::Semicolon, TokenType::As])?;
        match (token.token_type, value) {
            (TokenType::Semicolon, Expression::Variable { name, level }) => {
                Ok(Statement::Export {
                    name: name.clone(),
                    value: Expression::Variable { name, level },
                })
            }
            (TokenType::Semicolon, other) => {
                Err(self.error(format!("{other} cannot be exported without a name")))
            }
            (_, value) => {
                let name = self.identifier()?;
                self.expect(&[TokenType::Semicolon])?;
                Ok(Statement::Export { name, value })
            }
        }
    }

    fn while_statement(&mut self) -> ParseResult<Statement> {
        self.expect(&[TokenType::While])?;
        let condition = self.logical()?;
        let body = self.scoped(|parser| parser.block())?;
        Ok(Statement::While(condition, Box::new(Statement::Block(body))))
    }

    fn if_statement(&mut self) -> ParseResult<Statement> {
        self.expect(&[TokenType::If])?;
        let condition = self.logical()?;
        let then_branch = self.statement()?;
        if self.peek_type()? != TokenType::Else {
            return Ok(Statement::If(condition, Box::new(then_branch), None));
        }
        self.lexer.discard();
        let else_branch = self.statement()?;
        Ok(Statement::If(
            condition,
            Box::new(then_branch),
            Some(Box::new(else_branch)),
        ))
    }

    /// Parses `{ ... }` without pushing a scope, callers decide which scope the statements belong to.
    fn block(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(&[TokenType::LeftBrace])?;
        let mut statements = Vec::new();
        loop {
            match self.peek_type()? {
                TokenType::RightBrace => {
                    self.lexer.discard();
                    return Ok(statements);
                }
                TokenType::Eof => return Err(self.error("expected } before end of file")),
                _ => statements.push(self.declaration()?),
            }
        }
    }

    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.assignment()?;
        self.expect(&[TokenType::Semicolon])?;
        Ok(Statement::Expression(expr))
    }

    fn assignment(&mut self) -> ParseResult<Expression> {
        let expr = self.logical()?;
        if self.peek_type()? != TokenType::Equal {
            return Ok(expr);
        }
        self.lexer.discard();
        match expr {
            Expression::Variable { name, level } => {
                let value = self.assignment()?;
                Ok(Expression::Assignment {
                    name,
                    level,
                    value: Box::new(value),
                })
            }
            Expression::GetProp { target, property } => {
                let value = self.assignment()?;
                Ok(Expression::SetProp {
                    target,
                    property,
                    value: Box::new(value),
                })
            }
            Expression::GetIndex { target, index } => {
                let value = self.assignment()?;
                Ok(Expression::SetIndex {
                    target,
                    index,
                    value: Box::new(value),
                })
            }
            _ => Err(self.error("invalid left hand side of assignment")),
        }
    }

    fn logical(&mut self) -> ParseResult<Expression> {
        let mut expr = self.equality()?;
        loop {
            let op = match self.peek_type()? {
                TokenType::And => LogicalOperator::And,
                TokenType::Or => LogicalOperator::Or,
                _ => return Ok(expr),
            };
            self.lexer.discard();
            let right = self.equality()?;
            expr = Expression::Logical(Box::new(expr), op, Box::new(right));
        }
    }

    fn binary(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Expression>,
        operator: fn(TokenType) -> Option<InfixOperator>,
    ) -> ParseResult<Expression> {
        let mut expr = operand(self)?;
        while let Some(op) = operator(self.peek_type()?) {
            self.lexer.discard();
            let right = operand(self)?;
            expr = Expression::Infix(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expression> {
        self.binary(Self::comparison, |token_type| match token_type {
            TokenType::EqualEqual => Some(InfixOperator::Equal),
            TokenType::BangEqual => Some(InfixOperator::NotEqual),
            _ => None,
        })
    }

    fn comparison(&mut self) -> ParseResult<Expression> {
        self.binary(Self::term, |token_type| match token_type {
            TokenType::Less => Some(InfixOperator::LessThan),
            TokenType::LessEqual => Some(InfixOperator::LessThanOrEqual),
            TokenType::Greater => Some(InfixOperator::GreaterThan),
            TokenType::GreaterEqual => Some(InfixOperator::GreaterThanOrEqual),
            _ => None,
        })
    }

    fn term(&mut self) -> ParseResult<Expression> {
        self.binary(Self::factor, |token_type| match token_type {
            TokenType::Plus => Some(InfixOperator::Plus),
            TokenType::Minus => Some(InfixOperator::Minus),
            _ => None,
        })
    }

    fn factor(&mut self) -> ParseResult<Expression> {
        self.binary(Self::prefix, |token_type| match token_type {
            TokenType::Star => Some(InfixOperator::Multiply),
            TokenType::Slash => Some(InfixOperator::Divide),
            _ => None,
        })
    }

    fn prefix(&mut self) -> ParseResult<Expression> {
        let operator = match self.peek_type()? {
            TokenType::Bang => PrefixOperator::Not,
            TokenType::Minus => PrefixOperator::Negate,
            _ => return self.call(),
        };
        self.lexer.discard();
        let operand = self.prefix()?;
        Ok(Expression::Prefix(operator, Box::new(operand)))
    }

    fn call(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            expr = match self.peek_type()? {
                TokenType::LeftParen => {
                    self.lexer.discard();
                    let args = self.arguments(TokenType::RightParen)?;
                    Expression::Call(Box::new(expr), args)
                }
                TokenType::LeftBracket => {
                    self.lexer.discard();
                    let index = self.logical()?;
                    self.expect(&[TokenType::RightBracket])?;
                    Expression::GetIndex {
                        target: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                TokenType::Dot => {
                    self.lexer.discard();
                    let property = self.expect(&[TokenType::Identifier, TokenType::String])?;
                    Expression::GetProp {
                        target: Box::new(expr),
                        property: property.lexeme,
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    /// Comma separated expressions up to and including `close`, the opening token is already consumed.
    fn arguments(&mut self, close: TokenType) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();
        loop {
            if self.peek_type()? == close {
                self.lexer.discard();
                return Ok(args);
            }
            args.push(self.logical()?);
            match self.peek_type()? {
                TokenType::Comma => self.lexer.discard(),
                t if t == close => {}
                _ => {
                    let token = self.lexer.next_token()?;
                    return Err(self.error(format!("expected , or {close} but found {token}")));
                }
            }
        }
    }

    fn parameters(&mut self) -> ParseResult<Vec<String>> {
        self.expect(&[TokenType::LeftParen])?;
        let mut params = Vec::new();
        if self.peek_type()? == TokenType::RightParen {
            self.lexer.discard();
            return Ok(params);
        }
        loop {
            params.push(self.identifier()?);
            let token = self.expect(&[TokenType::Comma, TokenType::RightParen])?;
            if token.token_type == TokenType::RightParen {
                return Ok(params);
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        let token = self.lexer.next_token()?;
        let expr = match token.token_type {
            TokenType::Identifier => Expression::Variable {
                level: self.scopes.resolve(&token.lexeme),
                name: token.lexeme,
            },
            TokenType::String => Expression::Literal(Literal::String(token.lexeme)),
            TokenType::Integer => match token.lexeme.parse() {
                Ok(n) => Expression::Literal(Literal::Integer(n)),
                Err(_) => {
                    return Err(self.error(format!("invalid integer literal: {}", token.lexeme)))
                }
            },
            TokenType::Float => {
                let lexeme = if token.lexeme.ends_with('.') {
                    format!("{}0", token.lexeme)
                } else {
                    token.lexeme.clone()
                };
                match lexeme.parse() {
                    Ok(n) => Expression::Literal(Literal::Float(n)),
                    Err(_) => {
                        return Err(self.error(format!("invalid float literal: {}", token.lexeme)))
                    }
                }
            }
            TokenType::Boolean => Expression::Literal(Literal::Boolean(token.lexeme == "true")),
            TokenType::Nil => Expression::Literal(Literal::Nil),
            TokenType::LeftParen => {
                let expr = self.logical()?;
                self.expect(&[TokenType::RightParen])?;
                Expression::Grouping(Box::new(expr))
            }
            TokenType::LeftBracket => Expression::List(self.arguments(TokenType::RightBracket)?),
            TokenType::Object => Expression::Object(self.object_properties()?),
            TokenType::Function => self.method()?,
            _ => return Err(self.error(format!("unexpected token: {token}"))),
        };
        Ok(expr)
    }

    /// Method literals get a scope stack of their own, they cannot capture the locals around them.
    fn method(&mut self) -> ParseResult<Expression> {
        let params = self.parameters()?;
        let method_scopes = self.scopes.for_method();
        let enclosing = std::mem::replace(&mut self.scopes, method_scopes);
        let body = self.scoped(|parser| {
            for param in &params {
                parser.declare(param)?;
            }
            parser.block()
        });
        self.scopes = enclosing;
        Ok(Expression::Method(Rc::new(MethodDecl {
            params,
            body: body?,
        })))
    }

    fn object_properties(&mut self) -> ParseResult<Vec<(String, Expression)>> {
        self.expect(&[TokenType::LeftBrace])?;
        let mut properties = Vec::new();
        loop {
            if self.peek_type()? == TokenType::RightBrace {
                self.lexer.discard();
                return Ok(properties);
            }
            let key = self.expect(&[TokenType::Identifier, TokenType::String])?;
            self.expect(&[TokenType::Colon])?;
            properties.push((key.lexeme, self.logical()?));
            let token = self.expect(&[TokenType::Comma, TokenType::RightBrace])?;
            if token.token_type == TokenType::RightBrace {
                return Ok(properties);
            }
        }
    }

    fn peek_type(&mut self) -> ParseResult<TokenType> {
        Ok(self.lexer.peek()?.token_type)
    }

    fn expect(&mut self, token_types: &[TokenType]) -> ParseResult<Token> {
        let token = self.lexer.next_token()?;
        if token_types.contains(&token.token_type) {
            return Ok(token);
        }
        let expected = token_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(self.error(format!("expected {expected} but found {token}")))
    }

    fn identifier(&mut self) -> ParseResult<String> {
        Ok(self.expect(&[TokenType::Identifier])?.lexeme)
    }

    fn declare(&mut self, name: &str) -> ParseResult<()> {
        self.scopes
            .declare(name)
            .map_err(|err| self.error(err.to_string()))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.lexer.line(),
            message: message.into(),
        }
    }
}

pub fn parse<R: Read>(source: R) -> Result<Program, ParseErrors> {
    Parser::new(PeekingLexer::new(Lexer::new(source))).program()
}

pub fn parse_str(source: &str) -> Result<Program, ParseErrors> {
    parse(source.as_bytes())
}
