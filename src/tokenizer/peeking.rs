use std::io::Read;

use super::{LexError, Lexer, Token};

/// Wraps a [`Lexer`] with single token lookahead, letting the parser branch on a token before consuming it.
pub struct PeekingLexer<R> {
    lexer: Lexer<R>,
    peeked: Option<Token>,
    line: usize,
}

impl<R: Read> PeekingLexer<R> {
    pub fn new(lexer: Lexer<R>) -> Self {
        Self {
            lexer,
            peeked: None,
            line: 1,
        }
    }

    /// Line of the peeked token if there is one, otherwise the current line of the underlying lexer.
    pub fn line(&self) -> usize {
        match self.peeked {
            Some(_) => self.line,
            None => self.lexer.line(),
        }
    }

    pub fn peek(&mut self) -> Result<&Token, LexError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => {
                let token = self.lexer.next_token()?;
                self.line = self.lexer.line();
                token
            }
        };
        Ok(self.peeked.insert(token))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    pub fn discard(&mut self) {
        self.peeked = None;
    }
}
