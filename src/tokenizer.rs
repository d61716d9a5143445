mod peeking;

use std::io::{ErrorKind, Read};

pub use self::peeking::PeekingLexer;

/// Default size of the internal read buffer of a [`Lexer`]. Callers should not rely on this value beyond it
/// being the default; use [`Lexer::with_buffer_length`] when a specific size matters.
pub const LEXER_BUFFER_LENGTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Minus,
    Plus,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,

    // Literals
    Identifier,
    String,
    Integer,
    Float,
    Boolean,

    // Keywords
    If,
    Else,
    While,
    Return,
    Break,
    Continue,
    Function,
    Var,
    Nil,
    Import,
    As,
    Export,
    Object,

    Illegal,
    Eof,
}

impl TokenType {
    fn lexeme(&self) -> &'static str {
        match self {
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBrace => "{",
            TokenType::RightBrace => "}",
            TokenType::LeftBracket => "[",
            TokenType::RightBracket => "]",
            TokenType::Comma => ",",
            TokenType::Dot => ".",
            TokenType::Colon => ":",
            TokenType::Semicolon => ";",
            TokenType::Minus => "-",
            TokenType::Plus => "+",
            TokenType::Slash => "/",
            TokenType::Star => "*",
            TokenType::Bang => "!",
            TokenType::BangEqual => "!=",
            TokenType::Equal => "=",
            TokenType::EqualEqual => "==",
            TokenType::Greater => ">",
            TokenType::GreaterEqual => ">=",
            TokenType::Less => "<",
            TokenType::LessEqual => "<=",
            TokenType::And => "and",
            TokenType::Or => "or",
            TokenType::If => "if",
            TokenType::Else => "else",
            TokenType::While => "while",
            TokenType::Return => "return",
            TokenType::Break => "break",
            TokenType::Continue => "continue",
            TokenType::Function => "function",
            TokenType::Var => "var",
            TokenType::Nil => "nil",
            TokenType::Import => "import",
            TokenType::As => "as",
            TokenType::Export => "export",
            TokenType::Object => "Object",
            TokenType::Eof => "",
            TokenType::Identifier
            | TokenType::String
            | TokenType::Integer
            | TokenType::Float
            | TokenType::Boolean
            | TokenType::Illegal => "",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Identifier => write!(f, "identifier"),
            TokenType::String => write!(f, "string"),
            TokenType::Integer => write!(f, "integer"),
            TokenType::Float => write!(f, "float"),
            TokenType::Boolean => write!(f, "boolean"),
            TokenType::Illegal => write!(f, "illegal"),
            TokenType::Eof => write!(f, "end of file"),
            other => write!(f, "{}", other.lexeme()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
}

impl Token {
    pub fn new(token_type: TokenType) -> Self {
        Self {
            token_type,
            lexeme: token_type.lexeme().to_string(),
        }
    }

    pub fn with_lexeme(token_type: TokenType, lexeme: impl Into<String>) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.token_type {
            TokenType::Eof => write!(f, "end of file"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("illegal lexer buffer length: {0}")]
    InvalidBufferLength(usize),
}

/// Scans Squeak source code read from a single reader. Bytes are pulled into a reusable buffer on demand, so the
/// whole source never has to be in memory at once.
pub struct Lexer<R> {
    source: R,
    buffer: Vec<u8>,
    cursor: usize,
    length: usize,
    line: usize,
}

impl<R: Read> Lexer<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: vec![0; LEXER_BUFFER_LENGTH],
            cursor: 0,
            length: 0,
            line: 1,
        }
    }

    pub fn with_buffer_length(source: R, length: usize) -> Result<Self, LexError> {
        if length < 1 {
            return Err(LexError::InvalidBufferLength(length));
        }
        Ok(Self {
            buffer: vec![0; length],
            ..Self::new(source)
        })
    }

    /// Line of the most recently consumed character, starting at 1.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the next token of the source. Unrecognized input yields [`TokenType::Illegal`] rather than an
    /// error, and an exhausted source yields [`TokenType::Eof`] on every subsequent call. Only failures of the
    /// underlying reader are reported as errors.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_ignored()?;
        let Some(c) = self.peek_byte()? else {
            return Ok(Token::new(TokenType::Eof));
        };
        if c.is_ascii_digit() {
            return self.number();
        }
        if c.is_ascii_alphabetic() {
            return self.word();
        }
        self.symbol()
    }

    fn number(&mut self) -> Result<Token, LexError> {
        let integer = self.take_while(|c| c.is_ascii_digit())?;
        if self.peek_byte()? != Some(b'.') {
            return Ok(Token::with_lexeme(TokenType::Integer, integer));
        }
        self.bump()?;
        // The fraction may be empty, "120." is a legal float.
        let fraction = self.take_while(|c| c.is_ascii_digit())?;
        Ok(Token::with_lexeme(
            TokenType::Float,
            format!("{integer}.{fraction}"),
        ))
    }

    fn word(&mut self) -> Result<Token, LexError> {
        let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_')?;
        let token = match word.as_str() {
            "true" | "false" => Token::with_lexeme(TokenType::Boolean, word),
            _ => match keyword(&word) {
                Some(token_type) => Token::new(token_type),
                None => Token::with_lexeme(TokenType::Identifier, word),
            },
        };
        Ok(token)
    }

    fn symbol(&mut self) -> Result<Token, LexError> {
        let Some(c) = self.bump()? else {
            return Ok(Token::new(TokenType::Eof));
        };
        let token = match c {
            b'(' => Token::new(TokenType::LeftParen),
            b')' => Token::new(TokenType::RightParen),
            b'{' => Token::new(TokenType::LeftBrace),
            b'}' => Token::new(TokenType::RightBrace),
            b'[' => Token::new(TokenType::LeftBracket),
            b']' => Token::new(TokenType::RightBracket),
            b',' => Token::new(TokenType::Comma),
            b'.' => Token::new(TokenType::Dot),
            b':' => Token::new(TokenType::Colon),
            b';' => Token::new(TokenType::Semicolon),
            b'-' => Token::new(TokenType::Minus),
            b'+' => Token::new(TokenType::Plus),
            b'/' => Token::new(TokenType::Slash),
            b'*' => Token::new(TokenType::Star),
            b'!' => self.either(b'=', TokenType::BangEqual, TokenType::Bang)?,
            b'=' => self.either(b'=', TokenType::EqualEqual, TokenType::Equal)?,
            b'<' => self.either(b'=', TokenType::LessEqual, TokenType::Less)?,
            b'>' => self.either(b'=', TokenType::GreaterEqual, TokenType::Greater)?,
            b'&' => self.pair(c, TokenType::And)?,
            b'|' => self.pair(c, TokenType::Or)?,
            b'"' => self.string()?,
            other => Token::with_lexeme(
                TokenType::Illegal,
                String::from_utf8_lossy(&[other]).into_owned(),
            ),
        };
        Ok(token)
    }

    /// Produces `matched` if the next character is `expected`, otherwise `single`.
    fn either(
        &mut self,
        expected: u8,
        matched: TokenType,
        single: TokenType,
    ) -> Result<Token, LexError> {
        if self.peek_byte()? == Some(expected) {
            self.bump()?;
            return Ok(Token::new(matched));
        }
        Ok(Token::new(single))
    }

    /// `&&` and `||` have no single-character form; anything else following the first character is illegal.
    fn pair(&mut self, first: u8, token_type: TokenType) -> Result<Token, LexError> {
        match self.bump()? {
            Some(second) if second == first => Ok(Token::new(token_type)),
            Some(second) => Ok(Token::with_lexeme(
                TokenType::Illegal,
                String::from_utf8_lossy(&[first, second]).into_owned(),
            )),
            None => Ok(Token::with_lexeme(
                TokenType::Illegal,
                String::from_utf8_lossy(&[first]).into_owned(),
            )),
        }
    }

    fn string(&mut self) -> Result<Token, LexError> {
        let literal = self.take_while(|c| c != b'"')?;
        match self.bump()? {
            Some(_) => Ok(Token::with_lexeme(TokenType::String, literal)),
            None => Ok(Token::with_lexeme(
                TokenType::Illegal,
                format!("\"{literal}"),
            )),
        }
    }

    fn skip_ignored(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.peek_byte()? {
            match c {
                b'#' => {
                    self.take_while(|c| c != b'\n')?;
                }
                c if c.is_ascii_whitespace() => {
                    self.bump()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn take_while(&mut self, predicate: impl Fn(u8) -> bool) -> Result<String, LexError> {
        let mut bytes = Vec::new();
        while let Some(c) = self.peek_byte()? {
            if !predicate(c) {
                break;
            }
            bytes.push(c);
            self.bump()?;
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, LexError> {
        if self.cursor >= self.length && !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buffer[self.cursor]))
    }

    fn bump(&mut self) -> Result<Option<u8>, LexError> {
        let Some(c) = self.peek_byte()? else {
            return Ok(None);
        };
        self.cursor += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Ok(Some(c))
    }

    /// Refills the buffer from the source, reporting whether any bytes were read.
    fn fill(&mut self) -> Result<bool, LexError> {
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(read) => {
                    self.cursor = 0;
                    self.length = read;
                    return Ok(read > 0);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn keyword(word: &str) -> Option<TokenType> {
    let token_type = match word {
        "if" => TokenType::If,
        "else" => TokenType::Else,
        "and" => TokenType::And,
        "or" => TokenType::Or,
        "while" => TokenType::While,
        "return" => TokenType::Return,
        "break" => TokenType::Break,
        "continue" => TokenType::Continue,
        "function" => TokenType::Function,
        "var" => TokenType::Var,
        "nil" => TokenType::Nil,
        "import" => TokenType::Import,
        "as" => TokenType::As,
        "export" => TokenType::Export,
        "Object" => TokenType::Object,
        _ => return None,
    };
    Some(token_type)
}

/// Scans the whole source, the final token is always [`TokenType::Eof`].
pub fn tokens(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source.as_bytes());
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.token_type == TokenType::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn single(source: &str) -> Token {
        let tokens = tokens(source).unwrap();
        assert_eq!(tokens.len(), 2, "expected one token in {source:?}: {tokens:?}");
        tokens.into_iter().next().unwrap()
    }

    #[test]
    fn test_operators() {
        let cases = [
            ("(", TokenType::LeftParen),
            (")", TokenType::RightParen),
            ("{", TokenType::LeftBrace),
            ("}", TokenType::RightBrace),
            ("[", TokenType::LeftBracket),
            ("]", TokenType::RightBracket),
            (",", TokenType::Comma),
            (".", TokenType::Dot),
            (":", TokenType::Colon),
            (";", TokenType::Semicolon),
            ("-", TokenType::Minus),
            ("+", TokenType::Plus),
            ("/", TokenType::Slash),
            ("*", TokenType::Star),
            ("!", TokenType::Bang),
            ("!=", TokenType::BangEqual),
            ("=", TokenType::Equal),
            ("==", TokenType::EqualEqual),
            (">", TokenType::Greater),
            (">=", TokenType::GreaterEqual),
            ("<", TokenType::Less),
            ("<=", TokenType::LessEqual),
        ];
        for (source, expected) in cases {
            let token = single(source);
            assert_eq!(token.token_type, expected);
            assert_eq!(token.lexeme, source);
        }
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(single("&&"), Token::new(TokenType::And));
        assert_eq!(single("||"), Token::new(TokenType::Or));
        assert_eq!(single("and"), Token::new(TokenType::And));
        assert_eq!(single("or"), Token::new(TokenType::Or));
    }

    #[test]
    fn test_incomplete_logical_operator_is_illegal() {
        assert_eq!(
            single("&x"),
            Token::with_lexeme(TokenType::Illegal, "&x")
        );
        assert_eq!(single("|"), Token::with_lexeme(TokenType::Illegal, "|"));
    }

    #[test]
    fn test_keywords() {
        let source = "if else while return break continue function var nil import as export Object";
        let expected = vec![
            TokenType::If,
            TokenType::Else,
            TokenType::While,
            TokenType::Return,
            TokenType::Break,
            TokenType::Continue,
            TokenType::Function,
            TokenType::Var,
            TokenType::Nil,
            TokenType::Import,
            TokenType::As,
            TokenType::Export,
            TokenType::Object,
            TokenType::Eof,
        ];
        let actual: Vec<_> = tokens(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_booleans_and_identifiers() {
        assert_eq!(
            single("true"),
            Token::with_lexeme(TokenType::Boolean, "true")
        );
        assert_eq!(
            single("false"),
            Token::with_lexeme(TokenType::Boolean, "false")
        );
        assert_eq!(
            single("status_code2"),
            Token::with_lexeme(TokenType::Identifier, "status_code2")
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(single("1024"), Token::with_lexeme(TokenType::Integer, "1024"));
        assert_eq!(single("3.14"), Token::with_lexeme(TokenType::Float, "3.14"));
        assert_eq!(single("120."), Token::with_lexeme(TokenType::Float, "120."));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            single("\"hello world\""),
            Token::with_lexeme(TokenType::String, "hello world")
        );
        assert_eq!(single("\"\""), Token::with_lexeme(TokenType::String, ""));
        assert_eq!(
            single("\"open"),
            Token::with_lexeme(TokenType::Illegal, "\"open")
        );
    }

    #[test]
    fn test_illegal_character() {
        assert_eq!(single("@"), Token::with_lexeme(TokenType::Illegal, "@"));
    }

    #[test]
    fn test_ignored_input_yields_eof() {
        for source in ["", "   \t\n  ", "# a comment", "# one\n   # two\n"] {
            assert_eq!(tokens(source).unwrap(), vec![Token::new(TokenType::Eof)]);
        }
    }

    #[test]
    fn test_comment_between_tokens() {
        let actual: Vec<_> = tokens("var x = 1; # trailing\nx;")
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect();
        assert_eq!(
            actual,
            vec![
                TokenType::Var,
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Integer,
                TokenType::Semicolon,
                TokenType::Identifier,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_line_counting() {
        let mut lexer = Lexer::new("var\nit\nsnow\n\n\n\n".as_bytes());
        while lexer.next_token().unwrap().token_type != TokenType::Eof {}
        assert_eq!(lexer.line(), 7);
    }

    #[test]
    fn test_small_buffer_refills() {
        let source = "var message = \"buffered\"; # comment\nmessage >= 12.5;";
        let mut lexer = Lexer::with_buffer_length(source.as_bytes(), 1).unwrap();
        let mut actual = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.token_type == TokenType::Eof {
                break;
            }
            actual.push(token);
        }
        let expected: Vec<_> = tokens(source)
            .unwrap()
            .into_iter()
            .filter(|t| t.token_type != TokenType::Eof)
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(lexer.line(), 2);
    }

    #[test]
    fn test_zero_buffer_length_is_rejected() {
        assert!(matches!(
            Lexer::with_buffer_length("".as_bytes(), 0),
            Err(LexError::InvalidBufferLength(0))
        ));
    }

    #[test]
    fn test_reader_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::Other, "broken"))
            }
        }
        assert!(matches!(Lexer::new(Broken).next_token(), Err(LexError::Io(_))));
    }
}
