pub mod ast;
pub mod hook;
pub mod parser;
pub mod resolver;
pub mod tokenizer;
pub mod tree_walk_interpreter;

pub use parser::{parse, parse_str, ParseError, ParseErrors};
pub use tree_walk_interpreter::{Interpreter, Object, RuntimeError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseErrors),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
