pub mod cap;
pub mod net;

use std::str::{FromStr, SplitWhitespace};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected end of input while reading {field}")]
    UnexpectedEof { field: String },
    #[error("invalid {field}: '{token}'")]
    InvalidToken { field: String, token: String },
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}

pub(crate) fn read_file(filename: &str) -> Result<String, ParseError> {
    std::fs::read_to_string(filename).map_err(|source| ParseError::Io {
        path: filename.to_string(),
        source,
    })
}

/// Whitespace token stream where every read names the field it expects.
pub(crate) struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            inner: content.split_whitespace(),
        }
    }

    pub fn next_str(&mut self, field: &str) -> Result<&'a str, ParseError> {
        self.inner.next().ok_or_else(|| ParseError::UnexpectedEof {
            field: field.to_string(),
        })
    }

    pub fn next_value<T: FromStr>(&mut self, field: &str) -> Result<T, ParseError> {
        let token = self.next_str(field)?;
        token.parse().map_err(|_| ParseError::InvalidToken {
            field: field.to_string(),
            token: token.to_string(),
        })
    }
}
