use std::io::{self, BufRead};
use std::num::ParseFloatError;

use thiserror::Error;

/// One mass to search for, with the label it was given
#[derive(Debug, Clone, PartialEq)]
pub struct MassQuery {
    pub index: usize,
    pub comment: String,
    pub mass: f64,
}

impl MassQuery {
    pub fn new(index: usize, comment: String, mass: f64) -> Self {
        Self {
            index,
            comment,
            mass,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryParseError {
    #[error("Failed to parse mass {token:?} on line {line}: {source}")]
    MalformedMass {
        line: usize,
        token: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("Failed to read query line {line}: {source}")]
    IOError {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Parse one non-comment query line, `COMMENT MASS` or just `MASS`
pub fn parse_query_line(
    text: &str,
    index: usize,
    line: usize,
) -> Result<MassQuery, QueryParseError> {
    let mut tokens = text.split_whitespace();
    let first = tokens.next().unwrap_or_default();
    let (comment, token) = match tokens.next() {
        Some(second) => (first, second),
        None => ("", first),
    };
    let mass = token
        .parse()
        .map_err(|source| QueryParseError::MalformedMass {
            line,
            token: token.to_string(),
            source,
        })?;
    Ok(MassQuery::new(index, comment.to_string(), mass))
}

/// Read queries from a batch stream.
///
/// Lines starting with `;` are skipped and the first empty line ends the batch.
pub struct QueryReader<R: BufRead> {
    handle: R,
    buffer: String,
    line: usize,
    index: usize,
    done: bool,
}

impl<R: BufRead> QueryReader<R> {
    pub fn new(handle: R) -> Self {
        Self {
            handle,
            buffer: String::new(),
            line: 0,
            index: 0,
            done: false,
        }
    }

    fn read_next(&mut self) -> Option<Result<MassQuery, QueryParseError>> {
        loop {
            self.buffer.clear();
            self.line += 1;
            match self.handle.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(QueryParseError::IOError {
                        line: self.line,
                        source,
                    }))
                }
            }
            if self.buffer.starts_with(';') {
                continue;
            }
            let text = self.buffer.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() {
                return None;
            }
            let query = parse_query_line(text, self.index, self.line);
            if query.is_ok() {
                self.index += 1;
            }
            return Some(query);
        }
    }
}

impl<R: BufRead> Iterator for QueryReader<R> {
    type Item = Result<MassQuery, QueryParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let value = self.read_next();
        if !matches!(value, Some(Ok(_))) {
            self.done = true;
        }
        value
    }
}
