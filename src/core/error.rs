use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    QuerySyntax,
    DuplicateDocument,
    UnknownDocument,
    InvalidDocument,
    CorruptIndex,
    Storage,
    ConfigValidation,
    Io,
    Parse,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn query_syntax(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::QuerySyntax, context.into())
    }

    pub fn duplicate_document(id: impl fmt::Display) -> Self {
        Error::new(ErrorKind::DuplicateDocument, format!("Document '{}' already exists", id))
    }

    pub fn unknown_document(id: impl fmt::Display) -> Self {
        Error::new(ErrorKind::UnknownDocument, format!("Document '{}' not found", id))
    }

    pub fn invalid_document(id: impl fmt::Display, context: impl fmt::Display) -> Self {
        Error::new(ErrorKind::InvalidDocument, format!("Document '{}': {}", id, context))
    }

    pub fn corrupt_index(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::CorruptIndex, context.into())
    }

    pub fn storage(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Storage, context.into())
    }

    pub fn config(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::ConfigValidation, context.into())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("JSON error: {}", err),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error {
            kind: ErrorKind::QuerySyntax,
            context: format!("Invalid pattern: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_context() {
        let err = Error::unknown_document("d7");
        assert_eq!(err.to_string(), "UnknownDocument: Document 'd7' not found");
    }

    #[test]
    fn regex_errors_become_query_syntax() {
        let err: Error = regex::Regex::new("(unclosed").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::QuerySyntax);
    }
}
