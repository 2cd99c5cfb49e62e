use std::fmt;

/// A position in statement text, 1-indexed, the way the lexer/parser
/// report them to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("lex error at {span}: {message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("parse error at {span}: {message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub found: String,
    pub expected: Vec<&'static str>,
}

impl ParseError {
    pub fn new(
        message: impl Into<String>,
        span: Span,
        found: impl Into<String>,
        expected: Vec<&'static str>,
    ) -> Self {
        Self {
            message: message.into(),
            span,
            found: found.into(),
            expected,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("catalog error: {message}")]
pub struct CatalogError {
    pub message: String,
    pub table: Option<String>,
    pub column: Option<String>,
}

impl CatalogError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            table: None,
            column: None,
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
#[error("type error: column {column} expected {expected}, found {found}")]
pub struct TypeError {
    pub column: String,
    pub expected: &'static str,
    pub found: String,
}

impl TypeError {
    pub fn new(column: impl Into<String>, expected: &'static str, found: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            expected,
            found: found.into(),
        }
    }
}

/// Which of the three column constraints was violated. PRIMARY_KEY
/// implies NOT_NULL and UNIQUE, but the executor reports the most
/// specific kind it actually checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    NotNull,
    Unique,
    PrimaryKey,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintKind::NotNull => "NOT_NULL",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::PrimaryKey => "PRIMARY_KEY",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{kind} violated on {table}.{column}{}", value.as_ref().map(|v| format!(" (value {v})")).unwrap_or_default())]
pub struct ConstraintError {
    pub kind: ConstraintKind,
    pub table: String,
    pub column: String,
    pub value: Option<String>,
}

impl ConstraintError {
    pub fn new(kind: ConstraintKind, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            column: column.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// The closed error taxonomy for the engine: every fallible operation
/// returns `Result<_, EngineError>`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
