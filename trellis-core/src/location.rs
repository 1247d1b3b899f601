use std::fmt;
use std::sync::Arc;

/// A position in a template resource. A line or column of zero means "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Option<Arc<str>>,
    line: u32,
    column: u32,
}

impl SourceLocation {
    pub fn new(file: Option<&str>, line: u32, column: u32) -> Self {
        Self {
            file: file.map(Arc::from),
            line,
            column,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    /// Location of a span starting `lines` lines and `columns` columns after `self`.
    /// Once the span moves to another line the column counts from the start of that line.
    pub fn offset(&self, lines: u32, columns: u32) -> Self {
        let line = match self.line {
            0 => 0,
            line => line + lines,
        };

        let column = match (self.column, lines) {
            (0, _) => 0,
            (column, 0) => column + columns,
            (_, _) => columns + 1,
        };

        Self {
            file: self.file.clone(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:")?,
            None => write!(f, "<unknown>:")?,
        }

        match self.line {
            0 => write!(f, "?:")?,
            line => write!(f, "{line}:")?,
        }

        match self.column {
            0 => write!(f, "?"),
            column => write!(f, "{column}"),
        }
    }
}
