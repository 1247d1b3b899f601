use thiserror::Error;

use crate::location::SourceLocation;
use crate::values::ValueType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnterminatedString,
    InvalidNumber,
    UnexpectedToken,
    ExpectedEof,
    MismatchedBracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationErrorKind {
    UndefinedName,
    UndefinedProperty,
    UndefinedSignal,
    InvalidType,
    InvalidArgumentCount,
    InvalidDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueParserErrorKind {
    /// A parser exists for the type but rejected the text
    BadValue,
    /// Nothing knows how to produce the requested type
    NoMatch,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{location}: {message}")]
    Parse {
        kind: ParseErrorKind,
        location: SourceLocation,
        message: String,
    },

    #[error("{location}: {message}")]
    Evaluation {
        kind: EvaluationErrorKind,
        location: SourceLocation,
        message: String,
    },

    #[error("{location}: Unknown type: {name}")]
    UnknownType {
        name: String,
        location: SourceLocation,
    },

    #[error("{location}: {type_name} is not a {required} subclass.")]
    IncompatibleType {
        type_name: String,
        required: String,
        location: SourceLocation,
    },

    #[error("{message}")]
    ValueParser {
        kind: ValueParserErrorKind,
        message: String,
    },

    #[error("{location}: {message}")]
    Directive {
        location: SourceLocation,
        message: String,
    },

    #[error("'{type_name}' has no property named '{name}'")]
    UndefinedProperty { type_name: String, name: String },

    #[error("property '{name}' of '{type_name}' is read-only")]
    ReadOnlyProperty { type_name: String, name: String },

    #[error("property '{name}' of '{type_name}' expects {expected}: {reason}")]
    PropertyType {
        type_name: String,
        name: String,
        expected: ValueType,
        reason: String,
    },

    #[error("'{type_name}' has no signal named '{name}'")]
    UnknownSignal { type_name: String, name: String },

    #[error("'{type_name}' can not hold children without a container adapter")]
    MissingContainerAdapter { type_name: String },

    #[error("container '{container}': {message}")]
    Container { container: String, message: String },

    #[error("{location}: a '{fragment_type}' fragment can not be inflated into a '{target_type}'")]
    TargetTypeMismatch {
        fragment_type: String,
        target_type: String,
        location: SourceLocation,
    },

    #[error("'{type_name}' can not be instantiated")]
    NotInstantiable { type_name: String },

    #[error("value has no push handler")]
    PushUnsupported,

    #[error("the object behind this value no longer exists")]
    ObjectDropped,
}

impl Error {
    pub fn parse(kind: ParseErrorKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            location,
            message: message.into(),
        }
    }

    pub fn evaluation(
        kind: EvaluationErrorKind,
        location: SourceLocation,
        message: impl Into<String>,
    ) -> Self {
        Self::Evaluation {
            kind,
            location,
            message: message.into(),
        }
    }

    pub fn directive(location: SourceLocation, message: impl Into<String>) -> Self {
        Self::Directive {
            location,
            message: message.into(),
        }
    }

    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Self::Parse { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn evaluation_kind(&self) -> Option<EvaluationErrorKind> {
        match self {
            Self::Evaluation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Parse { location, .. }
            | Self::Evaluation { location, .. }
            | Self::UnknownType { location, .. }
            | Self::IncompatibleType { location, .. }
            | Self::Directive { location, .. }
            | Self::TargetTypeMismatch { location, .. } => Some(location),
            _ => None,
        }
    }
}
