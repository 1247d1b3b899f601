use bitflags::bitflags;

pub use self::context::ExpressionContext;
use crate::error::{Error, EvaluationErrorKind, Result};
use crate::location::SourceLocation;
use crate::values::{Value, ValueHolder};

mod context;
mod property;
mod signal;

bitflags! {
    pub struct EvaluationFlags: u32 {
        /// Attach a push handler to values that come from an object property
        const ENABLE_PUSH = 0b01;
        /// Record every object property that was read
        const TRACK_DEPENDENCIES = 0b10;
    }
}

impl EvaluationFlags {
    /// Flags passed on to base and argument sub-expressions.
    pub fn propagated(self) -> Self {
        self & Self::TRACK_DEPENDENCIES
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Constant(Value),
    /// `base.name`, or a bare `name` resolved through the context
    Property {
        base: Option<Box<Expression>>,
        name: String,
    },
    /// `emit base:signal::detail(args)`
    Signal {
        base: Option<Box<Expression>>,
        signal: String,
        detail: Option<String>,
        args: Vec<Expression>,
    },
}

// -----------------------------------------------------------------------------
//   - Expression -
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    kind: ExpressionKind,
    location: SourceLocation,
}

impl Expression {
    pub fn constant(location: SourceLocation, value: impl Into<Value>) -> Self {
        Self {
            kind: ExpressionKind::Constant(value.into()),
            location,
        }
    }

    pub fn property(location: SourceLocation, base: Option<Expression>, name: impl Into<String>) -> Self {
        Self {
            kind: ExpressionKind::Property {
                base: base.map(Box::new),
                name: name.into(),
            },
            location,
        }
    }

    pub fn signal(
        location: SourceLocation,
        base: Option<Expression>,
        signal: impl Into<String>,
        detail: Option<String>,
        args: Vec<Expression>,
    ) -> Self {
        Self {
            kind: ExpressionKind::Signal {
                base: base.map(Box::new),
                signal: signal.into(),
                detail,
                args,
            },
            location,
        }
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExpressionKind::Constant(_))
    }

    pub fn evaluate(&self, context: &ExpressionContext, flags: EvaluationFlags) -> Result<ValueHolder> {
        match &self.kind {
            ExpressionKind::Constant(value) => Ok(ValueHolder::new(value.clone())),
            ExpressionKind::Property { base, name } => {
                property::evaluate(self, base.as_deref(), name, context, flags)
            }
            ExpressionKind::Signal {
                base,
                signal,
                detail,
                args,
            } => signal::evaluate(self, base.as_deref(), signal, detail.as_deref(), args, context, flags),
        }
    }

    pub(crate) fn error(&self, kind: EvaluationErrorKind, message: impl Into<String>) -> Error {
        Error::evaluation(kind, self.location.clone(), message)
    }
}
