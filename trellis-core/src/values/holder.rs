use std::fmt;
use std::rc::Rc;

use super::{Value, ValueType};
use crate::error::{Error, Result};
use crate::object::ObjectRef;

pub type PushHandler = Rc<dyn Fn(Value) -> Result<()>>;

/// A value together with an optional way of writing a new value back to its source.
#[derive(Clone)]
pub struct ValueHolder {
    value: Value,
    push: Option<PushHandler>,
}

impl ValueHolder {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            push: None,
        }
    }

    pub fn with_push_handler(
        value: impl Into<Value>,
        push: impl Fn(Value) -> Result<()> + 'static,
    ) -> Self {
        Self {
            value: value.into(),
            push: Some(Rc::new(push)),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn can_push(&self) -> bool {
        self.push.is_some()
    }

    pub fn disable_push(&mut self) {
        self.push = None;
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        match &self.push {
            Some(push) => push(value.into()),
            None => Err(Error::PushUnsupported),
        }
    }

    /// Convert the held value, keeping the push handler.
    pub fn convert(self, value_type: ValueType) -> Result<Self> {
        Ok(Self {
            value: self.value.convert(value_type)?,
            push: self.push,
        })
    }
}

impl fmt::Debug for ValueHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueHolder")
            .field("value", &self.value)
            .field("can_push", &self.can_push())
            .finish()
    }
}

impl PartialEq for ValueHolder {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

macro_rules! holder_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ValueHolder {
                fn from(val: $t) -> Self {
                    Self::new(val)
                }
            }
        )*
    };
}

holder_from!(Value, bool, i32, i64, u32, usize, f64, &str, String, ObjectRef);
