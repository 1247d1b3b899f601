use std::rc::Rc;

use super::{EvaluationFlags, Expression, ExpressionContext};
use crate::error::{Error, EvaluationErrorKind, Result};
use crate::object::{ObjectRef, PropertyHost};
use crate::values::{Value, ValueHolder};

/// Evaluate `base` and require the result to be an object.
pub(super) fn object_base(
    base: &Expression,
    context: &ExpressionContext,
    flags: EvaluationFlags,
    what: &str,
) -> Result<ObjectRef> {
    let holder = base.evaluate(context, flags.propagated())?;
    match holder.into_value() {
        Value::Object(object) => Ok(object),
        other => Err(base.error(
            EvaluationErrorKind::InvalidType,
            format!("Cannot {what} on type '{}'", other.value_type()),
        )),
    }
}

pub(super) fn evaluate(
    expr: &Expression,
    base: Option<&Expression>,
    name: &str,
    context: &ExpressionContext,
    flags: EvaluationFlags,
) -> Result<ValueHolder> {
    let (value, owner) = match base {
        Some(base) => {
            let object = object_base(base, context, flags, "get property")?;
            if object.find_property(name).is_none() {
                return Err(expr.error(
                    EvaluationErrorKind::UndefinedProperty,
                    format!("Undefined property '{name}' on '{}'", object.type_info().name),
                ));
            }
            let value = object.get_property(name).unwrap_or_default();
            (value, Some(object))
        }
        None => match context.find_name(name) {
            Some(found) => found,
            None => {
                return Err(expr.error(
                    EvaluationErrorKind::UndefinedName,
                    format!("Undefined name '{name}'"),
                ))
            }
        },
    };

    let Some(owner) = owner else {
        return Ok(ValueHolder::new(value));
    };

    if flags.contains(EvaluationFlags::TRACK_DEPENDENCIES) {
        context.track(&owner, name);
    }

    if !flags.contains(EvaluationFlags::ENABLE_PUSH) {
        return Ok(ValueHolder::new(value));
    }

    let target = Rc::downgrade(&owner);
    let property = name.to_string();
    let holder = ValueHolder::with_push_handler(value, move |value| {
        let target = target.upgrade().ok_or(Error::ObjectDropped)?;
        target.set_property(&property, value)
    });

    Ok(holder)
}
