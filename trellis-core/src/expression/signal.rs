use super::property::object_base;
use super::{EvaluationFlags, Expression, ExpressionContext};
use crate::error::{EvaluationErrorKind, Result};
use crate::object::SignalHost;
use crate::values::{Value, ValueHolder};

pub(super) fn evaluate(
    expr: &Expression,
    base: Option<&Expression>,
    signal: &str,
    detail: Option<&str>,
    args: &[Expression],
    context: &ExpressionContext,
    flags: EvaluationFlags,
) -> Result<ValueHolder> {
    let target = match base {
        Some(base) => object_base(base, context, flags, "emit signal")?,
        None => context.default_scope().ok_or_else(|| {
            expr.error(
                EvaluationErrorKind::UndefinedSignal,
                format!("No scope to emit '{signal}' on"),
            )
        })?,
    };

    let Some(spec) = target.find_signal(signal) else {
        return Err(expr.error(
            EvaluationErrorKind::UndefinedSignal,
            format!("Undefined signal '{signal}' on '{}'", target.type_info().name),
        ));
    };

    if detail.is_some() && !spec.detailed {
        return Err(expr.error(
            EvaluationErrorKind::InvalidDetail,
            format!("Signal '{signal}' does not take a detail"),
        ));
    } else if detail.is_none() && spec.detailed {
        return Err(expr.error(
            EvaluationErrorKind::InvalidDetail,
            format!("Signal '{signal}' needs a detail"),
        ));
    }

    if args.len() != spec.params.len() {
        return Err(expr.error(
            EvaluationErrorKind::InvalidArgumentCount,
            format!(
                "Signal '{signal}' expects {} argument(s), got {}",
                spec.params.len(),
                args.len()
            ),
        ));
    }

    let mut values = Vec::with_capacity(args.len());
    for (arg, param) in args.iter().zip(&spec.params) {
        let value = arg.evaluate(context, flags.propagated())?.into_value();
        let value = value.convert(*param).map_err(|err| {
            arg.error(
                EvaluationErrorKind::InvalidType,
                format!("Argument of '{signal}' expects {param}: {err}"),
            )
        })?;
        values.push(value);
    }

    let result = target
        .emit(signal, detail, &values)
        .map_err(|err| expr.error(EvaluationErrorKind::UndefinedSignal, err.to_string()))?;

    let value = match (spec.returns, result) {
        (None, _) | (Some(_), None) => Value::Empty,
        (Some(_), Some(value)) => value,
    };

    Ok(ValueHolder::new(value))
}
