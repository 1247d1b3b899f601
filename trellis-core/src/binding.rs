use std::fmt::Write;
use std::rc::Rc;

use crate::error::{Error, EvaluationErrorKind, Result};
use crate::expression::{EvaluationFlags, Expression, ExpressionContext};
use crate::location::SourceLocation;
use crate::values::{ValueHolder, ValueType};

#[derive(Debug, Clone, PartialEq)]
pub enum BindingPart {
    Constant(String),
    Expression {
        expression: Expression,
        /// Two-way: the value can be pushed back to where it came from
        bidirectional: bool,
    },
}

// -----------------------------------------------------------------------------
//   - Binding -
// -----------------------------------------------------------------------------
/// The right hand side of a fragment attribute: text mixed with expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    parts: Rc<[BindingPart]>,
    location: SourceLocation,
}

impl Binding {
    pub fn constant(text: impl Into<String>, location: SourceLocation) -> Self {
        BindingBuilder::new().add_constant(text).build(location)
    }

    pub fn expression(expression: Expression, bidirectional: bool) -> Self {
        let location = expression.location().clone();
        BindingBuilder::new()
            .add_expression(expression, bidirectional)
            .build(location)
    }

    pub fn parts(&self) -> &[BindingPart] {
        &self.parts
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// True if no part reads from the context.
    pub fn is_constant(&self) -> bool {
        self.parts.iter().all(|part| match part {
            BindingPart::Constant(_) => true,
            BindingPart::Expression { expression, .. } => expression.is_constant(),
        })
    }

    /// A single expression part is passed through untouched (including its push handler).
    /// Anything else is joined into a string that can not be pushed.
    pub fn evaluate(
        &self,
        expected: ValueType,
        context: &ExpressionContext,
        track_dependencies: bool,
    ) -> Result<ValueHolder> {
        let mut flags = EvaluationFlags::empty();
        if track_dependencies {
            flags |= EvaluationFlags::TRACK_DEPENDENCIES;
        }

        let holder = match &*self.parts {
            [] => ValueHolder::new(""),
            [BindingPart::Constant(text)] => ValueHolder::new(text.as_str()),
            [BindingPart::Expression {
                expression,
                bidirectional,
            }] => {
                if *bidirectional {
                    flags |= EvaluationFlags::ENABLE_PUSH;
                }
                expression.evaluate(context, flags)?
            }
            parts => {
                let mut output = String::new();
                for part in parts {
                    match part {
                        BindingPart::Constant(text) => output.push_str(text),
                        BindingPart::Expression { expression, .. } => {
                            let holder = expression.evaluate(context, flags)?;
                            let _ = write!(&mut output, "{}", holder.value());
                        }
                    }
                }
                ValueHolder::new(output)
            }
        };

        holder.convert(expected).map_err(|err| {
            Error::evaluation(
                EvaluationErrorKind::InvalidType,
                self.location.clone(),
                format!("Binding does not produce {expected}: {err}"),
            )
        })
    }
}

// -----------------------------------------------------------------------------
//   - Builder -
// -----------------------------------------------------------------------------
#[derive(Debug, Default)]
pub struct BindingBuilder {
    parts: Vec<BindingPart>,
}

impl BindingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_constant(mut self, text: impl Into<String>) -> Self {
        self.parts.push(BindingPart::Constant(text.into()));
        self
    }

    pub fn add_expression(mut self, expression: Expression, bidirectional: bool) -> Self {
        self.parts.push(BindingPart::Expression {
            expression,
            bidirectional,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(self, location: SourceLocation) -> Binding {
        Binding {
            parts: self.parts.into(),
            location,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object::PropertyHost;
    use crate::testing::test_object;
    use crate::values::Value;

    fn loc() -> SourceLocation {
        SourceLocation::new(Some("binding"), 1, 1)
    }

    fn value_expr() -> Expression {
        Expression::property(loc(), None, "value")
    }

    #[test]
    fn empty_binding() {
        let ctx = ExpressionContext::new();
        let holder = BindingBuilder::new()
            .build(loc())
            .evaluate(ValueType::Any, &ctx, false)
            .unwrap();
        assert_eq!(holder.value(), &Value::from(""));
        assert!(!holder.can_push());
    }

    #[test]
    fn constant_binding() {
        let ctx = ExpressionContext::new();
        let binding = Binding::constant("12", loc());
        assert!(binding.is_constant());
        let holder = binding.evaluate(ValueType::Int, &ctx, false).unwrap();
        assert_eq!(holder.value(), &Value::Int(12));
    }

    #[test]
    fn single_expression_passes_through() {
        let object = test_object();
        let ctx = ExpressionContext::with_scope(object.clone());

        let holder = Binding::expression(value_expr(), true)
            .evaluate(ValueType::Any, &ctx, false)
            .unwrap();
        assert_eq!(holder.value(), &Value::Int(10));
        assert!(holder.can_push());
        holder.push(3).unwrap();
        assert_eq!(object.get_property("value"), Some(Value::Int(3)));

        let holder = Binding::expression(value_expr(), false)
            .evaluate(ValueType::Any, &ctx, false)
            .unwrap();
        assert!(!holder.can_push());
    }

    #[test]
    fn mixed_parts_concatenate() {
        let ctx = ExpressionContext::with_scope(test_object());
        let binding = BindingBuilder::new()
            .add_constant("v=")
            .add_expression(value_expr(), true)
            .add_constant("!")
            .build(loc());
        assert!(!binding.is_constant());

        let holder = binding.evaluate(ValueType::String, &ctx, false).unwrap();
        assert_eq!(holder.value(), &Value::from("v=10!"));
        assert!(!holder.can_push());
    }

    #[test]
    fn tracking_is_forwarded() {
        let ctx = ExpressionContext::with_scope(test_object());
        let binding = BindingBuilder::new()
            .add_constant("v=")
            .add_expression(value_expr(), false)
            .build(loc());

        binding.evaluate(ValueType::Any, &ctx, false).unwrap();
        assert_eq!(ctx.dependency_count(), 0);
        binding.evaluate(ValueType::Any, &ctx, true).unwrap();
        assert_eq!(ctx.dependency_count(), 1);
    }

    #[test]
    fn wrong_type() {
        let ctx = ExpressionContext::new();
        let err = Binding::constant("abc", loc())
            .evaluate(ValueType::Int, &ctx, false)
            .unwrap_err();
        assert_eq!(err.evaluation_kind(), Some(EvaluationErrorKind::InvalidType));
    }
}
