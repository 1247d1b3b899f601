use trellis_core::directive::{
    Directive, DirectiveFactory, DirectiveInstance, DirectiveKind, PropertyFormat, StructuralDirective,
};
use trellis_core::error::{Error, Result};
use trellis_core::fragment::Fragment;
use trellis_core::host::HostRef;
use trellis_core::inflator::{InflationFlags, Inflator};
use trellis_core::location::SourceLocation;
use trellis_core::values::{Value, ValueType};

/// `__if="[condition]"`: the child only exists while the condition holds.
#[derive(Default)]
struct IfDirective {
    value: bool,
}

impl Directive for IfDirective {
    fn property_type(&self, name: &str) -> Option<ValueType> {
        match name {
            "value" => Some(ValueType::Bool),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        match (name, value.as_bool()) {
            ("value", Some(value)) => {
                self.value = value;
                Ok(())
            }
            _ => Err(Error::directive(
                SourceLocation::unknown(),
                format!("'if' can not set '{name}' to {value}"),
            )),
        }
    }
}

impl StructuralDirective for IfDirective {
    fn apply(
        &mut self,
        inflator: &Inflator,
        parent: &HostRef,
        position: usize,
        child: &Fragment,
        flags: InflationFlags,
    ) -> Result<()> {
        // Not staging the child removes it at commit
        if !self.value {
            return Ok(());
        }
        inflator.inflate_child(parent, position, child, flags)
    }
}

pub struct IfDirectiveFactory;

impl DirectiveFactory for IfDirectiveFactory {
    fn name(&self) -> &str {
        "if"
    }

    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Structural
    }

    fn property_format(&self) -> PropertyFormat {
        PropertyFormat::ImplicitValue
    }

    fn create(&self) -> DirectiveInstance {
        DirectiveInstance::structural(IfDirective::default())
    }
}

#[cfg(test)]
mod test {
    use trellis_core::binding::Binding;
    use trellis_core::expression::Expression;
    use trellis_core::object::{same_object, Object, ObjectRef, PropertyHost};
    use trellis_core::testing::{location, test_object};

    use super::*;
    use crate::directives::standard_directives;
    use crate::types::{BOX, BUTTON, LABEL};
    use crate::widget::Widget;

    fn children(target: &ObjectRef) -> Vec<ObjectRef> {
        target.downcast_ref::<Widget>().unwrap().children()
    }

    #[test]
    fn condition_toggles_child() {
        let scope = test_object();
        let mut inflator = Inflator::with_scope(scope.clone());
        standard_directives(&mut inflator);

        let condition = Binding::expression(Expression::property(location(2), None, "flag"), false);
        let fragment = Fragment::builder(&BOX, location(1))
            .child(Fragment::builder(&LABEL, location(2)).binding("__if", condition).build())
            .child(Fragment::builder(&BUTTON, location(3)).build())
            .build();

        let target = inflator.inflate_new_target(&fragment, InflationFlags::empty()).unwrap();
        let current = children(&target);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].type_info().name, "Button");
        let button = current[0].clone();

        scope.set_property("flag", Value::Bool(true)).unwrap();
        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();
        let current = children(&target);
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].type_info().name, "Label");
        assert!(same_object(&current[1], &button));
        let label = current[0].clone();

        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();
        assert!(same_object(&children(&target)[0], &label));

        scope.set_property("flag", Value::Bool(false)).unwrap();
        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();
        let current = children(&target);
        assert_eq!(current.len(), 1);
        assert!(same_object(&current[0], &button));
    }

    #[test]
    fn condition_must_be_boolean() {
        let mut inflator = Inflator::new();
        standard_directives(&mut inflator);

        let fragment = Fragment::builder(&BOX, location(1))
            .child(
                Fragment::builder(&LABEL, location(2))
                    .binding("__if", Binding::constant("maybe", location(2)))
                    .build(),
            )
            .build();
        assert!(inflator
            .inflate_new_target(&fragment, InflationFlags::empty())
            .is_err());
    }
}
