use std::collections::HashMap;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::binding::Binding;
use crate::directive::{
    DirectiveFactory, DirectiveFlags, DirectiveInstance, DirectiveKind, PropertyFormat, IMPLICIT_PROPERTY,
};
use crate::error::{Error, EvaluationErrorKind, Result};
use crate::expression::ExpressionContext;
use crate::fragment::{BindingTarget, Fragment};
use crate::host::{FragmentHost, HostRef};
use crate::location::SourceLocation;
use crate::object::{Object, ObjectRef, PropertyHost};
use crate::values::{Value, ValueType};

bitflags! {
    pub struct InflationFlags: u32 {
        /// Record the properties read by bindings in the inflator's context
        const TRACK_DEPENDENCIES = 0b1;
    }
}

struct RegisteredDirective {
    factory: Rc<dyn DirectiveFactory>,
    auto_attach: bool,
}

/// Directives staged on one host during one pass, by factory name.
type StagedDirectives = HashMap<String, DirectiveInstance>;

// -----------------------------------------------------------------------------
//   - Inflator -
// -----------------------------------------------------------------------------
/// Applies fragments to target objects.
///
/// Every binding is evaluated against the inflator's [`ExpressionContext`].
pub struct Inflator {
    context: ExpressionContext,
    directives: IndexMap<String, RegisteredDirective>,
}

impl Inflator {
    pub fn new() -> Self {
        Self::with_context(ExpressionContext::new())
    }

    pub fn with_context(context: ExpressionContext) -> Self {
        Self {
            context,
            directives: IndexMap::new(),
        }
    }

    pub fn with_scope(scope: ObjectRef) -> Self {
        Self::with_context(ExpressionContext::with_scope(scope))
    }

    pub fn context(&self) -> &ExpressionContext {
        &self.context
    }

    pub fn add_directive(&mut self, factory: impl DirectiveFactory + 'static, flags: DirectiveFlags) -> &mut Self {
        self.add_shared_directive(Rc::new(factory), flags)
    }

    pub fn add_shared_directive(&mut self, factory: Rc<dyn DirectiveFactory>, flags: DirectiveFlags) -> &mut Self {
        let registered = RegisteredDirective {
            auto_attach: !flags.contains(DirectiveFlags::NO_AUTO_ATTACH),
            factory,
        };
        self.directives
            .insert(registered.factory.name().to_string(), registered);
        self
    }

    pub fn add_directives(
        &mut self,
        flags: DirectiveFlags,
        factories: impl IntoIterator<Item = Rc<dyn DirectiveFactory>>,
    ) -> &mut Self {
        for factory in factories {
            self.add_shared_directive(factory, flags);
        }
        self
    }

    pub fn directive(&self, name: &str) -> Option<Rc<dyn DirectiveFactory>> {
        self.directives.get(name).map(|r| r.factory.clone())
    }

    /// Instantiate the fragment's target type and inflate into it.
    pub fn inflate_new_target(&self, fragment: &Fragment, flags: InflationFlags) -> Result<ObjectRef> {
        let target = fragment.target_type().instantiate()?;
        self.inflate_existing_target(&target, fragment, flags)?;
        Ok(target)
    }

    /// Run one inflation pass of `fragment` over `target`. A failing pass leaves
    /// the target as it was after the previous pass.
    pub fn inflate_existing_target(
        &self,
        target: &ObjectRef,
        fragment: &Fragment,
        flags: InflationFlags,
    ) -> Result<()> {
        let target_type = target.type_info();
        if !fragment.accepts_target_type(target_type) {
            return Err(Error::TargetTypeMismatch {
                fragment_type: fragment.target_type().name.to_string(),
                target_type: target_type.name.to_string(),
                location: fragment.location().clone(),
            });
        }

        let host = FragmentHost::ensure(target);
        {
            let mut host = host.borrow_mut();
            host.begin_inflation();
            // Directives provide a new one at commit
            let stale_adapter = host
                .container_adapter()
                .map_or(false, |adapter| !adapter.accepts(fragment.target_type()));
            if stale_adapter {
                host.set_container_adapter(None);
            }
        }

        let staged = self
            .stage_bindings(&host, target, fragment, flags)
            .and_then(|_| self.inflate_children(&host, fragment, flags));

        if let Err(err) = staged {
            host.borrow_mut().abort_inflation();
            return Err(err);
        }

        let result = host.borrow_mut().commit_inflation();
        result
    }

    /// Inflate `child` into `parent` at `position`, reusing the object left
    /// at that position by the previous pass when its type still matches.
    pub fn inflate_child(
        &self,
        parent: &HostRef,
        position: usize,
        child: &Fragment,
        flags: InflationFlags,
    ) -> Result<()> {
        self.inflate_keyed_child(parent, position, 0, child, flags)
    }

    /// Like [`Inflator::inflate_child`], for structural directives producing
    /// more than one child from the fragment at `position`.
    pub fn inflate_keyed_child(
        &self,
        parent: &HostRef,
        position: usize,
        key: usize,
        child: &Fragment,
        flags: InflationFlags,
    ) -> Result<()> {
        let leftover = parent.borrow().get_leftover_keyed_child(position, key);
        let target = match leftover {
            Some(existing) if child.accepts_target_type(existing.type_info()) => {
                self.inflate_existing_target(&existing, child, flags)?;
                existing
            }
            _ => self.inflate_new_target(child, flags)?,
        };

        parent.borrow_mut().add_keyed_child(position, key, target);
        Ok(())
    }

    // -------------------------------------------------------------------------
    //   - Bindings -
    // -------------------------------------------------------------------------
    fn stage_bindings(
        &self,
        host: &HostRef,
        target: &ObjectRef,
        fragment: &Fragment,
        flags: InflationFlags,
    ) -> Result<()> {
        let track = flags.contains(InflationFlags::TRACK_DEPENDENCIES);
        let mut staged = StagedDirectives::new();

        for (position, (key, binding)) in fragment.bindings().enumerate() {
            match BindingTarget::parse(key) {
                BindingTarget::Property(name) => {
                    let Some(spec) = target.find_property(name) else {
                        return Err(Error::evaluation(
                            EvaluationErrorKind::UndefinedProperty,
                            binding.location().clone(),
                            format!("Undefined property '{name}' on '{}'", target.type_info().name),
                        ));
                    };
                    let holder = binding.evaluate(spec.value_type, &self.context, track)?;
                    host.borrow_mut().add_property(name, holder);
                }
                BindingTarget::Signal(signal) => {
                    host.borrow_mut()
                        .add_signal_binding(signal, binding.clone(), self.context.clone());
                }
                BindingTarget::AttributeDirective(key) => {
                    let (factory, property) = self.resolve_directive(key, binding.location())?;
                    let name = factory.name().to_string();
                    let directive = match staged.get(&name) {
                        Some(directive) => directive.clone(),
                        None => {
                            let directive = self.stage_directive(host, &factory, Some(position), binding.location())?;
                            staged.insert(name.clone(), directive.clone());
                            directive
                        }
                    };

                    if let Some(property) = property {
                        self.set_directive_property(host, &directive, &name, &property, binding, track)?;
                    }
                }
                // Applied by the parent when the fragment is inflated as a child
                BindingTarget::StructuralDirective(_) => {}
            }
        }

        self.auto_attach_directives(host, fragment, &mut staged)
    }

    fn auto_attach_directives(
        &self,
        host: &HostRef,
        fragment: &Fragment,
        staged: &mut StagedDirectives,
    ) -> Result<()> {
        for (name, registered) in &self.directives {
            let factory = &registered.factory;
            if !registered.auto_attach
                || staged.contains_key(name)
                || factory.kind() == DirectiveKind::Structural
            {
                continue;
            }

            let attach = factory.should_auto_attach(&host.borrow(), fragment);
            if !attach {
                continue;
            }

            if factory.property_format() == PropertyFormat::Explicit {
                #[cfg(feature = "logging")]
                log::warn!("Cannot auto-attach directive '{name}', it requires explicit properties");
                continue;
            }

            let directive = self.stage_directive(host, factory, None, fragment.location())?;
            let takes_text = directive.property_type(IMPLICIT_PROPERTY) == Some(ValueType::String);
            if factory.property_format() == PropertyFormat::ImplicitValue && takes_text {
                host.borrow_mut()
                    .add_directive_property(&directive, IMPLICIT_PROPERTY, Value::from(""))?;
            }
            staged.insert(name.clone(), directive);
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    //   - Directives -
    // -------------------------------------------------------------------------
    /// Find the factory for a directive key (`name` or `name.property`) and the
    /// property the binding sets, if any.
    fn resolve_directive(
        &self,
        key: &str,
        location: &SourceLocation,
    ) -> Result<(Rc<dyn DirectiveFactory>, Option<String>)> {
        if let Some(registered) = self.directives.get(key) {
            let factory = registered.factory.clone();
            let property = match factory.property_format() {
                PropertyFormat::None => None,
                PropertyFormat::ImplicitValue => Some(IMPLICIT_PROPERTY.to_string()),
                PropertyFormat::Explicit => {
                    return Err(Error::directive(
                        location.clone(),
                        format!("Directive '{key}' requires a property name: '{key}.<property>'"),
                    ))
                }
            };
            return Ok((factory, property));
        }

        if let Some((name, property)) = key.rsplit_once('.') {
            if let Some(registered) = self.directives.get(name) {
                if registered.factory.property_format() != PropertyFormat::Explicit {
                    return Err(Error::directive(
                        location.clone(),
                        format!("Directive '{name}' does not take named properties"),
                    ));
                }
                return Ok((registered.factory.clone(), Some(property.to_string())));
            }
        }

        Err(Error::directive(location.clone(), format!("Unknown directive '{key}'")))
    }

    fn create_directive(
        &self,
        factory: &Rc<dyn DirectiveFactory>,
        location: &SourceLocation,
    ) -> Result<DirectiveInstance> {
        let directive = factory.create();
        if directive.kind() != factory.kind() {
            return Err(Error::directive(
                location.clone(),
                format!(
                    "Directive '{}' created a {:?} directive instead of {:?}",
                    factory.name(),
                    directive.kind(),
                    factory.kind()
                ),
            ));
        }
        Ok(directive)
    }

    /// Stage a non-structural directive, reusing the leftover instance if there is one.
    /// Property directives named by a binding are keyed by the binding's position.
    fn stage_directive(
        &self,
        host: &HostRef,
        factory: &Rc<dyn DirectiveFactory>,
        position: Option<usize>,
        location: &SourceLocation,
    ) -> Result<DirectiveInstance> {
        let name = factory.name();
        let positional = match (factory.kind(), position) {
            (DirectiveKind::Structural, _) => {
                return Err(Error::directive(
                    location.clone(),
                    format!("Structural directive '{name}' must be named with '__{name}'"),
                ))
            }
            (DirectiveKind::Property, Some(position)) => Some(position),
            _ => None,
        };

        let leftover = match positional {
            Some(position) => host.borrow().get_leftover_property_directive(position, name),
            None => host.borrow().get_leftover_attribute_directive(name),
        };

        let directive = match leftover {
            Some(directive) => directive,
            None => self.create_directive(factory, location)?,
        };

        let staged = match positional {
            Some(position) => host.borrow_mut().add_property_directive(position, name, directive),
            None => host.borrow_mut().add_attribute_directive(name, directive),
        };

        Ok(staged)
    }

    fn set_directive_property(
        &self,
        host: &HostRef,
        directive: &DirectiveInstance,
        name: &str,
        property: &str,
        binding: &Binding,
        track: bool,
    ) -> Result<()> {
        let Some(value_type) = directive.property_type(property) else {
            return Err(Error::directive(
                binding.location().clone(),
                format!("Directive '{name}' has no property '{property}'"),
            ));
        };

        let holder = binding.evaluate(value_type, &self.context, track)?;
        host.borrow_mut()
            .add_directive_property(directive, property, holder.into_value())
    }

    // -------------------------------------------------------------------------
    //   - Children -
    // -------------------------------------------------------------------------
    fn inflate_children(&self, host: &HostRef, fragment: &Fragment, flags: InflationFlags) -> Result<()> {
        for (position, child) in fragment.children().iter().enumerate() {
            match child.structural_bindings().next() {
                Some(_) => self.apply_structural_directive(host, position, child, flags)?,
                None => self.inflate_child(host, position, child, flags)?,
            }
        }
        Ok(())
    }

    fn apply_structural_directive(
        &self,
        parent: &HostRef,
        position: usize,
        child: &Fragment,
        flags: InflationFlags,
    ) -> Result<()> {
        let track = flags.contains(InflationFlags::TRACK_DEPENDENCIES);
        let mut staged: Option<(String, DirectiveInstance)> = None;

        for (key, binding) in child.structural_bindings() {
            let (factory, property) = self.resolve_directive(key, binding.location())?;
            let name = factory.name().to_string();
            if factory.kind() != DirectiveKind::Structural {
                return Err(Error::directive(
                    binding.location().clone(),
                    format!("Directive '{name}' is not a structural directive"),
                ));
            }

            let directive = match &staged {
                Some((staged_name, directive)) if *staged_name == name => directive.clone(),
                Some((staged_name, _)) => {
                    return Err(Error::directive(
                        binding.location().clone(),
                        format!("Only one structural directive per element, found '{staged_name}' and '{name}'"),
                    ))
                }
                None => {
                    let leftover = parent.borrow().get_leftover_structural_directive(position, &name);
                    let directive = match leftover {
                        Some(directive) => directive,
                        None => self.create_directive(&factory, binding.location())?,
                    };
                    let directive = parent
                        .borrow_mut()
                        .add_structural_directive(position, &name, directive);
                    staged = Some((name.clone(), directive.clone()));
                    directive
                }
            };

            if let Some(property) = property {
                self.set_directive_property(parent, &directive, &name, &property, binding, track)?;
            }
        }

        let structural = staged
            .as_ref()
            .and_then(|(_, directive)| directive.as_structural().cloned());

        match structural {
            Some(structural) => {
                let result = structural.borrow_mut().apply(self, parent, position, child, flags);
                result
            }
            None => self.inflate_child(parent, position, child, flags),
        }
    }
}

impl Default for Inflator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binding::BindingBuilder;
    use crate::container::ContainerAdapter;
    use crate::directive::{Directive, StructuralDirective};
    use crate::expression::Expression;
    use crate::object::{same_object, SignalHost, TypeInfo};
    use crate::testing::{
        location, test_object, CountingFactory, RecordingAdapterFactory, INNER_OBJECT, TEST_OBJECT,
    };

    fn constant(text: &str) -> Binding {
        Binding::constant(text, location(1))
    }

    fn name(name: &str) -> Binding {
        Binding::expression(Expression::property(location(1), None, name), false)
    }

    fn fragment() -> crate::fragment::FragmentBuilder {
        Fragment::builder(&TEST_OBJECT, location(1))
    }

    fn inflator_with_adapter() -> (Inflator, Rc<crate::testing::RecordingAdapter>) {
        let factory = RecordingAdapterFactory::new();
        let adapter = factory.adapter();
        let mut inflator = Inflator::new();
        inflator.add_directive(factory, DirectiveFlags::empty());
        (inflator, adapter)
    }

    #[test]
    fn new_target_with_properties() {
        let inflator = Inflator::new();
        let fragment = fragment()
            .binding("value", constant("5"))
            .binding("text", constant("hello"))
            .build();

        let target = inflator
            .inflate_new_target(&fragment, InflationFlags::empty())
            .unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(5)));
        assert_eq!(target.get_property("text"), Some(Value::from("hello")));
    }

    #[test]
    fn bindings_read_the_scope() {
        let scope = test_object();
        scope.set_property("value", Value::Int(33)).unwrap();
        let inflator = Inflator::with_scope(scope);
        let fragment = fragment()
            .binding("text", BindingBuilder::new()
                .add_constant("n=")
                .add_expression(Expression::property(location(1), None, "value"), false)
                .build(location(1)))
            .build();

        let target = inflator
            .inflate_new_target(&fragment, InflationFlags::TRACK_DEPENDENCIES)
            .unwrap();
        assert_eq!(target.get_property("text"), Some(Value::from("n=33")));
        assert_eq!(inflator.context().dependency_count(), 1);
    }

    #[test]
    fn removed_binding_resets_property() {
        let inflator = Inflator::new();
        let target = test_object();

        let first = fragment().binding("value", constant("5")).build();
        inflator
            .inflate_existing_target(&target, &first, InflationFlags::empty())
            .unwrap();

        let second = fragment().build();
        inflator
            .inflate_existing_target(&target, &second, InflationFlags::empty())
            .unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(10)));
    }

    #[test]
    fn undefined_property() {
        let inflator = Inflator::new();
        let target = test_object();
        let fragment = fragment()
            .binding("value", constant("5"))
            .binding("nope", constant("1"))
            .build();

        let err = inflator
            .inflate_existing_target(&target, &fragment, InflationFlags::empty())
            .unwrap_err();
        assert_eq!(err.evaluation_kind(), Some(EvaluationErrorKind::UndefinedProperty));
        assert_eq!(target.get_property("value"), Some(Value::Int(10)));

        let host = FragmentHost::for_target(&target).unwrap();
        assert!(!host.borrow().is_inflating());
    }

    #[test]
    fn undefined_name_fails_the_pass() {
        let inflator = Inflator::with_scope(test_object());
        let fragment = fragment().binding("value", name("missing")).build();
        let err = inflator
            .inflate_new_target(&fragment, InflationFlags::empty())
            .err().unwrap();
        assert_eq!(err.evaluation_kind(), Some(EvaluationErrorKind::UndefinedName));
    }

    #[test]
    fn wrong_target_type() {
        let inflator = Inflator::new();
        let target = test_object();
        let fragment = Fragment::builder(&INNER_OBJECT, location(3)).build();
        let err = inflator
            .inflate_existing_target(&target, &fragment, InflationFlags::empty())
            .unwrap_err();
        assert!(matches!(err, Error::TargetTypeMismatch { .. }));
    }

    #[test]
    fn children_are_reused_across_passes() {
        let (inflator, adapter) = inflator_with_adapter();
        let fragment = fragment()
            .child(fragment().binding("value", constant("1")).build())
            .child(Fragment::builder(&INNER_OBJECT, location(2)).build())
            .build();

        let target = inflator
            .inflate_new_target(&fragment, InflationFlags::empty())
            .unwrap();
        let first = adapter.children();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].get_property("value"), Some(Value::Int(1)));
        assert_eq!(first[1].type_info().name, "InnerObject");

        inflator
            .inflate_existing_target(&target, &fragment, InflationFlags::empty())
            .unwrap();
        let second = adapter.children();
        assert!(same_object(&first[0], &second[0]));
        assert!(same_object(&first[1], &second[1]));
        assert_eq!(adapter.adds(), 2);
        assert_eq!(adapter.removes(), 0);
    }

    #[test]
    fn child_with_new_type_is_replaced() {
        let (inflator, adapter) = inflator_with_adapter();
        let target = test_object();

        let first = fragment().child(fragment().build()).build();
        inflator
            .inflate_existing_target(&target, &first, InflationFlags::empty())
            .unwrap();
        let old = adapter.children()[0].clone();

        let second = fragment()
            .child(Fragment::builder(&INNER_OBJECT, location(2)).build())
            .build();
        inflator
            .inflate_existing_target(&target, &second, InflationFlags::empty())
            .unwrap();

        let children = adapter.children();
        assert_eq!(children.len(), 1);
        assert!(!same_object(&children[0], &old));
        assert_eq!(children[0].type_info().name, "InnerObject");
    }

    #[test]
    fn dropped_child_is_removed() {
        let (inflator, adapter) = inflator_with_adapter();
        let target = test_object();

        let first = fragment()
            .child(fragment().build())
            .child(fragment().build())
            .build();
        inflator
            .inflate_existing_target(&target, &first, InflationFlags::empty())
            .unwrap();

        let second = fragment().child(fragment().build()).build();
        inflator
            .inflate_existing_target(&target, &second, InflationFlags::empty())
            .unwrap();

        assert_eq!(adapter.children().len(), 1);
        assert_eq!(adapter.removes(), 1);
    }

    #[test]
    fn children_without_adapter() {
        let inflator = Inflator::new();
        let fragment = fragment().child(fragment().build()).build();
        let err = inflator
            .inflate_new_target(&fragment, InflationFlags::empty())
            .err().unwrap();
        assert!(matches!(err, Error::MissingContainerAdapter { .. }));
    }

    #[test]
    fn missing_adapter_leaves_directives_alone() {
        let factory = CountingFactory::new("count", DirectiveKind::Attribute, PropertyFormat::ImplicitValue);
        let counts = factory.counts();
        let mut inflator = Inflator::new();
        inflator.add_directive(factory, DirectiveFlags::NO_AUTO_ATTACH);

        let fragment = fragment()
            .binding("_count", constant("x"))
            .child(fragment().build())
            .build();
        let err = inflator
            .inflate_existing_target(&test_object(), &fragment, InflationFlags::empty())
            .unwrap_err();

        assert!(matches!(err, Error::MissingContainerAdapter { .. }));
        assert_eq!(counts.get(), (0, 0, 0));
        assert!(counts.values().is_empty());
    }

    #[test]
    fn stale_adapter_is_replaced() {
        struct Rejecting;

        impl ContainerAdapter for Rejecting {
            fn add_child(&self, _: &ObjectRef, _: usize, _: &ObjectRef) -> Result<()> {
                Ok(())
            }

            fn remove_child(&self, _: &ObjectRef, _: &ObjectRef) -> Result<()> {
                Ok(())
            }

            fn accepts(&self, _: &TypeInfo) -> bool {
                false
            }
        }

        let (inflator, adapter) = inflator_with_adapter();
        let target = test_object();
        FragmentHost::new(&target)
            .borrow_mut()
            .set_container_adapter(Some(Rc::new(Rejecting)));

        let fragment = fragment().child(fragment().build()).build();
        inflator
            .inflate_existing_target(&target, &fragment, InflationFlags::empty())
            .unwrap();
        assert_eq!(adapter.children().len(), 1);
    }

    #[test]
    fn failing_child_aborts_the_parent() {
        let (inflator, _adapter) = inflator_with_adapter();
        let target = test_object();
        let fragment = fragment()
            .binding("value", constant("7"))
            .child(fragment().binding("nope", constant("1")).build())
            .build();

        assert!(inflator
            .inflate_existing_target(&target, &fragment, InflationFlags::empty())
            .is_err());
        assert_eq!(target.get_property("value"), Some(Value::Int(10)));
    }

    #[test]
    fn directive_lifecycle_over_three_passes() {
        let factory = CountingFactory::new("count", DirectiveKind::Attribute, PropertyFormat::ImplicitValue);
        let counts = factory.counts();
        let mut inflator = Inflator::new();
        inflator.add_directive(factory, DirectiveFlags::NO_AUTO_ATTACH);
        let target = test_object();

        let with = fragment().binding("_count", constant("x")).build();
        let without = fragment().build();

        inflator.inflate_existing_target(&target, &with, InflationFlags::empty()).unwrap();
        assert_eq!(counts.get(), (1, 1, 0));
        assert_eq!(counts.last_value("value"), Some(Value::from("x")));

        inflator.inflate_existing_target(&target, &with, InflationFlags::empty()).unwrap();
        assert_eq!(counts.get(), (1, 2, 0));

        inflator.inflate_existing_target(&target, &without, InflationFlags::empty()).unwrap();
        assert_eq!(counts.get(), (1, 2, 1));
    }

    #[test]
    fn property_directive_keyed_by_position() {
        let factory = CountingFactory::new("count", DirectiveKind::Property, PropertyFormat::ImplicitValue);
        let counts = factory.counts();
        let mut inflator = Inflator::new();
        inflator.add_directive(factory, DirectiveFlags::NO_AUTO_ATTACH);
        let target = test_object();

        let fragment = fragment()
            .binding("value", constant("1"))
            .binding("_count", constant("y"))
            .build();
        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();
        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();
        assert_eq!(counts.get(), (1, 2, 0));
    }

    #[test]
    fn explicit_directive_properties() {
        let factory = CountingFactory::new("test.count", DirectiveKind::Attribute, PropertyFormat::Explicit);
        let counts = factory.counts();
        let mut inflator = Inflator::new();
        inflator.add_directive(factory, DirectiveFlags::NO_AUTO_ATTACH);

        let fragment = fragment()
            .binding("_test.count.text", constant("hi"))
            .binding("_test.count.count", constant("3"))
            .build();
        inflator.inflate_new_target(&fragment, InflationFlags::empty()).unwrap();

        assert_eq!(counts.get(), (1, 1, 0));
        assert_eq!(counts.last_value("text"), Some(Value::from("hi")));
        assert_eq!(counts.last_value("count"), Some(Value::Int(3)));
    }

    #[test]
    fn directive_key_errors() {
        let mut inflator = Inflator::new();
        inflator.add_directive(
            CountingFactory::new("explicit", DirectiveKind::Attribute, PropertyFormat::Explicit),
            DirectiveFlags::NO_AUTO_ATTACH,
        );
        inflator.add_directive(
            CountingFactory::new("implicit", DirectiveKind::Attribute, PropertyFormat::ImplicitValue),
            DirectiveFlags::NO_AUTO_ATTACH,
        );

        for key in ["_explicit", "_implicit.text", "_unknown", "_explicit.missing"] {
            let fragment = fragment().binding(key, constant("1")).build();
            let err = inflator
                .inflate_new_target(&fragment, InflationFlags::empty())
                .err().unwrap();
            assert!(matches!(err, Error::Directive { .. }), "{key}: {err}");
        }
    }

    #[test]
    fn auto_attach() {
        let auto = CountingFactory::new("auto", DirectiveKind::Attribute, PropertyFormat::ImplicitValue).auto_attach();
        let auto_counts = auto.counts();
        let manual = CountingFactory::new("manual", DirectiveKind::Attribute, PropertyFormat::None).auto_attach();
        let manual_counts = manual.counts();

        let mut inflator = Inflator::new();
        inflator.add_directive(auto, DirectiveFlags::empty());
        inflator.add_directive(manual, DirectiveFlags::NO_AUTO_ATTACH);

        let target = test_object();
        inflator.inflate_existing_target(&target, &fragment().build(), InflationFlags::empty()).unwrap();
        inflator.inflate_existing_target(&target, &fragment().build(), InflationFlags::empty()).unwrap();

        assert_eq!(auto_counts.get(), (1, 2, 0));
        assert_eq!(auto_counts.last_value("value"), Some(Value::from("")));
        assert_eq!(manual_counts.get(), (0, 0, 0));
    }

    #[test]
    fn explicit_directives_are_not_auto_attached() {
        let explicit = CountingFactory::new("explicit", DirectiveKind::Attribute, PropertyFormat::Explicit).auto_attach();
        let counts = explicit.counts();
        let mut inflator = Inflator::new();
        inflator.add_directive(explicit, DirectiveFlags::empty());

        inflator.inflate_new_target(&fragment().build(), InflationFlags::empty()).unwrap();
        assert_eq!(counts.get(), (0, 0, 0));
    }

    #[test]
    fn structural_directive_wraps_child() {
        let (mut inflator, adapter) = inflator_with_adapter();
        let factory = CountingFactory::new("pass", DirectiveKind::Structural, PropertyFormat::ImplicitValue);
        let counts = factory.counts();
        inflator.add_directive(factory, DirectiveFlags::empty());

        let fragment = fragment()
            .child(fragment().binding("__pass", constant("go")).binding("value", constant("4")).build())
            .build();
        let target = inflator.inflate_new_target(&fragment, InflationFlags::empty()).unwrap();
        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();

        assert_eq!(counts.get(), (1, 2, 0));
        assert_eq!(counts.last_value("value"), Some(Value::from("go")));
        let children = adapter.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].get_property("value"), Some(Value::Int(4)));
    }

    #[test]
    fn failed_pass_restores_structural_properties() {
        let (mut inflator, _adapter) = inflator_with_adapter();
        let factory = CountingFactory::new("pass", DirectiveKind::Structural, PropertyFormat::ImplicitValue);
        let counts = factory.counts();
        inflator.add_directive(factory, DirectiveFlags::empty());
        let target = test_object();

        let good = fragment()
            .child(fragment().binding("__pass", constant("go")).build())
            .build();
        let bad = fragment()
            .child(fragment().binding("__pass", constant("stop")).binding("nope", constant("1")).build())
            .build();

        inflator.inflate_existing_target(&target, &good, InflationFlags::empty()).unwrap();
        assert!(inflator.inflate_existing_target(&target, &bad, InflationFlags::empty()).is_err());
        assert_eq!(counts.last_value("value"), Some(Value::from("go")));
        assert_eq!(counts.get(), (1, 1, 0));
    }

    #[derive(Default)]
    struct Repeat {
        times: usize,
    }

    impl Directive for Repeat {
        fn property_type(&self, name: &str) -> Option<ValueType> {
            (name == IMPLICIT_PROPERTY).then_some(ValueType::Int)
        }

        fn set_property(&mut self, _: &str, value: Value) -> Result<()> {
            self.times = value.as_int().unwrap_or(0).max(0) as usize;
            Ok(())
        }
    }

    impl StructuralDirective for Repeat {
        fn apply(
            &mut self,
            inflator: &Inflator,
            parent: &HostRef,
            position: usize,
            child: &Fragment,
            flags: InflationFlags,
        ) -> Result<()> {
            for key in 0..self.times {
                inflator.inflate_keyed_child(parent, position, key, child, flags)?;
            }
            Ok(())
        }
    }

    struct RepeatFactory;

    impl DirectiveFactory for RepeatFactory {
        fn name(&self) -> &str {
            "repeat"
        }

        fn kind(&self) -> DirectiveKind {
            DirectiveKind::Structural
        }

        fn property_format(&self) -> PropertyFormat {
            PropertyFormat::ImplicitValue
        }

        fn create(&self) -> DirectiveInstance {
            DirectiveInstance::structural(Repeat::default())
        }
    }

    #[test]
    fn structural_directive_duplicates_child() {
        let (mut inflator, adapter) = inflator_with_adapter();
        inflator.add_directive(RepeatFactory, DirectiveFlags::empty());
        let target = test_object();
        let repeated = |times: &str| {
            fragment()
                .child(Fragment::builder(&INNER_OBJECT, location(2)).build())
                .child(fragment().binding("__repeat", constant(times)).build())
                .build()
        };

        inflator.inflate_existing_target(&target, &repeated("3"), InflationFlags::empty()).unwrap();
        let first = adapter.children();
        assert_eq!(first.len(), 4);
        assert_eq!(first[0].type_info().name, "InnerObject");
        assert!(first[1..].iter().all(|c| c.type_info().name == "TestObject"));

        inflator.inflate_existing_target(&target, &repeated("2"), InflationFlags::empty()).unwrap();
        let second = adapter.children();
        assert_eq!(second.len(), 3);
        for (a, b) in first.iter().zip(&second) {
            assert!(same_object(a, b));
        }
        assert_eq!(adapter.removes(), 1);
    }

    #[test]
    fn structural_directive_used_as_attribute() {
        let mut inflator = Inflator::new();
        inflator.add_directive(
            CountingFactory::new("pass", DirectiveKind::Structural, PropertyFormat::None),
            DirectiveFlags::empty(),
        );
        let fragment = fragment().binding("_pass", constant("")).build();
        let err = inflator
            .inflate_new_target(&fragment, InflationFlags::empty())
            .err().unwrap();
        assert!(matches!(err, Error::Directive { .. }));
    }

    #[test]
    fn signal_binding() {
        let inflator = Inflator::new();
        let fragment = fragment()
            .binding(
                "on.poked",
                Binding::expression(
                    Expression::signal(
                        location(1),
                        Some(Expression::property(location(1), None, "self")),
                        "ping",
                        None,
                        vec![],
                    ),
                    false,
                ),
            )
            .build();

        let target = test_object();
        inflator.context().insert("self", target.clone());
        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();

        target.emit("poked", None, &[]).unwrap();
        target.emit("poked", None, &[]).unwrap();
        assert_eq!(target.get_property("emissions"), Some(Value::Int(2)));
    }

    #[test]
    fn signal_arguments_are_visible() {
        let scope = test_object();
        let inflator = Inflator::with_scope(scope.clone());
        let fragment = fragment()
            .binding("on.echo-signal", name("$1"))
            .build();

        let target = test_object();
        inflator.inflate_existing_target(&target, &fragment, InflationFlags::empty()).unwrap();

        let result = target
            .emit("echo-signal", None, &[Value::Int(1), Value::from("arg")])
            .unwrap();
        // The class handler runs last and wins
        assert_eq!(result, Some(Value::from("1:arg")));
    }
}
