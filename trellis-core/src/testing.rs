//! Objects, directives and adapters for tests.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::container::ContainerAdapter;
use crate::directive::{
    Directive, DirectiveFactory, DirectiveInstance, DirectiveKind, PropertyFormat, StructuralDirective,
};
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::host::{FragmentHost, HostRef};
use crate::inflator::{InflationFlags, Inflator};
use crate::location::SourceLocation;
use crate::object::{same_object, Class, Instance, Object, ObjectRef, PropertyHost, TypeInfo};
use crate::values::{Value, ValueType};

pub static TEST_OBJECT: TypeInfo = TypeInfo {
    name: "TestObject",
    parent: None,
    construct: Some(test_object),
};

pub static INNER_OBJECT: TypeInfo = TypeInfo {
    name: "InnerObject",
    parent: None,
    construct: Some(inner_object),
};

thread_local! {
    static TEST_CLASS: Rc<Class> = Class::builder(&TEST_OBJECT)
        .property("value", ValueType::Int, 10)
        .property("inner", ValueType::Object, Value::Empty)
        .property("text", ValueType::String, "")
        .property("flag", ValueType::Bool, false)
        .property("emissions", ValueType::Int, 0)
        .signal_with_handler(
            "echo-signal",
            &[ValueType::Int, ValueType::String],
            Some(ValueType::String),
            |_, args| Some(Value::String(format!("{}:{}", args[0], args[1]))),
        )
        .signal_with_handler("ping", &[], None, |instance, _| {
            let count = instance
                .get_property("emissions")
                .and_then(|v| v.as_int())
                .unwrap_or(0);
            let _ = instance.store("emissions", count + 1);
            None
        })
        .detailed_signal("poked", &[], None)
        .build();

    static INNER_CLASS: Rc<Class> = Class::builder(&INNER_OBJECT)
        .property("value", ValueType::String, "string")
        .build();
}

/// A `TestObject` with its own `InnerObject` in the `inner` property.
pub fn test_object() -> ObjectRef {
    let object = Instance::new_ref(TEST_CLASS.with(Rc::clone));
    let _ = object.store("inner", inner_object());
    object
}

pub fn inner_object() -> ObjectRef {
    Instance::new_ref(INNER_CLASS.with(Rc::clone))
}

pub fn location(line: u32) -> SourceLocation {
    SourceLocation::new(Some("test.ui"), line, 1)
}

// -----------------------------------------------------------------------------
//   - Directives -
// -----------------------------------------------------------------------------
#[derive(Debug, Default)]
pub struct DirectiveCounts {
    attached: Cell<usize>,
    updated: Cell<usize>,
    detached: Cell<usize>,
    values: RefCell<Vec<(String, Value)>>,
}

impl DirectiveCounts {
    /// `(attached, updated, detached)`
    pub fn get(&self) -> (usize, usize, usize) {
        (self.attached.get(), self.updated.get(), self.detached.get())
    }

    pub fn values(&self) -> Vec<(String, Value)> {
        self.values.borrow().clone()
    }

    pub fn last_value(&self, name: &str) -> Option<Value> {
        self.values
            .borrow()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

/// Counts lifecycle calls and records the properties it is given.
/// As a structural directive it inflates the child unchanged.
#[derive(Debug, Default)]
pub struct CountingDirective {
    counts: Rc<DirectiveCounts>,
}

impl CountingDirective {
    pub fn counts(&self) -> Rc<DirectiveCounts> {
        self.counts.clone()
    }
}

impl Directive for CountingDirective {
    fn property_type(&self, name: &str) -> Option<ValueType> {
        match name {
            "value" | "text" => Some(ValueType::String),
            "count" => Some(ValueType::Int),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        self.counts.values.borrow_mut().push((name.to_string(), value));
        Ok(())
    }

    fn attach(&mut self, _: &mut FragmentHost) {
        self.counts.attached.set(self.counts.attached.get() + 1);
    }

    fn update(&mut self, _: &mut FragmentHost) {
        self.counts.updated.set(self.counts.updated.get() + 1);
    }

    fn detach(&mut self, _: &mut FragmentHost) {
        self.counts.detached.set(self.counts.detached.get() + 1);
    }
}

impl StructuralDirective for CountingDirective {
    fn apply(
        &mut self,
        inflator: &Inflator,
        parent: &HostRef,
        position: usize,
        child: &Fragment,
        flags: InflationFlags,
    ) -> Result<()> {
        inflator.inflate_child(parent, position, child, flags)
    }
}

/// Creates [`CountingDirective`]s that share one set of counts.
pub struct CountingFactory {
    name: String,
    kind: DirectiveKind,
    format: PropertyFormat,
    auto_attach: bool,
    counts: Rc<DirectiveCounts>,
}

impl CountingFactory {
    pub fn new(name: &str, kind: DirectiveKind, format: PropertyFormat) -> Self {
        Self {
            name: name.to_string(),
            kind,
            format,
            auto_attach: false,
            counts: Rc::default(),
        }
    }

    pub fn auto_attach(mut self) -> Self {
        self.auto_attach = true;
        self
    }

    pub fn counts(&self) -> Rc<DirectiveCounts> {
        self.counts.clone()
    }
}

impl DirectiveFactory for CountingFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DirectiveKind {
        self.kind
    }

    fn property_format(&self) -> PropertyFormat {
        self.format
    }

    fn create(&self) -> DirectiveInstance {
        let directive = CountingDirective {
            counts: self.counts.clone(),
        };
        match self.kind {
            DirectiveKind::Attribute => DirectiveInstance::attribute(directive),
            DirectiveKind::Property => DirectiveInstance::property(directive),
            DirectiveKind::Structural => DirectiveInstance::structural(directive),
        }
    }

    fn should_auto_attach(&self, _: &FragmentHost, _: &Fragment) -> bool {
        self.auto_attach
    }
}

// -----------------------------------------------------------------------------
//   - Container -
// -----------------------------------------------------------------------------
/// Keeps children in a list and counts the calls made to it.
#[derive(Default)]
pub struct RecordingAdapter {
    children: RefCell<Vec<ObjectRef>>,
    adds: Cell<usize>,
    removes: Cell<usize>,
}

impl RecordingAdapter {
    pub fn children(&self) -> Vec<ObjectRef> {
        self.children.borrow().clone()
    }

    pub fn adds(&self) -> usize {
        self.adds.get()
    }

    pub fn removes(&self) -> usize {
        self.removes.get()
    }
}

impl ContainerAdapter for RecordingAdapter {
    fn add_child(&self, _: &ObjectRef, position: usize, child: &ObjectRef) -> Result<()> {
        let mut children = self.children.borrow_mut();
        children.retain(|c| !same_object(c, child));
        let position = position.min(children.len());
        children.insert(position, child.clone());
        self.adds.set(self.adds.get() + 1);
        Ok(())
    }

    fn remove_child(&self, container: &ObjectRef, child: &ObjectRef) -> Result<()> {
        let mut children = self.children.borrow_mut();
        let Some(index) = children.iter().position(|c| same_object(c, child)) else {
            return Err(Error::Container {
                container: container.type_info().name.to_string(),
                message: "not a child of this container".into(),
            });
        };
        children.remove(index);
        self.removes.set(self.removes.get() + 1);
        Ok(())
    }

    fn accepts(&self, _: &TypeInfo) -> bool {
        true
    }
}

/// Auto-attaches to fragments with children and installs a shared [`RecordingAdapter`].
pub struct RecordingAdapterFactory {
    adapter: Rc<RecordingAdapter>,
}

impl RecordingAdapterFactory {
    pub fn new() -> Self {
        Self {
            adapter: Rc::default(),
        }
    }

    pub fn adapter(&self) -> Rc<RecordingAdapter> {
        self.adapter.clone()
    }
}

impl Default for RecordingAdapterFactory {
    fn default() -> Self {
        Self::new()
    }
}

struct InstallAdapter(Rc<RecordingAdapter>);

impl Directive for InstallAdapter {
    fn set_property(&mut self, name: &str, _: Value) -> Result<()> {
        Err(Error::directive(
            SourceLocation::unknown(),
            format!("no property '{name}'"),
        ))
    }

    fn provide_container_adapter(&mut self, _: &FragmentHost) -> Option<Rc<dyn ContainerAdapter>> {
        Some(self.0.clone())
    }
}

impl DirectiveFactory for RecordingAdapterFactory {
    fn name(&self) -> &str {
        "test.adapter"
    }

    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Attribute
    }

    fn create(&self) -> DirectiveInstance {
        DirectiveInstance::attribute(InstallAdapter(self.adapter.clone()))
    }

    fn should_auto_attach(&self, host: &FragmentHost, fragment: &Fragment) -> bool {
        host.container_adapter().is_none() && !fragment.children().is_empty()
    }
}
