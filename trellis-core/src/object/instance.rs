use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{
    HandlerId, NotifyHandler, Object, PropertyHost, PropertySpec, SignalHandler, SignalHost,
    SignalSpec, TypeInfo,
};
use crate::error::{Error, Result};
use crate::host::HostSlot;
use crate::values::{Value, ValueType};

pub type ClassHandler = Rc<dyn Fn(&Instance, &[Value]) -> Option<Value>>;

// -----------------------------------------------------------------------------
//   - Class -
// -----------------------------------------------------------------------------
/// Runtime description of the properties and signals of a type.
pub struct Class {
    info: &'static TypeInfo,
    properties: IndexMap<String, PropertySpec>,
    signals: IndexMap<String, (SignalSpec, Option<ClassHandler>)>,
}

impl Class {
    pub fn builder(info: &'static TypeInfo) -> ClassBuilder {
        ClassBuilder {
            class: Class {
                info,
                properties: IndexMap::new(),
                signals: IndexMap::new(),
            },
        }
    }

    pub fn info(&self) -> &'static TypeInfo {
        self.info
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertySpec> {
        self.properties.values()
    }

    pub fn signal(&self, name: &str) -> Option<&SignalSpec> {
        self.signals.get(name).map(|(spec, _)| spec)
    }
}

pub struct ClassBuilder {
    class: Class,
}

impl ClassBuilder {
    /// Inherit every property and signal of `parent`.
    pub fn extends(mut self, parent: &Class) -> Self {
        for (name, spec) in &parent.properties {
            self.class.properties.insert(name.clone(), spec.clone());
        }
        for (name, signal) in &parent.signals {
            self.class.signals.insert(name.clone(), signal.clone());
        }
        self
    }

    pub fn property(self, name: &str, value_type: ValueType, default: impl Into<Value>) -> Self {
        self.add_property(name, value_type, default.into(), true)
    }

    pub fn read_only_property(self, name: &str, value_type: ValueType, default: impl Into<Value>) -> Self {
        self.add_property(name, value_type, default.into(), false)
    }

    fn add_property(mut self, name: &str, value_type: ValueType, default: Value, writable: bool) -> Self {
        let spec = PropertySpec {
            name: name.to_string(),
            value_type,
            default,
            writable,
        };
        self.class.properties.insert(name.to_string(), spec);
        self
    }

    pub fn signal(self, name: &str, params: &[ValueType], returns: Option<ValueType>) -> Self {
        self.add_signal(name, params, returns, false, None)
    }

    pub fn detailed_signal(self, name: &str, params: &[ValueType], returns: Option<ValueType>) -> Self {
        self.add_signal(name, params, returns, true, None)
    }

    /// A signal with a class handler that runs after every connected handler.
    pub fn signal_with_handler(
        self,
        name: &str,
        params: &[ValueType],
        returns: Option<ValueType>,
        handler: impl Fn(&Instance, &[Value]) -> Option<Value> + 'static,
    ) -> Self {
        self.add_signal(name, params, returns, false, Some(Rc::new(handler)))
    }

    fn add_signal(
        mut self,
        name: &str,
        params: &[ValueType],
        returns: Option<ValueType>,
        detailed: bool,
        handler: Option<ClassHandler>,
    ) -> Self {
        let spec = SignalSpec {
            name: name.to_string(),
            params: params.to_vec(),
            returns,
            detailed,
        };
        self.class.signals.insert(name.to_string(), (spec, handler));
        self
    }

    pub fn build(self) -> Rc<Class> {
        Rc::new(self.class)
    }
}

// -----------------------------------------------------------------------------
//   - Instance -
// -----------------------------------------------------------------------------
struct SignalConnection {
    id: HandlerId,
    signal: String,
    detail: Option<String>,
    handler: SignalHandler,
}

/// A generic object whose shape is described by a [`Class`].
pub struct Instance {
    class: Rc<Class>,
    values: RefCell<HashMap<String, Value>>,
    notify_handlers: RefCell<Vec<(HandlerId, String, NotifyHandler)>>,
    signal_handlers: RefCell<Vec<SignalConnection>>,
    host: HostSlot,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            values: RefCell::new(HashMap::new()),
            notify_handlers: RefCell::new(vec![]),
            signal_handlers: RefCell::new(vec![]),
            host: HostSlot::default(),
        }
    }

    pub fn new_ref(class: Rc<Class>) -> Rc<Self> {
        Rc::new(Self::new(class))
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    /// Store a value without the writability check. Used by the owner of the object.
    pub fn store(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let spec = self.spec(name)?;
        self.store_checked(spec, value.into())
    }

    pub fn handler_count(&self) -> usize {
        self.notify_handlers.borrow().len() + self.signal_handlers.borrow().len()
    }

    fn spec(&self, name: &str) -> Result<&PropertySpec> {
        self.class.property(name).ok_or_else(|| Error::UndefinedProperty {
            type_name: self.class.info.name.to_string(),
            name: name.to_string(),
        })
    }

    fn store_checked(&self, spec: &PropertySpec, value: Value) -> Result<()> {
        let value = value.convert(spec.value_type).map_err(|err| Error::PropertyType {
            type_name: self.class.info.name.to_string(),
            name: spec.name.clone(),
            expected: spec.value_type,
            reason: err.to_string(),
        })?;

        let changed = {
            let mut values = self.values.borrow_mut();
            let current = values.get(&spec.name).unwrap_or(&spec.default);
            if *current == value {
                false
            } else {
                values.insert(spec.name.clone(), value);
                true
            }
        };

        // Setting an equal value is not a change
        if changed {
            self.notify(&spec.name);
        }

        Ok(())
    }

    pub fn notify(&self, name: &str) {
        let handlers = self
            .notify_handlers
            .borrow()
            .iter()
            .filter(|(_, property, _)| property == name)
            .map(|(_, _, handler)| handler.clone())
            .collect::<Vec<_>>();

        for handler in handlers {
            handler(name);
        }
    }
}

impl PropertyHost for Instance {
    fn find_property(&self, name: &str) -> Option<PropertySpec> {
        self.class.property(name).cloned()
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        let spec = self.class.property(name)?;
        let value = self
            .values
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| spec.default.clone());
        Some(value)
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        let spec = self.spec(name)?;
        if !spec.writable {
            return Err(Error::ReadOnlyProperty {
                type_name: self.class.info.name.to_string(),
                name: name.to_string(),
            });
        }
        self.store_checked(spec, value)
    }

    fn connect_notify(&self, property: &str, handler: NotifyHandler) -> HandlerId {
        let id = HandlerId::next();
        self.notify_handlers
            .borrow_mut()
            .push((id, property.to_string(), handler));
        id
    }
}

impl SignalHost for Instance {
    fn find_signal(&self, name: &str) -> Option<SignalSpec> {
        self.class.signal(name).cloned()
    }

    fn emit(&self, signal: &str, detail: Option<&str>, args: &[Value]) -> Result<Option<Value>> {
        let Some((_, class_handler)) = self.class.signals.get(signal) else {
            return Err(Error::UnknownSignal {
                type_name: self.class.info.name.to_string(),
                name: signal.to_string(),
            });
        };

        let handlers = self
            .signal_handlers
            .borrow()
            .iter()
            .filter(|conn| conn.signal == signal)
            .filter(|conn| conn.detail.is_none() || conn.detail.as_deref() == detail)
            .map(|conn| conn.handler.clone())
            .collect::<Vec<_>>();

        let mut result = None;
        for handler in handlers {
            if let Some(value) = handler(args) {
                result = Some(value);
            }
        }

        if let Some(class_handler) = class_handler {
            if let Some(value) = class_handler(self, args) {
                result = Some(value);
            }
        }

        Ok(result)
    }

    fn connect_signal(
        &self,
        signal: &str,
        detail: Option<&str>,
        handler: SignalHandler,
    ) -> Result<HandlerId> {
        if self.class.signal(signal).is_none() {
            return Err(Error::UnknownSignal {
                type_name: self.class.info.name.to_string(),
                name: signal.to_string(),
            });
        }

        let id = HandlerId::next();
        self.signal_handlers.borrow_mut().push(SignalConnection {
            id,
            signal: signal.to_string(),
            detail: detail.map(str::to_string),
            handler,
        });
        Ok(id)
    }
}

impl Object for Instance {
    fn type_info(&self) -> &'static TypeInfo {
        self.class.info
    }

    fn host_slot(&self) -> &HostSlot {
        &self.host
    }

    fn disconnect(&self, id: HandlerId) {
        self.notify_handlers.borrow_mut().retain(|(handler_id, _, _)| *handler_id != id);
        self.signal_handlers.borrow_mut().retain(|conn| conn.id != id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use super::*;

    static THING: TypeInfo = TypeInfo {
        name: "Thing",
        parent: None,
        construct: None,
    };

    fn class() -> Rc<Class> {
        Class::builder(&THING)
            .property("size", ValueType::Int, 1)
            .read_only_property("id", ValueType::String, "thing")
            .signal_with_handler("sum", &[ValueType::Int, ValueType::Int], Some(ValueType::Int), |_, args| {
                let a = args[0].as_int()?;
                let b = args[1].as_int()?;
                Some(Value::Int(a + b))
            })
            .detailed_signal("poked", &[], None)
            .build()
    }

    #[test]
    fn defaults_and_set() {
        let thing = Instance::new(class());
        assert_eq!(thing.get_property("size"), Some(Value::Int(1)));
        thing.set_property("size", Value::from("4")).unwrap();
        assert_eq!(thing.get_property("size"), Some(Value::Int(4)));
        assert_eq!(thing.get_property("nope"), None);
    }

    #[test]
    fn read_only_and_bad_type() {
        let thing = Instance::new(class());
        assert!(matches!(
            thing.set_property("id", Value::from("x")),
            Err(Error::ReadOnlyProperty { .. })
        ));
        assert!(matches!(
            thing.set_property("size", Value::from("big")),
            Err(Error::PropertyType { .. })
        ));
        thing.store("id", "other").unwrap();
        assert_eq!(thing.get_property("id"), Some(Value::from("other")));
    }

    #[test]
    fn notify_only_on_change() {
        let thing = Instance::new(class());
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let id = thing.connect_notify("size", Rc::new(move |_: &str| counter.set(counter.get() + 1)));

        thing.set_property("size", Value::Int(1)).unwrap();
        assert_eq!(count.get(), 0);
        thing.set_property("size", Value::Int(2)).unwrap();
        assert_eq!(count.get(), 1);

        thing.disconnect(id);
        thing.set_property("size", Value::Int(3)).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn emit_with_class_handler() {
        let thing = Instance::new(class());
        let result = thing.emit("sum", None, &[Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(result, Some(Value::Int(5)));
        assert!(thing.emit("missing", None, &[]).is_err());
    }

    #[test]
    fn detailed_handlers_filter_on_detail() {
        let thing = Instance::new(class());
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        thing
            .connect_signal("poked", Some("left"), Rc::new(move |_: &[Value]| {
                counter.set(counter.get() + 1);
                None
            }))
            .unwrap();

        thing.emit("poked", Some("right"), &[]).unwrap();
        assert_eq!(count.get(), 0);
        thing.emit("poked", Some("left"), &[]).unwrap();
        assert_eq!(count.get(), 1);
    }
}
