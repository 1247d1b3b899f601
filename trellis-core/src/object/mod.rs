use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::host::HostSlot;
use crate::values::{Value, ValueType};

pub use self::instance::{Class, ClassBuilder, Instance};
pub use self::registry::{register_type, resolve_type, GlobalTypes, TypeResolver};

mod instance;
mod registry;

pub type ObjectRef = Rc<dyn Object>;
pub type WeakObjectRef = Weak<dyn Object>;
pub type NotifyHandler = Rc<dyn Fn(&str)>;
pub type SignalHandler = Rc<dyn Fn(&[Value]) -> Option<Value>>;

/// Identity comparison for reference counted values, ignoring vtables.
pub fn same_rc<T: ?Sized>(lhs: &Rc<T>, rhs: &Rc<T>) -> bool {
    std::ptr::eq(Rc::as_ptr(lhs) as *const (), Rc::as_ptr(rhs) as *const ())
}

pub fn same_object(lhs: &ObjectRef, rhs: &ObjectRef) -> bool {
    same_rc(lhs, rhs)
}

// -----------------------------------------------------------------------------
//   - Handler id -
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// -----------------------------------------------------------------------------
//   - Type info -
// -----------------------------------------------------------------------------
/// Static description of an object type.
pub struct TypeInfo {
    pub name: &'static str,
    pub parent: Option<&'static TypeInfo>,
    pub construct: Option<fn() -> ObjectRef>,
}

impl TypeInfo {
    pub fn is_a(&self, other: &TypeInfo) -> bool {
        let mut current = Some(self);
        while let Some(info) = current {
            if info == other {
                return true;
            }
            current = info.parent;
        }
        false
    }

    pub fn instantiate(&self) -> Result<ObjectRef> {
        match self.construct {
            Some(construct) => Ok(construct()),
            None => Err(Error::NotInstantiable {
                type_name: self.name.to_string(),
            }),
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.name == other.name
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo({})", self.name)
    }
}

// -----------------------------------------------------------------------------
//   - Specs -
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub value_type: ValueType,
    pub default: Value,
    pub writable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub name: String,
    pub params: Vec<ValueType>,
    /// `None` for signals without a return value
    pub returns: Option<ValueType>,
    pub detailed: bool,
}

// -----------------------------------------------------------------------------
//   - Capabilities -
// -----------------------------------------------------------------------------
pub trait PropertyHost {
    fn find_property(&self, name: &str) -> Option<PropertySpec>;

    fn get_property(&self, name: &str) -> Option<Value>;

    fn set_property(&self, name: &str, value: Value) -> Result<()>;

    /// Call `handler` with the property name whenever `property` changes.
    fn connect_notify(&self, property: &str, handler: NotifyHandler) -> HandlerId;
}

pub trait SignalHost {
    fn find_signal(&self, name: &str) -> Option<SignalSpec>;

    fn emit(&self, signal: &str, detail: Option<&str>, args: &[Value]) -> Result<Option<Value>>;

    fn connect_signal(
        &self,
        signal: &str,
        detail: Option<&str>,
        handler: SignalHandler,
    ) -> Result<HandlerId>;
}

pub trait Object: PropertyHost + SignalHost + 'static {
    fn type_info(&self) -> &'static TypeInfo;

    /// Storage for the object's fragment host.
    fn host_slot(&self) -> &HostSlot;

    /// Remove a notify or signal handler.
    fn disconnect(&self, id: HandlerId);

    fn as_any(&self) -> &dyn Any;
}

impl dyn Object {
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn is_a(&self, info: &TypeInfo) -> bool {
        self.type_info().is_a(info)
    }
}
