use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::container::ContainerAdapter;
use crate::error::Result;
use crate::fragment::Fragment;
use crate::host::{FragmentHost, HostRef};
use crate::inflator::{InflationFlags, Inflator};
use crate::object::same_rc;
use crate::values::{Value, ValueType};

bitflags! {
    pub struct DirectiveFlags: u32 {
        /// Never attach the directive unless a fragment names it
        const NO_AUTO_ATTACH = 0b1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Attached to a target, keyed by name
    Attribute,
    /// Attached to a target, keyed by the position of its binding
    Property,
    /// Decides how a child fragment is inflated
    Structural,
}

/// How a directive binding key maps onto directive properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFormat {
    /// `_name` with no value
    None,
    /// `_name="..."` sets the `value` property
    ImplicitValue,
    /// `_name.property="..."`
    Explicit,
}

pub const IMPLICIT_PROPERTY: &str = "value";

/// Behaviour attached to a target object for the lifetime of its fragment bindings.
pub trait Directive {
    /// Type of a settable property, `None` if there is no such property.
    fn property_type(&self, _name: &str) -> Option<ValueType> {
        None
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<()>;

    /// The adapter this directive gives a host that has none. Asked at commit,
    /// before any lifecycle hook runs.
    fn provide_container_adapter(&mut self, _host: &FragmentHost) -> Option<Rc<dyn ContainerAdapter>> {
        None
    }

    /// Called once, before the first `update`.
    fn attach(&mut self, _host: &mut FragmentHost) {}

    /// Called on every pass that keeps the directive.
    fn update(&mut self, _host: &mut FragmentHost) {}

    /// Called once when a pass no longer names the directive.
    fn detach(&mut self, _host: &mut FragmentHost) {}
}

pub trait StructuralDirective: Directive {
    /// Inflate `child` (or not) into `parent` at `position`.
    fn apply(
        &mut self,
        inflator: &Inflator,
        parent: &HostRef,
        position: usize,
        child: &Fragment,
        flags: InflationFlags,
    ) -> Result<()>;
}

pub type DirectiveRef = Rc<RefCell<dyn Directive>>;
pub type StructuralDirectiveRef = Rc<RefCell<dyn StructuralDirective>>;

// -----------------------------------------------------------------------------
//   - Instance -
// -----------------------------------------------------------------------------
#[derive(Clone)]
pub enum DirectiveInstance {
    Attribute(DirectiveRef),
    Property(DirectiveRef),
    Structural(StructuralDirectiveRef),
}

impl DirectiveInstance {
    pub fn attribute(directive: impl Directive + 'static) -> Self {
        Self::Attribute(Rc::new(RefCell::new(directive)))
    }

    pub fn property(directive: impl Directive + 'static) -> Self {
        Self::Property(Rc::new(RefCell::new(directive)))
    }

    pub fn structural(directive: impl StructuralDirective + 'static) -> Self {
        Self::Structural(Rc::new(RefCell::new(directive)))
    }

    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::Attribute(_) => DirectiveKind::Attribute,
            Self::Property(_) => DirectiveKind::Property,
            Self::Structural(_) => DirectiveKind::Structural,
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &DirectiveInstance) -> bool {
        match (self, other) {
            (Self::Attribute(a), Self::Attribute(b)) | (Self::Property(a), Self::Property(b)) => same_rc(a, b),
            (Self::Structural(a), Self::Structural(b)) => same_rc(a, b),
            _ => false,
        }
    }

    pub fn property_type(&self, name: &str) -> Option<ValueType> {
        match self {
            Self::Attribute(d) | Self::Property(d) => d.borrow().property_type(name),
            Self::Structural(d) => d.borrow().property_type(name),
        }
    }

    pub fn set_property(&self, name: &str, value: Value) -> Result<()> {
        match self {
            Self::Attribute(d) | Self::Property(d) => d.borrow_mut().set_property(name, value),
            Self::Structural(d) => d.borrow_mut().set_property(name, value),
        }
    }

    pub(crate) fn provide_container_adapter(&self, host: &FragmentHost) -> Option<Rc<dyn ContainerAdapter>> {
        match self {
            Self::Attribute(d) | Self::Property(d) => d.borrow_mut().provide_container_adapter(host),
            Self::Structural(d) => d.borrow_mut().provide_container_adapter(host),
        }
    }

    pub fn as_structural(&self) -> Option<&StructuralDirectiveRef> {
        match self {
            Self::Structural(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn attach(&self, host: &mut FragmentHost) {
        match self {
            Self::Attribute(d) | Self::Property(d) => d.borrow_mut().attach(host),
            Self::Structural(d) => d.borrow_mut().attach(host),
        }
    }

    pub(crate) fn update(&self, host: &mut FragmentHost) {
        match self {
            Self::Attribute(d) | Self::Property(d) => d.borrow_mut().update(host),
            Self::Structural(d) => d.borrow_mut().update(host),
        }
    }

    pub(crate) fn detach(&self, host: &mut FragmentHost) {
        match self {
            Self::Attribute(d) | Self::Property(d) => d.borrow_mut().detach(host),
            Self::Structural(d) => d.borrow_mut().detach(host),
        }
    }
}

// -----------------------------------------------------------------------------
//   - Factory -
// -----------------------------------------------------------------------------
pub trait DirectiveFactory {
    fn name(&self) -> &str;

    fn kind(&self) -> DirectiveKind;

    fn property_format(&self) -> PropertyFormat {
        PropertyFormat::None
    }

    /// Create a new directive. The instance must be of the factory's kind.
    fn create(&self) -> DirectiveInstance;

    /// Attach the directive to `fragment` even though the fragment does not name it.
    fn should_auto_attach(&self, _host: &FragmentHost, _fragment: &Fragment) -> bool {
        false
    }
}
