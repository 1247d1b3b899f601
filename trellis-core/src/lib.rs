//! Declarative fragments bound onto live objects.
//!
//! A [`Fragment`] describes what a target object should look like: property
//! bindings, signal bindings, directives and child fragments. An [`Inflator`]
//! applies a fragment to a target, and applying it again only changes what
//! differs from the previous pass.
pub mod binding;
pub mod container;
pub mod directive;
pub mod error;
pub mod expression;
pub mod fragment;
pub mod host;
pub mod inflator;
pub mod location;
pub mod object;
pub mod values;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use binding::{Binding, BindingBuilder, BindingPart};
pub use container::ContainerAdapter;
pub use directive::{
    Directive, DirectiveFactory, DirectiveFlags, DirectiveInstance, DirectiveKind, PropertyFormat,
    StructuralDirective,
};
pub use error::{Error, Result};
pub use expression::{EvaluationFlags, Expression, ExpressionContext, ExpressionKind};
pub use fragment::{BindingTarget, Fragment, FragmentBuilder};
pub use host::{FragmentHost, HostRef, HostSlot};
pub use inflator::{InflationFlags, Inflator};
pub use location::SourceLocation;
pub use object::{Object, ObjectRef, PropertyHost, SignalHost, TypeInfo};
pub use values::{Value, ValueHolder, ValueType};
