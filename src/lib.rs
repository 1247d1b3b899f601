//! Declarative object trees that stay bound to the data they were inflated from.
//!
//! ```text
//! compiler  ─ parses attribute text into bindings
//! core      ─ fragments, expressions, directives and the inflator
//! widgets   ─ a small widget set with container adapters and `if`
//! runtime   ─ reactive re-inflation and an event loop
//! ```
pub use trellis_compiler as compiler;
pub use trellis_core::*;
pub use trellis_runtime as runtime;
pub use trellis_widgets as widgets;

pub mod prelude {
    pub use trellis_compiler::{parse_binding, parse_expression};
    pub use trellis_core::object::{Object, ObjectRef, PropertyHost, SignalHost};
    pub use trellis_core::{Fragment, InflationFlags, Inflator, SourceLocation, Value};
    pub use trellis_runtime::{ReactiveInflator, Runtime, Template};
    pub use trellis_widgets::{register_types, standard_directives};
}
