//! A small widget toolkit for fragments to be inflated into, with the
//! container adapters and directives that go with it.
pub use self::directives::{standard_directives, ContainerDirectiveFactory, IfDirectiveFactory};
pub use self::layout::{adapter_for, ListAdapter, SingleAdapter};
pub use self::types::{register_types, BOX, BUTTON, LABEL, WIDGET, WINDOW};
pub use self::widget::Widget;

pub mod directives;
pub mod layout;
mod types;
mod widget;
