use std::rc::Rc;

use trellis_core::container::ContainerAdapter;
use trellis_core::object::TypeInfo;

use crate::types::{BOX, WINDOW};

pub use self::list::ListAdapter;
pub use self::single::SingleAdapter;

mod list;
mod single;

/// The adapter for `target_type`, if widgets of that type hold children.
pub fn adapter_for(target_type: &TypeInfo) -> Option<Rc<dyn ContainerAdapter>> {
    if target_type.is_a(&WINDOW) {
        Some(Rc::new(SingleAdapter))
    } else if target_type.is_a(&BOX) {
        Some(Rc::new(ListAdapter))
    } else {
        None
    }
}
