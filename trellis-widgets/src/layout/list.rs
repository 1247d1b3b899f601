use trellis_core::container::ContainerAdapter;
use trellis_core::error::{Error, Result};
use trellis_core::object::{Object, ObjectRef, TypeInfo};

use crate::types::{WIDGET, WINDOW};
use crate::widget::as_widget;

/// Keeps any number of children in order. Used for every widget but windows.
pub struct ListAdapter;

impl ContainerAdapter for ListAdapter {
    fn add_child(&self, container: &ObjectRef, position: usize, child: &ObjectRef) -> Result<()> {
        let parent = as_widget(container, self.name())?;
        parent.place_child(container, position, child)
    }

    fn remove_child(&self, container: &ObjectRef, child: &ObjectRef) -> Result<()> {
        let parent = as_widget(container, self.name())?;
        match parent.take_child(child) {
            true => Ok(()),
            false => Err(Error::Container {
                container: parent.kind().to_string(),
                message: format!("'{}' is not one of its children", child.type_info().name),
            }),
        }
    }

    fn accepts(&self, target_type: &TypeInfo) -> bool {
        target_type.is_a(&WIDGET) && !target_type.is_a(&WINDOW)
    }

    fn name(&self) -> &'static str {
        "list"
    }
}
