use trellis_core::container::ContainerAdapter;
use trellis_core::error::{Error, Result};
use trellis_core::object::{same_object, Object, ObjectRef, TypeInfo};

use crate::types::WINDOW;
use crate::widget::as_widget;

/// Holds at most one child.
pub struct SingleAdapter;

impl ContainerAdapter for SingleAdapter {
    fn add_child(&self, container: &ObjectRef, _: usize, child: &ObjectRef) -> Result<()> {
        let parent = as_widget(container, self.name())?;
        match parent.first_child() {
            Some(current) if same_object(&current, child) => Ok(()),
            Some(current) => Err(Error::Container {
                container: parent.kind().to_string(),
                message: format!(
                    "can only hold one child, already holds a '{}'",
                    current.type_info().name
                ),
            }),
            None => parent.place_child(container, 0, child),
        }
    }

    fn remove_child(&self, container: &ObjectRef, child: &ObjectRef) -> Result<()> {
        let parent = as_widget(container, self.name())?;
        match parent.take_child(child) {
            true => Ok(()),
            false => Err(Error::Container {
                container: parent.kind().to_string(),
                message: format!("'{}' is not its child", child.type_info().name),
            }),
        }
    }

    fn accepts(&self, target_type: &TypeInfo) -> bool {
        target_type.is_a(&WINDOW)
    }

    fn name(&self) -> &'static str {
        "single"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{new_label, new_window};
    use crate::widget::Widget;

    #[test]
    fn one_child_only() {
        let window = new_window();
        let first = new_label();
        let second = new_label();

        SingleAdapter.add_child(&window, 0, &first).unwrap();
        SingleAdapter.add_child(&window, 0, &first).unwrap();
        assert!(matches!(
            SingleAdapter.add_child(&window, 1, &second),
            Err(Error::Container { .. })
        ));

        SingleAdapter.remove_child(&window, &first).unwrap();
        SingleAdapter.add_child(&window, 0, &second).unwrap();
        let widget = window.downcast_ref::<Widget>().unwrap();
        assert!(same_object(&widget.first_child().unwrap(), &second));
        assert_eq!(widget.child_count(), 1);
    }
}
