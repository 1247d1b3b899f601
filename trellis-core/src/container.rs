use crate::error::Result;
use crate::object::{ObjectRef, TypeInfo};

/// Strategy that places children into a container object.
///
/// `add_child` is also used to move a child that the container already holds;
/// the child ends up at `position` among the container's children.
pub trait ContainerAdapter {
    fn add_child(&self, container: &ObjectRef, position: usize, child: &ObjectRef) -> Result<()>;

    fn remove_child(&self, container: &ObjectRef, child: &ObjectRef) -> Result<()>;

    /// Can this adapter manage containers of type `target_type`?
    fn accepts(&self, target_type: &TypeInfo) -> bool;

    fn name(&self) -> &'static str {
        "[container]"
    }
}
