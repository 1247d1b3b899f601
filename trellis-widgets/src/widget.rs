use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use trellis_core::error::{Error, Result};
use trellis_core::host::HostSlot;
use trellis_core::object::{
    same_object, Class, HandlerId, Instance, NotifyHandler, Object, ObjectRef, PropertyHost, PropertySpec,
    SignalHandler, SignalHost, SignalSpec, TypeInfo, WeakObjectRef,
};
use trellis_core::values::Value;

/// A toolkit object: an [`Instance`] of one of the widget classes that
/// also keeps an ordered list of children and a link to its parent.
///
/// Children are only placed by container adapters.
pub struct Widget {
    instance: Instance,
    children: RefCell<Vec<ObjectRef>>,
    parent: RefCell<Option<WeakObjectRef>>,
}

impl Widget {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            instance: Instance::new(class),
            children: RefCell::new(vec![]),
            parent: RefCell::new(None),
        }
    }

    pub fn new_ref(class: Rc<Class>) -> ObjectRef {
        Rc::new(Self::new(class))
    }

    /// The type name, for messages.
    pub fn kind(&self) -> &'static str {
        self.type_info().name
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn parent(&self) -> Option<ObjectRef> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn children(&self) -> Vec<ObjectRef> {
        self.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<ObjectRef> {
        self.children.borrow().first().cloned()
    }

    pub fn last_child(&self) -> Option<ObjectRef> {
        self.children.borrow().last().cloned()
    }

    pub fn next_sibling(&self) -> Option<ObjectRef> {
        self.sibling(1)
    }

    pub fn prev_sibling(&self) -> Option<ObjectRef> {
        self.sibling(-1)
    }

    fn sibling(&self, offset: isize) -> Option<ObjectRef> {
        let parent = self.parent()?;
        let parent = parent.downcast_ref::<Widget>()?;
        let children = parent.children.borrow();
        let index = children.iter().position(|child| self.is(child))?;
        let index = index.checked_add_signed(offset)?;
        children.get(index).cloned()
    }

    fn is(&self, object: &ObjectRef) -> bool {
        std::ptr::eq(Rc::as_ptr(object) as *const (), self as *const Self as *const ())
    }

    /// Insert `child` at `position` (clamped), moving it if it is already a
    /// child of this or another widget.
    pub(crate) fn place_child(&self, this: &ObjectRef, position: usize, child: &ObjectRef) -> Result<()> {
        let child_widget = as_widget(child, self.kind())?;
        if child_widget.is(this) {
            return Err(Error::Container {
                container: self.kind().to_string(),
                message: "a widget can not contain itself".into(),
            });
        }

        if let Some(old_parent) = child_widget.parent() {
            if !same_object(&old_parent, this) {
                if let Some(old_parent) = old_parent.downcast_ref::<Widget>() {
                    old_parent.take_child(child);
                }
            }
        }

        {
            let mut children = self.children.borrow_mut();
            children.retain(|c| !same_object(c, child));
            let position = position.min(children.len());
            children.insert(position, child.clone());
        }

        *child_widget.parent.borrow_mut() = Some(Rc::downgrade(this));
        Ok(())
    }

    /// Remove `child`, returning false if it is not a child of this widget.
    pub(crate) fn take_child(&self, child: &ObjectRef) -> bool {
        let removed = {
            let mut children = self.children.borrow_mut();
            match children.iter().position(|c| same_object(c, child)) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            if let Some(widget) = child.downcast_ref::<Widget>() {
                *widget.parent.borrow_mut() = None;
            }
        }

        removed
    }
}

pub(crate) fn as_widget<'a>(object: &'a ObjectRef, container: &str) -> Result<&'a Widget> {
    object.downcast_ref::<Widget>().ok_or_else(|| Error::Container {
        container: container.to_string(),
        message: format!("'{}' is not a widget", object.type_info().name),
    })
}

// -----------------------------------------------------------------------------
//   - Object -
// -----------------------------------------------------------------------------
impl PropertyHost for Widget {
    fn find_property(&self, name: &str) -> Option<PropertySpec> {
        self.instance.find_property(name)
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.instance.get_property(name)
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.instance.set_property(name, value)
    }

    fn connect_notify(&self, property: &str, handler: NotifyHandler) -> HandlerId {
        self.instance.connect_notify(property, handler)
    }
}

impl SignalHost for Widget {
    fn find_signal(&self, name: &str) -> Option<SignalSpec> {
        self.instance.find_signal(name)
    }

    fn emit(&self, signal: &str, detail: Option<&str>, args: &[Value]) -> Result<Option<Value>> {
        self.instance.emit(signal, detail, args)
    }

    fn connect_signal(
        &self,
        signal: &str,
        detail: Option<&str>,
        handler: SignalHandler,
    ) -> Result<HandlerId> {
        self.instance.connect_signal(signal, detail, handler)
    }
}

impl Object for Widget {
    fn type_info(&self) -> &'static TypeInfo {
        self.instance.type_info()
    }

    fn host_slot(&self) -> &HostSlot {
        self.instance.host_slot()
    }

    fn disconnect(&self, id: HandlerId) {
        self.instance.disconnect(id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{new_box, new_label};

    #[test]
    fn siblings() {
        let parent = new_box();
        let a = new_label();
        let b = new_label();

        let widget = as_widget(&parent, "test").unwrap();
        widget.place_child(&parent, 0, &a).unwrap();
        widget.place_child(&parent, 1, &b).unwrap();

        let a_widget = as_widget(&a, "test").unwrap();
        let b_widget = as_widget(&b, "test").unwrap();
        assert!(same_object(&a_widget.parent().unwrap(), &parent));
        assert!(same_object(&a_widget.next_sibling().unwrap(), &b));
        assert!(same_object(&b_widget.prev_sibling().unwrap(), &a));
        assert!(b_widget.next_sibling().is_none());
        assert!(a_widget.prev_sibling().is_none());
        assert!(same_object(&widget.first_child().unwrap(), &a));
        assert!(same_object(&widget.last_child().unwrap(), &b));
    }

    #[test]
    fn moving_between_parents() {
        let first = new_box();
        let second = new_box();
        let child = new_label();

        let first_widget = as_widget(&first, "test").unwrap();
        let second_widget = as_widget(&second, "test").unwrap();
        first_widget.place_child(&first, 0, &child).unwrap();
        second_widget.place_child(&second, 0, &child).unwrap();

        assert_eq!(first_widget.child_count(), 0);
        assert_eq!(second_widget.child_count(), 1);
        let parent = as_widget(&child, "test").unwrap().parent().unwrap();
        assert!(same_object(&parent, &second));
    }

    #[test]
    fn take_child_clears_parent() {
        let parent = new_box();
        let child = new_label();
        let widget = as_widget(&parent, "test").unwrap();
        widget.place_child(&parent, 0, &child).unwrap();

        assert!(widget.take_child(&child));
        assert!(!widget.take_child(&child));
        assert!(as_widget(&child, "test").unwrap().parent().is_none());
    }

    #[test]
    fn properties_are_delegated() {
        let label = new_label();
        label.set_property("label", Value::from("hi")).unwrap();
        assert_eq!(label.get_property("label"), Some(Value::from("hi")));
        assert_eq!(label.get_property("visible"), Some(Value::Bool(true)));
        assert!(label.downcast_ref::<Widget>().is_some());
    }
}
