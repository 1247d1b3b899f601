use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::object::{same_object, HandlerId, ObjectRef, PropertyHost, WeakObjectRef};
use crate::values::Value;

type Callback = Rc<dyn Fn()>;

struct Dependency {
    object: WeakObjectRef,
    property: String,
    handler: HandlerId,
}

#[derive(Default)]
struct ContextState {
    scopes: RefCell<Vec<ObjectRef>>,
    overlay: RefCell<HashMap<String, Value>>,
    dependencies: RefCell<Vec<Dependency>>,
    changed_fired: Cell<bool>,
    changed_handlers: RefCell<Vec<(HandlerId, Callback)>>,
    reset_handlers: RefCell<Vec<(HandlerId, Callback)>>,
}

impl ContextState {
    fn notify_changed(&self) {
        if self.changed_fired.replace(true) {
            return;
        }

        let handlers = collect(&self.changed_handlers);
        for handler in handlers {
            handler();
        }
    }

    fn disconnect_dependencies(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.borrow_mut());
        for dep in dependencies {
            if let Some(object) = dep.object.upgrade() {
                object.disconnect(dep.handler);
            }
        }
    }
}

impl Drop for ContextState {
    fn drop(&mut self) {
        self.disconnect_dependencies();
    }
}

fn collect(handlers: &RefCell<Vec<(HandlerId, Callback)>>) -> Vec<Callback> {
    handlers.borrow().iter().map(|(_, cb)| cb.clone()).collect()
}

// -----------------------------------------------------------------------------
//   - Expression context -
// -----------------------------------------------------------------------------
/// Name resolution and dependency tracking for expression evaluation.
///
/// Names resolve against the overlay first, then against the scope objects,
/// most recently added scope first.
///
/// Cloning a context copies the scopes and the overlay but starts with no
/// dependencies and no handlers.
pub struct ExpressionContext {
    state: Rc<ContextState>,
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self {
            state: Rc::new(ContextState::default()),
        }
    }

    pub fn with_scope(scope: ObjectRef) -> Self {
        let ctx = Self::new();
        ctx.add_scope(scope);
        ctx
    }

    pub fn add_scope(&self, scope: ObjectRef) {
        self.state.scopes.borrow_mut().push(scope);
    }

    pub fn scopes(&self) -> Vec<ObjectRef> {
        self.state.scopes.borrow().clone()
    }

    /// The most recently added scope.
    pub fn default_scope(&self) -> Option<ObjectRef> {
        self.state.scopes.borrow().last().cloned()
    }

    /// Set an overlay name. This counts as a change.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.state
            .overlay
            .borrow_mut()
            .insert(name.into(), value.into());
        self.state.notify_changed();
    }

    /// Overlay names are fixed values and have no owning object.
    pub fn find_name(&self, name: &str) -> Option<(Value, Option<ObjectRef>)> {
        if let Some(value) = self.state.overlay.borrow().get(name) {
            return Some((value.clone(), None));
        }

        let scope = self.find_object_with_property(name)?;
        let value = scope.get_property(name)?;
        Some((value, Some(scope)))
    }

    pub fn find_object_with_property(&self, name: &str) -> Option<ObjectRef> {
        self.state
            .scopes
            .borrow()
            .iter()
            .rev()
            .find(|scope| scope.find_property(name).is_some())
            .cloned()
    }

    /// Record a dependency on `property` of `object`. Tracking the same pair twice is a no-op.
    pub fn track(&self, object: &ObjectRef, property: &str) {
        let already_tracked = self.state.dependencies.borrow().iter().any(|dep| {
            dep.property == property
                && dep
                    .object
                    .upgrade()
                    .map(|tracked| same_object(&tracked, object))
                    .unwrap_or(false)
        });

        if already_tracked {
            return;
        }

        let state: Weak<ContextState> = Rc::downgrade(&self.state);
        let handler = object.connect_notify(
            property,
            Rc::new(move |_: &str| {
                if let Some(state) = state.upgrade() {
                    state.notify_changed();
                }
            }),
        );

        self.state.dependencies.borrow_mut().push(Dependency {
            object: Rc::downgrade(object),
            property: property.to_string(),
            handler,
        });
    }

    pub fn dependency_count(&self) -> usize {
        self.state.dependencies.borrow().len()
    }

    /// Drop every dependency and re-arm the "changed" notification.
    pub fn reset_dependencies(&self) {
        self.state.disconnect_dependencies();
        self.state.changed_fired.set(false);

        let handlers = collect(&self.state.reset_handlers);
        for handler in handlers {
            handler();
        }
    }

    /// `handler` runs once per change episode, until the next reset.
    pub fn connect_changed(&self, handler: impl Fn() + 'static) -> HandlerId {
        let id = HandlerId::next();
        self.state
            .changed_handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));
        id
    }

    pub fn connect_reset(&self, handler: impl Fn() + 'static) -> HandlerId {
        let id = HandlerId::next();
        self.state
            .reset_handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));
        id
    }

    pub fn disconnect(&self, id: HandlerId) {
        self.state.changed_handlers.borrow_mut().retain(|(h, _)| *h != id);
        self.state.reset_handlers.borrow_mut().retain(|(h, _)| *h != id);
    }
}

impl Default for ExpressionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ExpressionContext {
    fn clone(&self) -> Self {
        let state = ContextState {
            scopes: RefCell::new(self.state.scopes.borrow().clone()),
            overlay: RefCell::new(self.state.overlay.borrow().clone()),
            dependencies: RefCell::new(vec![]),
            changed_fired: Cell::new(false),
            changed_handlers: RefCell::new(vec![]),
            reset_handlers: RefCell::new(vec![]),
        };

        Self {
            state: Rc::new(state),
        }
    }
}
