use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use trellis_core::error::Result;
use trellis_core::fragment::Fragment;
use trellis_core::inflator::{InflationFlags, Inflator};
use trellis_core::object::{HandlerId, Object, ObjectRef};

use crate::meta::Meta;

/// Passes run back to back when a pass changes its own dependencies.
const MAX_PASSES: usize = 16;

struct State {
    inflator: Inflator,
    fragment: RefCell<Rc<Fragment>>,
    target: ObjectRef,
    inflating: Cell<bool>,
    dirty: Cell<bool>,
    meta: RefCell<Meta>,
}

impl State {
    fn inflate(&self) -> Result<()> {
        if self.inflating.get() {
            self.dirty.set(true);
            return Ok(());
        }

        for pass in 1..=MAX_PASSES {
            self.dirty.set(false);
            self.inflating.set(true);

            let fragment = self.fragment.borrow().clone();
            let start = Instant::now();
            self.inflator.context().reset_dependencies();
            let result = self.inflator.inflate_existing_target(
                &self.target,
                &fragment,
                InflationFlags::TRACK_DEPENDENCIES,
            );

            let elapsed = start.elapsed();
            self.inflating.set(false);
            self.meta.borrow_mut().record(elapsed, result.is_err());
            log::debug!(
                "inflated '{}' in {elapsed:?} ({} dependencies)",
                self.target.type_info().name,
                self.inflator.context().dependency_count()
            );
            result?;

            if !self.dirty.get() {
                return Ok(());
            }

            if pass < MAX_PASSES {
                log::debug!("dependencies of '{}' changed while inflating", self.target.type_info().name);
            }
        }

        log::warn!(
            "'{}' kept changing its own dependencies, giving up after {MAX_PASSES} passes",
            self.target.type_info().name
        );
        Ok(())
    }
}

// -----------------------------------------------------------------------------
//   - Reactive inflator -
// -----------------------------------------------------------------------------
/// Keeps a target in sync with a fragment.
///
/// Every pass tracks the properties its bindings read. Once one of them
/// changes the fragment is inflated again. A change during a pass causes
/// another pass once the current one is done.
pub struct ReactiveInflator {
    state: Rc<State>,
    changed_handler: HandlerId,
}

impl ReactiveInflator {
    /// Inflate with `target` as the default scope.
    pub fn new(fragment: impl Into<Rc<Fragment>>, target: ObjectRef) -> Self {
        Self::with_inflator(Inflator::with_scope(target.clone()), fragment, target)
    }

    pub fn with_inflator(inflator: Inflator, fragment: impl Into<Rc<Fragment>>, target: ObjectRef) -> Self {
        let state = Rc::new(State {
            inflator,
            fragment: RefCell::new(fragment.into()),
            target,
            inflating: Cell::new(false),
            dirty: Cell::new(false),
            meta: RefCell::new(Meta::default()),
        });

        let weak = Rc::downgrade(&state);
        let changed_handler = state.inflator.context().connect_changed(move || {
            let Some(state) = weak.upgrade() else { return };
            if let Err(err) = state.inflate() {
                log::error!("inflating '{}' after a change failed: {err}", state.target.type_info().name);
            }
        });

        Self { state, changed_handler }
    }

    pub fn inflate(&self) -> Result<()> {
        self.state.inflate()
    }

    pub fn change_fragment_and_inflate(&self, fragment: impl Into<Rc<Fragment>>) -> Result<()> {
        *self.state.fragment.borrow_mut() = fragment.into();
        self.state.inflate()
    }

    pub fn fragment(&self) -> Rc<Fragment> {
        self.state.fragment.borrow().clone()
    }

    pub fn target(&self) -> &ObjectRef {
        &self.state.target
    }

    pub fn inflator(&self) -> &Inflator {
        &self.state.inflator
    }

    pub fn meta(&self) -> Meta {
        self.state.meta.borrow().clone()
    }
}

impl Drop for ReactiveInflator {
    fn drop(&mut self) {
        self.state.inflator.context().disconnect(self.changed_handler);
    }
}

#[cfg(test)]
mod test {
    use trellis_core::binding::Binding;
    use trellis_core::expression::Expression;
    use trellis_core::object::PropertyHost;
    use trellis_core::testing::{location, test_object, TEST_OBJECT};
    use trellis_core::values::Value;

    use super::*;

    fn mirror(property: &str, from: &str) -> Fragment {
        let binding = Binding::expression(Expression::property(location(1), None, from), false);
        Fragment::builder(&TEST_OBJECT, location(1))
            .binding(property, binding)
            .build()
    }

    #[test]
    fn reinflates_on_change() {
        let scope = test_object();
        let target = test_object();
        let inflator = ReactiveInflator::with_inflator(
            Inflator::with_scope(scope.clone()),
            mirror("value", "emissions"),
            target.clone(),
        );

        inflator.inflate().unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(0)));

        scope.set_property("emissions", Value::Int(5)).unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(5)));
        scope.set_property("emissions", Value::Int(6)).unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(6)));
        assert_eq!(inflator.meta().passes, 3);
    }

    #[test]
    fn untracked_changes_are_ignored() {
        let scope = test_object();
        let target = test_object();
        let inflator = ReactiveInflator::with_inflator(
            Inflator::with_scope(scope.clone()),
            mirror("value", "emissions"),
            target,
        );

        inflator.inflate().unwrap();
        scope.set_property("text", Value::from("x")).unwrap();
        assert_eq!(inflator.meta().passes, 1);
    }

    #[test]
    fn pass_changing_its_own_dependency() {
        let target = test_object();
        target.set_property("emissions", Value::Int(3)).unwrap();
        let inflator = ReactiveInflator::new(mirror("value", "emissions"), target.clone());

        inflator.inflate().unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(3)));
        assert_eq!(inflator.meta().passes, 1);

        // Dropping the `value` binding resets it to 10 while the pass reads it,
        // so a second pass picks up the reset value
        inflator.change_fragment_and_inflate(mirror("emissions", "value")).unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(10)));
        assert_eq!(target.get_property("emissions"), Some(Value::Int(10)));
        assert_eq!(inflator.meta().passes, 3);
    }

    #[test]
    fn change_fragment() {
        let target = test_object();
        let inflator = ReactiveInflator::new(mirror("text", "text"), target.clone());
        inflator.inflate().unwrap();

        let constant = Fragment::builder(&TEST_OBJECT, location(2))
            .binding("value", Binding::constant("42", location(2)))
            .build();
        inflator.change_fragment_and_inflate(constant).unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(42)));
        assert_eq!(inflator.fragment().location().line(), 2);
    }

    #[test]
    fn failed_pass_is_reported() {
        let target = test_object();
        let inflator = ReactiveInflator::new(mirror("value", "missing"), target);
        assert!(inflator.inflate().is_err());
        assert_eq!(inflator.meta().failures, 1);
    }

    #[test]
    fn dropped_inflator_stops_reacting() {
        let scope = test_object();
        let target = test_object();
        let inflator = ReactiveInflator::with_inflator(
            Inflator::with_scope(scope.clone()),
            mirror("value", "emissions"),
            target.clone(),
        );
        inflator.inflate().unwrap();
        drop(inflator);

        scope.set_property("emissions", Value::Int(9)).unwrap();
        assert_eq!(target.get_property("value"), Some(Value::Int(0)));
    }
}
