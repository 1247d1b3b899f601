use std::rc::Rc;

use trellis_core::fragment::Fragment;
use trellis_core::inflator::Inflator;
use trellis_core::object::ObjectRef;

use crate::ReactiveInflator;

/// A fragment that can be inflated onto any number of targets.
#[derive(Clone)]
pub struct Template {
    fragment: Rc<Fragment>,
}

impl Template {
    pub fn new(fragment: impl Into<Rc<Fragment>>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }

    pub fn fragment(&self) -> &Rc<Fragment> {
        &self.fragment
    }

    /// The returned inflator has not run a pass yet.
    pub fn create_inflator(&self, target: ObjectRef) -> ReactiveInflator {
        ReactiveInflator::new(self.fragment.clone(), target)
    }

    pub fn create_inflator_with(&self, inflator: Inflator, target: ObjectRef) -> ReactiveInflator {
        ReactiveInflator::with_inflator(inflator, self.fragment.clone(), target)
    }
}
