use std::cell::RefCell;
use std::rc::Rc;

use self::diff::IncrementalDiff;
use self::signals::SignalBindings;
use crate::binding::Binding;
use crate::container::ContainerAdapter;
use crate::directive::{DirectiveInstance, DirectiveKind};
use crate::error::{Error, Result};
use crate::expression::ExpressionContext;
use crate::object::{same_object, Object, ObjectRef, PropertyHost, TypeInfo, WeakObjectRef};
use crate::values::{PropertySet, Value, ValueHolder};

mod diff;
mod signals;

pub type HostRef = Rc<RefCell<FragmentHost>>;

/// Children are keyed by the position of their fragment and a key within that
/// position, so one fragment can produce several children.
type ChildKey = (usize, usize);

/// Where an object keeps its fragment host.
#[derive(Default)]
pub struct HostSlot {
    host: RefCell<Option<HostRef>>,
}

impl HostSlot {
    pub fn get(&self) -> Option<HostRef> {
        self.host.borrow().clone()
    }

    fn set(&self, host: HostRef) {
        *self.host.borrow_mut() = Some(host);
    }
}

// -----------------------------------------------------------------------------
//   - Fragment host -
// -----------------------------------------------------------------------------
/// The reconciliation state of one target object.
///
/// Every inflation pass is a transaction: `begin_inflation`, a number of
/// `add_*` calls staging the new state, then `commit_inflation` (or
/// `abort_inflation`). Whatever was committed by the previous pass and not
/// staged again is a leftover and gets removed at commit.
///
/// A pass that fails applies nothing: no directive hook runs, no directive
/// property changes and the container adapter stays as it was.
pub struct FragmentHost {
    target: WeakObjectRef,
    target_type: &'static TypeInfo,
    inflating: bool,
    applied_properties: PropertySet,
    staged_properties: PropertySet,
    children: IncrementalDiff<ChildKey, ObjectRef>,
    attribute_directives: IncrementalDiff<String, DirectiveInstance>,
    property_directives: IncrementalDiff<usize, (String, DirectiveInstance)>,
    structural_directives: IncrementalDiff<usize, (String, DirectiveInstance)>,
    replaced_directives: Vec<DirectiveInstance>,
    applied_directive_properties: Vec<(DirectiveInstance, String, Value)>,
    staged_directive_properties: Vec<StagedDirectiveProperty>,
    signals: SignalBindings,
    container_adapter: Option<Rc<dyn ContainerAdapter>>,
    committed_adapter: Option<Rc<dyn ContainerAdapter>>,
}

struct StagedDirectiveProperty {
    directive: DirectiveInstance,
    name: String,
    value: Value,
    applied: bool,
}

impl FragmentHost {
    /// Create a host for `target`, replacing any existing one.
    pub fn new(target: &ObjectRef) -> HostRef {
        let host = Self {
            target: Rc::downgrade(target),
            target_type: target.type_info(),
            inflating: false,
            applied_properties: PropertySet::new(),
            staged_properties: PropertySet::new(),
            children: IncrementalDiff::new(),
            attribute_directives: IncrementalDiff::new(),
            property_directives: IncrementalDiff::new(),
            structural_directives: IncrementalDiff::new(),
            replaced_directives: vec![],
            applied_directive_properties: vec![],
            staged_directive_properties: vec![],
            signals: SignalBindings::default(),
            container_adapter: None,
            committed_adapter: None,
        };

        let host = Rc::new(RefCell::new(host));
        target.host_slot().set(host.clone());
        host
    }

    pub fn for_target(target: &ObjectRef) -> Option<HostRef> {
        target.host_slot().get()
    }

    pub fn ensure(target: &ObjectRef) -> HostRef {
        Self::for_target(target).unwrap_or_else(|| Self::new(target))
    }

    pub fn target(&self) -> Option<ObjectRef> {
        self.target.upgrade()
    }

    pub fn target_type(&self) -> &'static TypeInfo {
        self.target_type
    }

    pub fn is_inflating(&self) -> bool {
        self.inflating
    }

    pub fn applied_properties(&self) -> &PropertySet {
        &self.applied_properties
    }

    pub fn container_adapter(&self) -> Option<Rc<dyn ContainerAdapter>> {
        self.container_adapter.clone()
    }

    pub fn set_container_adapter(&mut self, adapter: Option<Rc<dyn ContainerAdapter>>) {
        self.container_adapter = adapter;
    }

    /// Children in sibling order, as of the last commit (or as staged so far during a pass).
    pub fn children(&self) -> Vec<ObjectRef> {
        let mut children = self.children.entries().collect::<Vec<_>>();
        children.sort_by_key(|(key, _)| **key);
        children.into_iter().map(|(_, child)| child.clone()).collect()
    }

    pub fn attribute_directive(&self, name: &str) -> Option<DirectiveInstance> {
        self.attribute_directives.staged(&name.to_string()).cloned()
    }

    pub fn signal_binding_count(&self) -> usize {
        self.signals.len()
    }

    fn assert_inflating(&self, operation: &str) {
        assert!(
            self.inflating,
            "{operation} called on the host of '{}' outside of an inflation",
            self.target_type.name
        );
    }

    // -------------------------------------------------------------------------
    //   - Staging -
    // -------------------------------------------------------------------------
    pub fn begin_inflation(&mut self) {
        assert!(
            !self.inflating,
            "the host of '{}' is already inflating",
            self.target_type.name
        );

        #[cfg(feature = "logging")]
        log::debug!("begin inflation of '{}'", self.target_type.name);

        self.inflating = true;
        self.staged_properties.clear();
        self.replaced_directives.clear();
        self.staged_directive_properties.clear();
        self.committed_adapter = self.container_adapter.clone();
        self.children.begin();
        self.attribute_directives.begin();
        self.property_directives.begin();
        self.structural_directives.begin();
        self.signals.begin();
    }

    pub fn add_property(&mut self, name: impl Into<String>, value: ValueHolder) {
        self.assert_inflating("add_property");
        self.staged_properties.insert(name, value);
    }

    pub fn get_leftover_child(&self, position: usize) -> Option<ObjectRef> {
        self.get_leftover_keyed_child(position, 0)
    }

    pub fn get_leftover_keyed_child(&self, position: usize, key: usize) -> Option<ObjectRef> {
        self.assert_inflating("get_leftover_child");
        self.children.leftover(&(position, key)).cloned()
    }

    pub fn add_inflated_child(&mut self, position: usize, child: ObjectRef) {
        self.add_keyed_child(position, 0, child);
    }

    /// Stage `child` as the `key`th child produced by the fragment at `position`.
    /// Siblings are ordered by position, then key.
    ///
    /// # Panics
    ///
    /// Panics if the slot was already staged in this pass.
    pub fn add_keyed_child(&mut self, position: usize, key: usize, child: ObjectRef) {
        self.assert_inflating("add_inflated_child");
        let slot = (position, key);

        assert!(
            self.children.staged(&slot).is_none(),
            "child {position}:{key} of '{}' staged twice in one inflation",
            self.target_type.name
        );

        // A reused child is no longer a leftover
        if let Some(leftover) = self.children.leftover(&slot) {
            if same_object(leftover, &child) {
                self.children.take_leftover(&slot);
            }
        }

        self.children.stage(slot, child);
    }

    pub fn get_leftover_attribute_directive(&self, name: &str) -> Option<DirectiveInstance> {
        self.assert_inflating("get_leftover_attribute_directive");
        self.attribute_directives.leftover(&name.to_string()).cloned()
    }

    /// Stage an attribute directive. A leftover with the same name is reused in
    /// favour of a different instance. Returns the staged instance.
    pub fn add_attribute_directive(&mut self, name: &str, directive: DirectiveInstance) -> DirectiveInstance {
        self.assert_inflating("add_attribute_directive");
        let key = name.to_string();

        if let Some(staged) = self.attribute_directives.staged(&key) {
            return staged.clone();
        }

        let directive = match self.attribute_directives.take_leftover(&key) {
            Some(leftover) => {
                if !leftover.same(&directive) {
                    #[cfg(feature = "logging")]
                    log::warn!("directive '{name}' reused instead of replaced");
                }
                leftover
            }
            None => directive,
        };

        self.attribute_directives.stage(key, directive.clone());
        directive
    }

    pub fn get_leftover_property_directive(&self, position: usize, name: &str) -> Option<DirectiveInstance> {
        self.assert_inflating("get_leftover_property_directive");
        match self.property_directives.leftover(&position) {
            Some((leftover_name, directive)) if leftover_name == name => Some(directive.clone()),
            _ => None,
        }
    }

    pub fn add_property_directive(
        &mut self,
        position: usize,
        name: &str,
        directive: DirectiveInstance,
    ) -> DirectiveInstance {
        self.assert_inflating("add_property_directive");
        Self::stage_positional(
            &mut self.property_directives,
            &mut self.replaced_directives,
            position,
            name,
            directive,
        )
    }

    pub fn get_leftover_structural_directive(&self, position: usize, name: &str) -> Option<DirectiveInstance> {
        self.assert_inflating("get_leftover_structural_directive");
        match self.structural_directives.leftover(&position) {
            Some((leftover_name, directive)) if leftover_name == name => Some(directive.clone()),
            _ => None,
        }
    }

    pub fn add_structural_directive(
        &mut self,
        position: usize,
        name: &str,
        directive: DirectiveInstance,
    ) -> DirectiveInstance {
        self.assert_inflating("add_structural_directive");
        Self::stage_positional(
            &mut self.structural_directives,
            &mut self.replaced_directives,
            position,
            name,
            directive,
        )
    }

    fn stage_positional(
        directives: &mut IncrementalDiff<usize, (String, DirectiveInstance)>,
        replaced: &mut Vec<DirectiveInstance>,
        position: usize,
        name: &str,
        directive: DirectiveInstance,
    ) -> DirectiveInstance {
        if let Some((staged_name, staged)) = directives.staged(&position) {
            if staged_name == name {
                return staged.clone();
            }
        }

        let directive = match directives.take_leftover(&position) {
            Some((leftover_name, leftover)) if leftover_name == name => leftover,
            Some((_, leftover)) => {
                replaced.push(leftover);
                directive
            }
            None => directive,
        };

        directives.stage(position, (name.to_string(), directive.clone()));
        directive
    }

    /// Stage a directive property for the commit. Structural directives decide
    /// the children of the running pass, so they get the value right away and
    /// an aborted pass puts back the committed one.
    pub fn add_directive_property(
        &mut self,
        directive: &DirectiveInstance,
        name: &str,
        value: Value,
    ) -> Result<()> {
        self.assert_inflating("add_directive_property");

        let applied = directive.kind() == DirectiveKind::Structural;
        if applied {
            directive.set_property(name, value.clone())?;
        }

        self.staged_directive_properties.push(StagedDirectiveProperty {
            directive: directive.clone(),
            name: name.to_string(),
            value,
            applied,
        });
        Ok(())
    }

    /// Connect `binding` to the signal named by `key` (`signal` or `signal::detail`) at commit.
    pub fn add_signal_binding(&mut self, key: &str, binding: Binding, context: ExpressionContext) {
        self.assert_inflating("add_signal_binding");
        self.signals.stage(key, binding, context);
    }

    // -------------------------------------------------------------------------
    //   - Commit -
    // -------------------------------------------------------------------------
    pub fn abort_inflation(&mut self) {
        self.assert_inflating("abort_inflation");

        #[cfg(feature = "logging")]
        log::debug!("abort inflation of '{}'", self.target_type.name);

        self.restore_directive_properties();
        self.replaced_directives.clear();
        self.attribute_directives.abort();
        self.property_directives.abort();
        self.structural_directives.abort();
        self.container_adapter = self.committed_adapter.take();
        self.staged_properties.clear();
        self.children.abort();
        self.signals.abort();
        self.inflating = false;
    }

    fn restore_directive_properties(&mut self) {
        let staged = std::mem::take(&mut self.staged_directive_properties);
        for staged in staged.iter().rev().filter(|staged| staged.applied) {
            let committed = self
                .applied_directive_properties
                .iter()
                .find(|(directive, name, _)| directive.same(&staged.directive) && *name == staged.name);

            if let Some((_, _, value)) = committed {
                if let Err(_err) = staged.directive.set_property(&staged.name, value.clone()) {
                    #[cfg(feature = "logging")]
                    log::warn!("restoring directive property '{}' failed: {_err}", staged.name);
                }
            }
        }
    }

    /// Apply the staged state. Everything that can fail is checked before the
    /// first change, so a failing commit aborts the pass and leaves the target
    /// and its directives untouched.
    pub fn commit_inflation(&mut self) -> Result<()> {
        self.assert_inflating("commit_inflation");

        let target = match self.target() {
            Some(target) => target,
            None => {
                self.abort_inflation();
                return Err(Error::ObjectDropped);
            }
        };

        let prepared = self
            .validate(&target)
            .and_then(|_| self.prepare_container_adapter())
            .and_then(|_| self.apply_directive_properties());
        if let Err(err) = prepared {
            self.abort_inflation();
            return Err(err);
        }

        self.committed_adapter = None;
        self.run_directive_lifecycle();
        self.commit_directive_properties();
        self.apply_properties(&target);
        let signals = self.signals.commit(&target);
        let children = self.apply_children(&target);
        self.inflating = false;

        #[cfg(feature = "logging")]
        log::debug!("committed inflation of '{}'", self.target_type.name);

        signals.and(children)
    }

    fn validate(&self, target: &ObjectRef) -> Result<()> {
        for (name, holder) in self.staged_properties.iter() {
            let spec = target.find_property(name).ok_or_else(|| Error::UndefinedProperty {
                type_name: self.target_type.name.to_string(),
                name: name.to_string(),
            })?;

            if !spec.writable {
                return Err(Error::ReadOnlyProperty {
                    type_name: self.target_type.name.to_string(),
                    name: name.to_string(),
                });
            }

            if let Err(err) = holder.value().clone().convert(spec.value_type) {
                return Err(Error::PropertyType {
                    type_name: self.target_type.name.to_string(),
                    name: name.to_string(),
                    expected: spec.value_type,
                    reason: err.to_string(),
                });
            }
        }

        self.signals.validate(target)
    }

    fn staged_directives(&self) -> Vec<DirectiveInstance> {
        let positional = [&self.property_directives, &self.structural_directives];
        self.attribute_directives
            .values()
            .cloned()
            .chain(positional.into_iter().flat_map(|diff| diff.values().map(|(_, d)| d.clone())))
            .collect()
    }

    /// Let the staged directives provide an adapter if there is none, and
    /// fail if there are children to place without one.
    fn prepare_container_adapter(&mut self) -> Result<()> {
        if self.container_adapter.is_none() {
            let directives = self.staged_directives();
            self.container_adapter = directives
                .iter()
                .find_map(|directive| directive.provide_container_adapter(self));
        }

        let has_children = !self.children.is_empty() || self.children.has_leftovers();
        if has_children && self.container_adapter.is_none() {
            return Err(Error::MissingContainerAdapter {
                type_name: self.target_type.name.to_string(),
            });
        }
        Ok(())
    }

    fn apply_directive_properties(&mut self) -> Result<()> {
        for staged in self.staged_directive_properties.iter_mut().filter(|s| !s.applied) {
            staged.directive.set_property(&staged.name, staged.value.clone())?;
            staged.applied = true;
        }
        Ok(())
    }

    fn commit_directive_properties(&mut self) {
        let staged = std::mem::take(&mut self.staged_directive_properties);
        for StagedDirectiveProperty { directive, name, value, .. } in staged {
            self.applied_directive_properties
                .retain(|(d, n, _)| !(d.same(&directive) && *n == name));
            self.applied_directive_properties.push((directive, name, value));
        }

        let active = self.staged_directives();
        self.applied_directive_properties
            .retain(|(d, _, _)| active.iter().any(|a| a.same(d)));
    }

    fn run_directive_lifecycle(&mut self) {
        let mut active = vec![];

        for (name, directive) in self.attribute_directives.entries() {
            let is_new = match self.attribute_directives.previous(name) {
                Some(previous) => !previous.same(directive),
                None => true,
            };
            active.push((directive.clone(), is_new));
        }

        for diff in [&self.property_directives, &self.structural_directives] {
            for (position, (_, directive)) in diff.entries() {
                let is_new = match diff.previous(position) {
                    Some((_, previous)) => !previous.same(directive),
                    None => true,
                };
                active.push((directive.clone(), is_new));
            }
        }

        let mut detached = std::mem::take(&mut self.replaced_directives);
        detached.extend(self.attribute_directives.commit());
        detached.extend(self.property_directives.commit().into_iter().map(|(_, d)| d));
        detached.extend(self.structural_directives.commit().into_iter().map(|(_, d)| d));

        for directive in detached {
            directive.detach(self);
        }

        for (directive, is_new) in active {
            if is_new {
                directive.attach(self);
            }
            directive.update(self);
        }
    }

    fn apply_properties(&mut self, target: &ObjectRef) {
        let staged = std::mem::take(&mut self.staged_properties);
        let diff = self.applied_properties.diff_keys(&staged);

        for name in &diff.removed {
            if let Some(spec) = target.find_property(name) {
                if let Err(_err) = target.set_property(name, spec.default) {
                    #[cfg(feature = "logging")]
                    log::warn!("resetting '{name}' of '{}' failed: {_err}", self.target_type.name);
                }
            }
        }

        for (name, holder) in staged.iter() {
            if let Err(_err) = target.set_property(name, holder.value().clone()) {
                #[cfg(feature = "logging")]
                log::warn!("setting '{name}' of '{}' failed: {_err}", self.target_type.name);
            }
        }

        self.applied_properties = staged;
    }

    fn apply_children(&mut self, target: &ObjectRef) -> Result<()> {
        let mut order = self.children.previous_values().cloned().collect::<Vec<_>>();
        let removed = self.children.commit();
        let staged = self.children();

        if staged.is_empty() && removed.is_empty() {
            return Ok(());
        }

        let adapter = self
            .container_adapter
            .clone()
            .ok_or_else(|| Error::MissingContainerAdapter {
                type_name: self.target_type.name.to_string(),
            })?;

        let is_staged = |child: &ObjectRef| staged.iter().any(|s| same_object(s, child));

        for child in removed.iter().filter(|child| !is_staged(*child)) {
            adapter.remove_child(target, child)?;
        }

        // Only touch children that are not already in place
        order.retain(|child| is_staged(child));
        for (index, child) in staged.iter().enumerate() {
            if order.get(index).map_or(false, |c| same_object(c, child)) {
                continue;
            }

            if let Some(current) = order.iter().position(|c| same_object(c, child)) {
                order.remove(current);
            }
            order.insert(index, child.clone());
            adapter.add_child(target, index, child)?;
        }

        Ok(())
    }
}
