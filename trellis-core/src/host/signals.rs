use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::binding::Binding;
use crate::error::{Error, Result};
use crate::expression::ExpressionContext;
use crate::object::{HandlerId, Object, ObjectRef, SignalHost};
use crate::values::{Value, ValueType};

struct SignalSlot {
    binding: Binding,
    context: ExpressionContext,
}

struct Connection {
    id: HandlerId,
    slot: Rc<RefCell<SignalSlot>>,
}

/// Split `signal::detail`.
fn split_detail(key: &str) -> (&str, Option<&str>) {
    match key.split_once("::") {
        Some((signal, detail)) => (signal, Some(detail)),
        None => (key, None),
    }
}

/// Signal bindings of one host. Connections are made at commit and reused
/// by later passes, which only swap the binding they evaluate.
#[derive(Default)]
pub(crate) struct SignalBindings {
    connected: IndexMap<String, Connection>,
    staged: IndexMap<String, SignalSlot>,
}

impl SignalBindings {
    pub(crate) fn begin(&mut self) {
        self.staged.clear();
    }

    pub(crate) fn stage(&mut self, key: &str, binding: Binding, context: ExpressionContext) {
        self.staged
            .insert(key.to_string(), SignalSlot { binding, context });
    }

    pub(crate) fn abort(&mut self) {
        self.staged.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.connected.len()
    }

    pub(crate) fn validate(&self, target: &ObjectRef) -> Result<()> {
        for key in self.staged.keys() {
            let (signal, _) = split_detail(key);
            if target.find_signal(signal).is_none() {
                return Err(Error::UnknownSignal {
                    type_name: target.type_info().name.to_string(),
                    name: signal.to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn commit(&mut self, target: &ObjectRef) -> Result<()> {
        let stale = self
            .connected
            .keys()
            .filter(|key| !self.staged.contains_key(*key))
            .cloned()
            .collect::<Vec<_>>();

        for key in stale {
            if let Some(connection) = self.connected.shift_remove(&key) {
                target.disconnect(connection.id);
            }
        }

        for (key, slot) in std::mem::take(&mut self.staged) {
            if let Some(connection) = self.connected.get(&key) {
                *connection.slot.borrow_mut() = slot;
                continue;
            }

            let (signal, detail) = split_detail(&key);
            let slot = Rc::new(RefCell::new(slot));
            let id = target.connect_signal(signal, detail, handler(&slot))?;
            self.connected.insert(key, Connection { id, slot });
        }

        Ok(())
    }
}

fn handler(slot: &Rc<RefCell<SignalSlot>>) -> Rc<dyn Fn(&[Value]) -> Option<Value>> {
    let slot = Rc::downgrade(slot);
    Rc::new(move |args: &[Value]| {
        let slot = slot.upgrade()?;
        let (binding, context) = {
            let slot = slot.borrow();
            (slot.binding.clone(), slot.context.clone())
        };

        for (index, arg) in args.iter().enumerate() {
            context.insert(format!("${index}"), arg.clone());
        }

        match binding.evaluate(ValueType::Any, &context, false) {
            Ok(holder) => match holder.into_value() {
                Value::Empty => None,
                value => Some(value),
            },
            Err(_err) => {
                #[cfg(feature = "logging")]
                log::warn!("signal binding at {} failed: {_err}", binding.location());
                None
            }
        }
    })
}
