use std::rc::Rc;

use trellis_core::container::ContainerAdapter;
use trellis_core::directive::{Directive, DirectiveFactory, DirectiveInstance, DirectiveKind};
use trellis_core::error::{Error, Result};
use trellis_core::fragment::Fragment;
use trellis_core::host::FragmentHost;
use trellis_core::location::SourceLocation;
use trellis_core::object::same_rc;
use trellis_core::values::Value;

use crate::layout::adapter_for;

pub const CONTAINER_DIRECTIVE: &str = "trellis.container";

/// Gives every container widget the adapter for its type.
#[derive(Default)]
struct ContainerDirective {
    installed: Option<Rc<dyn ContainerAdapter>>,
}

impl Directive for ContainerDirective {
    fn set_property(&mut self, name: &str, _: Value) -> Result<()> {
        Err(Error::directive(
            SourceLocation::unknown(),
            format!("'{CONTAINER_DIRECTIVE}' has no property '{name}'"),
        ))
    }

    fn provide_container_adapter(&mut self, host: &FragmentHost) -> Option<Rc<dyn ContainerAdapter>> {
        let adapter = adapter_for(host.target_type())?;
        self.installed = Some(adapter.clone());
        Some(adapter)
    }

    fn detach(&mut self, host: &mut FragmentHost) {
        let Some(installed) = self.installed.take() else { return };
        let current = host.container_adapter();
        if current.map_or(false, |current| same_rc(&current, &installed)) {
            host.set_container_adapter(None);
        }
    }
}

pub struct ContainerDirectiveFactory;

impl DirectiveFactory for ContainerDirectiveFactory {
    fn name(&self) -> &str {
        CONTAINER_DIRECTIVE
    }

    fn kind(&self) -> DirectiveKind {
        DirectiveKind::Attribute
    }

    fn create(&self) -> DirectiveInstance {
        DirectiveInstance::attribute(ContainerDirective::default())
    }

    fn should_auto_attach(&self, host: &FragmentHost, _: &Fragment) -> bool {
        adapter_for(host.target_type()).is_some()
    }
}
