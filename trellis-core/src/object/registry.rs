use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use super::TypeInfo;

static TYPES: OnceLock<RwLock<HashMap<&'static str, &'static TypeInfo>>> = OnceLock::new();

fn types() -> &'static RwLock<HashMap<&'static str, &'static TypeInfo>> {
    TYPES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Make a type resolvable by name. Registering a name twice replaces the earlier type.
pub fn register_type(info: &'static TypeInfo) {
    types().write().insert(info.name, info);
}

pub fn resolve_type(name: &str) -> Option<&'static TypeInfo> {
    types().read().get(name).copied()
}

/// Maps element tags to types.
pub trait TypeResolver {
    fn resolve(&self, name: &str) -> Option<&'static TypeInfo>;
}

/// Resolves against the process-wide registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalTypes;

impl TypeResolver for GlobalTypes {
    fn resolve(&self, name: &str) -> Option<&'static TypeInfo> {
        resolve_type(name)
    }
}

impl TypeResolver for HashMap<&'static str, &'static TypeInfo> {
    fn resolve(&self, name: &str) -> Option<&'static TypeInfo> {
        self.get(name).copied()
    }
}
