use indexmap::IndexMap;

use crate::binding::Binding;
use crate::error::{Error, Result};
use crate::location::SourceLocation;
use crate::object::{TypeInfo, TypeResolver};

const SIGNAL_PREFIX: &str = "on.";
const STRUCTURAL_PREFIX: &str = "__";
const DIRECTIVE_PREFIX: &str = "_";

/// What a binding key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget<'a> {
    Property(&'a str),
    Signal(&'a str),
    /// `_name` or `_name.property`
    AttributeDirective(&'a str),
    /// `__name` or `__name.property`
    StructuralDirective(&'a str),
}

impl<'a> BindingTarget<'a> {
    pub fn parse(key: &'a str) -> Self {
        if let Some(signal) = key.strip_prefix(SIGNAL_PREFIX) {
            return Self::Signal(signal);
        }
        if let Some(name) = key.strip_prefix(STRUCTURAL_PREFIX) {
            return Self::StructuralDirective(name);
        }
        if let Some(name) = key.strip_prefix(DIRECTIVE_PREFIX) {
            return Self::AttributeDirective(name);
        }
        Self::Property(key)
    }
}

/// Resolve an element tag, optionally requiring it to derive from `required`.
pub fn resolve_tag(
    resolver: &dyn TypeResolver,
    tag: &str,
    required: Option<&'static TypeInfo>,
    location: &SourceLocation,
) -> Result<&'static TypeInfo> {
    let info = resolver.resolve(tag).ok_or_else(|| Error::UnknownType {
        name: tag.to_string(),
        location: location.clone(),
    })?;

    match required {
        Some(required) if !info.is_a(required) => Err(Error::IncompatibleType {
            type_name: info.name.to_string(),
            required: required.name.to_string(),
            location: location.clone(),
        }),
        _ => Ok(info),
    }
}

// -----------------------------------------------------------------------------
//   - Fragment -
// -----------------------------------------------------------------------------
/// Immutable description of an object, its bindings and its children.
#[derive(Debug, Clone)]
pub struct Fragment {
    target_type: &'static TypeInfo,
    location: SourceLocation,
    is_root: bool,
    bindings: IndexMap<String, Binding>,
    children: Vec<Fragment>,
}

impl Fragment {
    pub fn builder(target_type: &'static TypeInfo, location: SourceLocation) -> FragmentBuilder {
        FragmentBuilder {
            fragment: Fragment {
                target_type,
                location,
                is_root: false,
                bindings: IndexMap::new(),
                children: vec![],
            },
        }
    }

    pub fn target_type(&self) -> &'static TypeInfo {
        self.target_type
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// A root fragment may be inflated into any subtype of its target type.
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Bindings in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn binding(&self, key: &str) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn children(&self) -> &[Fragment] {
        &self.children
    }

    /// Structural directive bindings of this fragment, in declaration order.
    pub fn structural_bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings().filter_map(|(key, binding)| match BindingTarget::parse(key) {
            BindingTarget::StructuralDirective(name) => Some((name, binding)),
            _ => None,
        })
    }

    /// True if `info` can be the target of this fragment.
    pub fn accepts_target_type(&self, info: &TypeInfo) -> bool {
        match self.is_root {
            true => info.is_a(self.target_type),
            false => info == self.target_type,
        }
    }
}

// -----------------------------------------------------------------------------
//   - Builder -
// -----------------------------------------------------------------------------
pub struct FragmentBuilder {
    fragment: Fragment,
}

impl FragmentBuilder {
    pub fn root(mut self, is_root: bool) -> Self {
        self.fragment.is_root = is_root;
        self
    }

    /// Add a binding. Re-adding a key replaces the binding but keeps its position.
    pub fn binding(mut self, key: impl Into<String>, binding: Binding) -> Self {
        self.fragment.bindings.insert(key.into(), binding);
        self
    }

    pub fn remove_binding(mut self, key: &str) -> Self {
        self.fragment.bindings.shift_remove(key);
        self
    }

    pub fn child(mut self, child: Fragment) -> Self {
        self.fragment.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.fragment.children.extend(children);
        self
    }

    pub fn build(self) -> Fragment {
        self.fragment
    }
}

impl From<Fragment> for FragmentBuilder {
    fn from(fragment: Fragment) -> Self {
        Self { fragment }
    }
}
