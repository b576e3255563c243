// extensions/registry.rs
//
// Named initializers and entity variants.
// An element that declares an extension name (the `is` attribute) gets the matching
// hook run on it once, after initial placement and before `ready`. The hook may return
// markup that is appended to the entity's content.
//
// Usage:
//   viewport.define("Character", |entity| {
//       entity.set_hspeed(14.0)?;
//       Ok(Some("<img src=\"boy.png\">".into()))
//   });

use std::collections::HashMap;
use std::rc::Rc;

use crate::api::error::EngineError;
use crate::components::attributes::Attributes;
use crate::core::handle::EntityMut;

/// Initializer run on an entity before it becomes ready.
pub type ExtensionHook = Rc<dyn Fn(&mut EntityMut<'_>) -> Result<Option<String>, EngineError>>;

/// A specialized entity kind: base template plus default attributes.
#[derive(Debug, Clone, Default)]
pub struct VariantSpec {
    pub template: String,
    pub defaults: Attributes,
}

impl VariantSpec {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            defaults: Attributes::new(),
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.defaults.set(name, value);
        self
    }
}

/// Registry of extension hooks and variants, owned by a viewport.
#[derive(Default)]
pub struct ExtensionRegistry {
    hooks: HashMap<String, ExtensionHook>,
    variants: HashMap<String, VariantSpec>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named initializer. Re-defining a name replaces the previous hook.
    pub fn define<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut EntityMut<'_>) -> Result<Option<String>, EngineError> + 'static,
    {
        let name = name.into();
        if self.hooks.insert(name.clone(), Rc::new(hook)).is_some() {
            log::warn!("extension `{}` redefined", name);
        }
    }

    pub fn define_variant(&mut self, name: impl Into<String>, spec: VariantSpec) {
        self.variants.insert(name.into(), spec);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    pub fn variant(&self, name: &str) -> Option<&VariantSpec> {
        self.variants.get(name)
    }

    /// Look up a hook. Undefined names are an error.
    pub fn hook(&self, name: &str) -> Result<ExtensionHook, EngineError> {
        self.hooks
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownExtension(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty() && self.variants.is_empty()
    }

    /// Forget every hook and variant.
    pub fn clear(&mut self) {
        self.hooks.clear();
        self.variants.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_hook_is_an_error() {
        let registry = ExtensionRegistry::new();
        match registry.hook("Ghost") {
            Err(EngineError::UnknownExtension(name)) => assert_eq!(name, "Ghost"),
            _ => panic!("expected UnknownExtension"),
        }
    }

    #[test]
    fn define_and_clear() {
        let mut registry = ExtensionRegistry::new();
        registry.define("Marker", |_| Ok(None));
        registry.define_variant("tile", VariantSpec::new("<img>").with_default("width", 16));
        assert!(registry.is_defined("Marker"));
        assert_eq!(registry.variant("tile").unwrap().defaults.get("width"), Some("16"));

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.hook("Marker").is_err());
    }
}
