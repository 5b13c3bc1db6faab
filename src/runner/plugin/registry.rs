//! Built-in registry for the objects every script can see.

use std::collections::HashMap;

use super::types::{BuiltInFn, BuiltInObject};
use crate::runner::std_lib::register_core_builtins;

/// Registry entry holding the global functions and constants
/// (`parseInt`, `NaN`, ...), which scripts reach without a prefix.
pub const GLOBAL_OBJECT: &str = "globalThis";

/// Registry for built-in objects.
///
/// Built once, then shared read-only by every evaluation. Bindings with the
/// same name shadow an entry; scripts can never modify one.
pub struct BuiltInRegistry {
    objects: HashMap<String, BuiltInObject>,
}

impl BuiltInRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        BuiltInRegistry {
            objects: HashMap::new(),
        }
    }

    /// Create a registry with the core library (`Math`, `String`, `JSON`, ...).
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_builtins(&mut registry);
        registry
    }

    /// Register a built-in object, replacing any previous one of that name.
    pub fn register_object(&mut self, obj: BuiltInObject) {
        self.objects.insert(obj.name.clone(), obj);
    }

    /// Get a registered object by name.
    pub fn get_object(&self, name: &str) -> Option<&BuiltInObject> {
        self.objects.get(name)
    }

    /// Get a mutable reference to a registered object.
    pub fn get_object_mut(&mut self, name: &str) -> Option<&mut BuiltInObject> {
        self.objects.get_mut(name)
    }

    pub fn get_method(&self, object: &str, method: &str) -> Option<&BuiltInFn> {
        self.objects
            .get(object)
            .and_then(|obj| obj.methods.get(method))
    }

    pub fn get_prototype_method(&self, object: &str, method: &str) -> Option<&BuiltInFn> {
        self.objects
            .get(object)
            .and_then(|obj| obj.prototype_methods.get(method))
    }

    /// Get a constructor function for an object.
    pub fn get_constructor(&self, object: &str) -> Option<&BuiltInFn> {
        self.objects
            .get(object)
            .and_then(|obj| obj.constructor.as_ref())
    }

    /// Check if an object exists in the registry.
    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Check if a static method exists on an object.
    pub fn has_method(&self, object: &str, method: &str) -> bool {
        self.objects
            .get(object)
            .map(|obj| obj.methods.contains_key(method))
            .unwrap_or(false)
    }

    pub fn has_prototype_method(&self, object: &str, method: &str) -> bool {
        self.objects
            .get(object)
            .map(|obj| obj.prototype_methods.contains_key(method))
            .unwrap_or(false)
    }

    /// Get list of all registered object names.
    pub fn object_names(&self) -> Vec<&String> {
        self.objects.keys().collect()
    }
}

impl Default for BuiltInRegistry {
    fn default() -> Self {
        Self::with_core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::value::JsValue;

    #[test]
    fn test_core_registry_contents() {
        let registry = BuiltInRegistry::with_core();
        for name in ["Math", "Number", "String", "Boolean", "Array", "Object", "JSON", "Error"] {
            assert!(registry.has_object(name), "missing {}", name);
        }
        assert!(registry.has_method("Math", "max"));
        assert!(!registry.has_method("Math", "random"));
        assert!(registry.has_prototype_method("String", "toUpperCase"));
        assert!(registry.has_prototype_method("Array", "push"));
        assert!(registry.get_constructor("Number").is_some());
        assert!(registry.get_constructor("Math").is_none());
        assert!(registry.has_method(GLOBAL_OBJECT, "parseInt"));
    }

    #[test]
    fn test_register_object_replaces() {
        let mut registry = BuiltInRegistry::new();
        registry.register_object(BuiltInObject::new("Config").add_property("a", JsValue::Null));
        registry.register_object(
            BuiltInObject::new("Config").add_property("b", JsValue::Boolean(true)),
        );
        let config = registry.get_object("Config").unwrap();
        assert!(config.properties.get("a").is_none());
        assert_eq!(config.properties.get("b"), Some(&JsValue::Boolean(true)));
    }
}
