use std::collections::HashMap;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingFlag {
    Mutable,
    Immutable,
}

#[derive(Debug, Clone)]
struct Binding {
    /// `None` until the declaration runs (temporal dead zone).
    value: Option<JsValue>,
    flag: BindingFlag,
}

/// One level of lexical scope.
#[derive(Debug, Default)]
pub struct DeclarativeEnvironmentRecord {
    bindings: HashMap<String, Binding>,
}

impl DeclarativeEnvironmentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn create_mutable_binding(&mut self, name: String) {
        self.bindings.entry(name).or_insert(Binding {
            value: None,
            flag: BindingFlag::Mutable,
        });
    }

    pub fn create_immutable_binding(&mut self, name: String) {
        self.bindings.entry(name).or_insert(Binding {
            value: None,
            flag: BindingFlag::Immutable,
        });
    }

    pub fn initialize_binding(&mut self, name: &str, value: JsValue) -> bool {
        match self.bindings.get_mut(name) {
            Some(binding) => {
                binding.value = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn set_mutable_binding(&mut self, name: &str, value: JsValue) -> Result<(), JErrorType> {
        match self.bindings.get_mut(name) {
            Some(Binding { value: None, .. }) => Err(uninitialized(name)),
            Some(Binding {
                flag: BindingFlag::Immutable,
                ..
            }) => Err(JErrorType::TypeError(
                "Assignment to constant variable.".to_string(),
            )),
            Some(binding) => {
                binding.value = Some(value);
                Ok(())
            }
            None => Err(not_defined(name)),
        }
    }

    pub fn get_binding_value(&self, name: &str) -> Result<JsValue, JErrorType> {
        match self.bindings.get(name) {
            Some(Binding {
                value: Some(value), ..
            }) => Ok(value.clone()),
            Some(_) => Err(uninitialized(name)),
            None => Err(not_defined(name)),
        }
    }
}

fn uninitialized(name: &str) -> JErrorType {
    JErrorType::ReferenceError(format!("Cannot access '{}' before initialization", name))
}

pub fn not_defined(name: &str) -> JErrorType {
    JErrorType::ReferenceError(format!("{} is not defined", name))
}

/// Chain of scopes for one evaluation.
///
/// The outermost record holds the host bindings and every hoisted `var`;
/// each block pushes a fresh record for its `let`/`const` declarations.
#[derive(Debug)]
pub struct ScopeChain {
    records: Vec<DeclarativeEnvironmentRecord>,
}

impl ScopeChain {
    pub fn new() -> Self {
        ScopeChain {
            records: vec![DeclarativeEnvironmentRecord::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.records.len()
    }

    pub fn push_scope(&mut self) {
        self.records.push(DeclarativeEnvironmentRecord::new());
    }

    /// The outermost record is never popped.
    pub fn pop_scope(&mut self) {
        if self.records.len() > 1 {
            self.records.pop();
        }
    }

    /// Drop scopes until the chain is `depth` records deep.
    pub fn truncate(&mut self, depth: usize) {
        self.records.truncate(depth.max(1));
    }

    /// Declare a function-level variable, initialised to `undefined` unless
    /// a binding of that name already exists.
    pub fn declare_var(&mut self, name: &str) {
        let global = &mut self.records[0];
        if !global.has_binding(name) {
            global.create_mutable_binding(name.to_string());
            global.initialize_binding(name, JsValue::Undefined);
        }
    }

    /// Expose a host binding.
    pub fn define_global(&mut self, name: &str, value: JsValue) {
        let global = &mut self.records[0];
        global.create_mutable_binding(name.to_string());
        global.initialize_binding(name, value);
    }

    /// Create an uninitialised lexical binding in the innermost scope.
    pub fn declare_lexical(&mut self, name: &str, mutable: bool) {
        if let Some(top) = self.records.last_mut() {
            if mutable {
                top.create_mutable_binding(name.to_string());
            } else {
                top.create_immutable_binding(name.to_string());
            }
        }
    }

    /// Run the declaration of a lexical binding in the innermost scope.
    pub fn initialize_lexical(&mut self, name: &str, value: JsValue) {
        if let Some(top) = self.records.last_mut() {
            top.initialize_binding(name, value);
        }
    }

    /// Whether `name` resolves to a declared binding anywhere in the chain.
    pub fn has_binding(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.has_binding(name))
    }

    /// `None` when no scope declares `name`.
    pub fn get_binding_value(&self, name: &str) -> Option<Result<JsValue, JErrorType>> {
        self.records
            .iter()
            .rev()
            .find(|r| r.has_binding(name))
            .map(|r| r.get_binding_value(name))
    }

    /// `None` when no scope declares `name`.
    pub fn set_mutable_binding(
        &mut self,
        name: &str,
        value: JsValue,
    ) -> Option<Result<(), JErrorType>> {
        self.records
            .iter_mut()
            .rev()
            .find(|r| r.has_binding(name))
            .map(|r| r.set_mutable_binding(name, value))
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut chain = ScopeChain::new();
        chain.define_global("a", JsValue::Number(1.0));
        chain.push_scope();
        chain.declare_lexical("a", true);
        chain.initialize_lexical("a", JsValue::Number(2.0));
        assert_eq!(
            chain.get_binding_value("a"),
            Some(Ok(JsValue::Number(2.0)))
        );
        chain.pop_scope();
        assert_eq!(
            chain.get_binding_value("a"),
            Some(Ok(JsValue::Number(1.0)))
        );
    }

    #[test]
    fn test_const_and_dead_zone() {
        let mut chain = ScopeChain::new();
        chain.push_scope();
        chain.declare_lexical("c", false);
        assert!(matches!(
            chain.get_binding_value("c"),
            Some(Err(JErrorType::ReferenceError(_)))
        ));
        chain.initialize_lexical("c", JsValue::Boolean(true));
        assert!(matches!(
            chain.set_mutable_binding("c", JsValue::Null),
            Some(Err(JErrorType::TypeError(_)))
        ));
        assert!(chain.set_mutable_binding("missing", JsValue::Null).is_none());
    }

    #[test]
    fn test_var_does_not_clobber_binding() {
        let mut chain = ScopeChain::new();
        chain.define_global("x", JsValue::Number(3.0));
        chain.declare_var("x");
        chain.declare_var("y");
        assert_eq!(
            chain.get_binding_value("x"),
            Some(Ok(JsValue::Number(3.0)))
        );
        assert_eq!(chain.get_binding_value("y"), Some(Ok(JsValue::Undefined)));
    }
}
