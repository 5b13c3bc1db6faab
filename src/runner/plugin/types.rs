//! Core types for the built-in object registry and the evaluation context.

use std::collections::HashMap;
use std::sync::Arc;

use crate::parser::ast::Meta;
use crate::runner::api::{Interrupt, RuntimeLimits};
use crate::runner::ds::env_record::{not_defined, ScopeChain};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{Heap, HeapConfig, ObjectData};
use crate::runner::ds::operations::type_conversion;
use crate::runner::ds::value::{JsValue, NativeFunctionRef};
use crate::runner::plugin::registry::{BuiltInRegistry, GLOBAL_OBJECT};

/// How often, in evaluation steps, the wall clock is consulted.
const CLOCK_CHECK_INTERVAL: u32 = 64;

/// Everything one evaluation owns: its heap, its scopes, and a shared view of
/// the read-only built-ins.
pub struct EvalContext {
    pub heap: Heap,
    pub scopes: ScopeChain,
    registry: Arc<BuiltInRegistry>,
    interrupt: Interrupt,
    limits: RuntimeLimits,
    steps: u32,
    source: String,
    /// Value of the most recent expression statement.
    pub completion_value: JsValue,
}

impl EvalContext {
    pub fn new(registry: Arc<BuiltInRegistry>, limits: RuntimeLimits, interrupt: Interrupt) -> Self {
        let heap = Heap::new(HeapConfig {
            max_bytes: Some(limits.max_heap_bytes),
            max_collection_length: Some(limits.max_collection_length),
        });
        EvalContext {
            heap,
            scopes: ScopeChain::new(),
            registry,
            interrupt,
            limits,
            steps: 0,
            source: String::new(),
            completion_value: JsValue::Undefined,
        }
    }

    /// Keep the script text so errors can quote it.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    /// Source text covered by `meta`, when the script text is known.
    pub fn source_text(&self, meta: &Meta) -> Option<&str> {
        self.source
            .get(meta.start_index..meta.end_index)
            .filter(|text| !text.is_empty())
    }

    pub fn registry(&self) -> &Arc<BuiltInRegistry> {
        &self.registry
    }

    pub fn limits(&self) -> &RuntimeLimits {
        &self.limits
    }

    /// Count one evaluation step and stop if cancelled or past the deadline.
    pub fn check_interrupt(&mut self) -> Result<(), JErrorType> {
        self.steps = self.steps.wrapping_add(1);
        if self.interrupt.is_cancelled() {
            return Err(JErrorType::Interrupted);
        }
        if self.steps % CLOCK_CHECK_INTERVAL == 0 && self.interrupt.is_expired() {
            return Err(JErrorType::Interrupted);
        }
        Ok(())
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Wrap a string produced at runtime, checking it against the length
    /// limit. It is charged to the heap only once stored in an array or object.
    pub fn new_string(&mut self, s: String) -> Result<JsValue, JErrorType> {
        if s.len() > self.limits.max_string_bytes {
            return Err(JErrorType::ResourceExceeded {
                resource: "string length",
                limit: self.limits.max_string_bytes,
            });
        }
        Ok(JsValue::String(s))
    }

    pub fn new_array(&mut self, elements: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        Ok(JsValue::Object(self.heap.alloc_array(elements)?))
    }

    pub fn new_object(&mut self, data: ObjectData) -> Result<JsValue, JErrorType> {
        Ok(JsValue::Object(self.heap.alloc_object(data)?))
    }

    /// `{ name, message }`, the shape `catch` sees for built-in errors.
    pub fn new_error_object(&mut self, name: &str, message: &str) -> Result<JsValue, JErrorType> {
        let mut data = ObjectData::new();
        data.insert("name".to_string(), JsValue::String(name.to_string()));
        data.insert("message".to_string(), JsValue::String(message.to_string()));
        self.new_object(data)
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Resolve an identifier: scopes first, then the global functions and
    /// constants, then the built-in objects.
    pub fn get_binding(&self, name: &str) -> Result<JsValue, JErrorType> {
        if let Some(result) = self.scopes.get_binding_value(name) {
            return result;
        }
        self.resolve_builtin(name).ok_or_else(|| not_defined(name))
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.scopes.has_binding(name) || self.resolve_builtin(name).is_some()
    }

    pub fn set_binding(&mut self, name: &str, value: JsValue) -> Result<(), JErrorType> {
        if let Some(result) = self.scopes.set_mutable_binding(name, value) {
            return result;
        }
        if self.resolve_builtin(name).is_some() {
            return Err(JErrorType::TypeError(format!(
                "Cannot assign to read only built-in '{}'",
                name
            )));
        }
        Err(not_defined(name))
    }

    fn resolve_builtin(&self, name: &str) -> Option<JsValue> {
        if let Some(global) = self.registry.get_object(GLOBAL_OBJECT) {
            if let Some(value) = global.properties.get(name) {
                return Some(value.clone());
            }
            if global.methods.contains_key(name) {
                return Some(JsValue::Function(NativeFunctionRef::new_static(
                    GLOBAL_OBJECT,
                    name,
                )));
            }
        }
        if name != GLOBAL_OBJECT && self.registry.has_object(name) {
            return Some(JsValue::BuiltIn(name.to_string()));
        }
        None
    }

    // ========================================================================
    // Calls
    // ========================================================================

    pub fn is_callable(&self, v: &JsValue) -> bool {
        match v {
            JsValue::Function(_) => true,
            JsValue::BuiltIn(name) => self.registry.get_constructor(name).is_some(),
            _ => false,
        }
    }

    /// Call a function value. Static methods receive their owning object as
    /// `this`; prototype methods receive `this` as given.
    pub fn call_function(
        &mut self,
        callee: &JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        let registry = Arc::clone(&self.registry);
        let (func, this) = match callee {
            JsValue::Function(f) if f.on_prototype => {
                (registry.get_prototype_method(&f.object, &f.name), this)
            }
            JsValue::Function(f) => (
                registry.get_method(&f.object, &f.name),
                JsValue::BuiltIn(f.object.clone()),
            ),
            JsValue::BuiltIn(name) => (registry.get_constructor(name), JsValue::Undefined),
            _ => (None, this),
        };
        match func {
            Some(func) => func.call(self, this, args),
            None => Err(JErrorType::TypeError(format!(
                "{} is not a function",
                self.to_js_string(callee)
                    .unwrap_or_else(|_| type_conversion::get_type(callee).to_string())
            ))),
        }
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    pub fn to_js_string(&self, v: &JsValue) -> Result<String, JErrorType> {
        type_conversion::to_string(v, &self.heap)
    }

    pub fn to_number(&self, v: &JsValue) -> Result<f64, JErrorType> {
        type_conversion::to_number(v, &self.heap)
    }

    /// `typeof`, reporting constructible built-ins as functions.
    pub fn type_of(&self, v: &JsValue) -> &'static str {
        match v {
            JsValue::Null => type_conversion::TYPE_STR_OBJECT,
            JsValue::BuiltIn(name) if self.registry.get_constructor(name).is_some() => {
                type_conversion::TYPE_STR_FUNCTION
            }
            other => type_conversion::get_type(other),
        }
    }
}

/// Function signature for built-in methods.
/// Native functions receive the evaluation context, `this` value, and arguments.
pub type NativeFn =
    fn(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType>;

/// Host-provided function.
pub type HostFn =
    dyn Fn(&mut EvalContext, JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType> + Send + Sync;

/// Built-in function - either compiled-in or host-provided.
pub enum BuiltInFn {
    /// Direct function pointer for compiled-in functions.
    Native(NativeFn),
    /// Closure registered by the host application.
    Host(Box<HostFn>),
}

impl BuiltInFn {
    pub fn call(
        &self,
        ctx: &mut EvalContext,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        match self {
            BuiltInFn::Native(f) => f(ctx, this, args),
            BuiltInFn::Host(f) => f(ctx, this, args),
        }
    }
}

/// Built-in object definition, such as `Math` or `String`.
pub struct BuiltInObject {
    /// Name of the object (e.g., "Array", "Math").
    pub name: String,

    /// Static methods (`Math.max`).
    pub methods: HashMap<String, BuiltInFn>,

    /// Methods available on values of this type (`"a".toUpperCase`).
    pub prototype_methods: HashMap<String, BuiltInFn>,

    /// Static properties.
    pub properties: HashMap<String, JsValue>,

    /// Called when the object itself is called, as in `Number("5")`.
    pub constructor: Option<BuiltInFn>,
}

impl BuiltInObject {
    pub fn new(name: impl Into<String>) -> Self {
        BuiltInObject {
            name: name.into(),
            methods: HashMap::new(),
            prototype_methods: HashMap::new(),
            properties: HashMap::new(),
            constructor: None,
        }
    }

    /// Add a native method.
    pub fn add_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.methods.insert(name.into(), BuiltInFn::Native(func));
        self
    }

    /// Add a host closure as a static method.
    pub fn add_host_method<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut EvalContext, JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType>
            + Send
            + Sync
            + 'static,
    {
        self.methods.insert(name.into(), BuiltInFn::Host(Box::new(func)));
        self
    }

    /// Add a method reachable from values of this type.
    pub fn add_prototype_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.prototype_methods
            .insert(name.into(), BuiltInFn::Native(func));
        self
    }

    /// Add a property.
    pub fn add_property(mut self, name: impl Into<String>, value: JsValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Set the constructor function.
    pub fn with_constructor(mut self, constructor: NativeFn) -> Self {
        self.constructor = Some(BuiltInFn::Native(constructor));
        self
    }
}
