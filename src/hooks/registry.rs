use std::any::{type_name, Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{BoxError, HookError, HookRegistrationError};
use crate::hooks::config::HookConfig;
use crate::hooks::point::{Dynamic, HookPoint, HookSignature};
use crate::value::Value;

type InvokeFn<S> = dyn Fn(&<S as HookSignature>::Args) -> Result<(), BoxError> + Send + Sync;

type AlterFn<S> = dyn Fn(
        <S as HookSignature>::Value,
        &<S as HookSignature>::Args,
    ) -> Result<<S as HookSignature>::Value, BoxError>
    + Send
    + Sync;

/// A type-erased handler. The payload is a `Box<InvokeFn<S>>` or a
/// `Box<AlterFn<S>>` for the signature `S` recorded on its point.
enum Handler {
    Invoke(Box<dyn Any + Send + Sync>),
    Alter(Box<dyn Any + Send + Sync>),
}

struct PointEntry {
    signature: TypeId,
    signature_name: &'static str,
    /// Registration order, which is also call order.
    handlers: Vec<Handler>,
}

impl PointEntry {
    fn invokers<S: HookSignature>(&self) -> impl Iterator<Item = &InvokeFn<S>> {
        self.handlers.iter().filter_map(|h| match h {
            Handler::Invoke(f) => f.downcast_ref::<Box<InvokeFn<S>>>().map(|f| f.as_ref()),
            Handler::Alter(_) => None,
        })
    }

    fn alterers<S: HookSignature>(&self) -> impl Iterator<Item = &AlterFn<S>> {
        self.handlers.iter().filter_map(|h| match h {
            Handler::Alter(f) => f.downcast_ref::<Box<AlterFn<S>>>().map(|f| f.as_ref()),
            Handler::Invoke(_) => None,
        })
    }
}

/// Named extension points and their handlers.
///
/// Built once at boot, then shared behind an `Arc` and only read. Each name is
/// bound to a single [`HookSignature`] by its first registration.
#[derive(Default)]
pub struct HookRegistry {
    points: BTreeMap<String, PointEntry>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.points
                    .iter()
                    .map(|(name, entry)| (name, entry.handlers.len())),
            )
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        HookRegistry::default()
    }

    /// Replay every registration in `config`, in order.
    pub fn from_config(config: HookConfig) -> Result<Self, HookRegistrationError> {
        let mut registry = HookRegistry::new();
        config.apply(&mut registry)?;
        Ok(registry)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    fn entry<S: HookSignature>(&mut self, name: &str) -> Result<&mut PointEntry, HookRegistrationError> {
        let entry = self
            .points
            .entry(name.to_string())
            .or_insert_with(|| PointEntry {
                signature: TypeId::of::<S>(),
                signature_name: type_name::<S>(),
                handlers: Vec::new(),
            });
        if entry.signature != TypeId::of::<S>() {
            return Err(HookRegistrationError::SignatureMismatch {
                point: name.to_string(),
                registered: entry.signature_name,
                attempted: type_name::<S>(),
            });
        }
        Ok(entry)
    }

    fn push_invoke<S: HookSignature>(
        &mut self,
        name: &str,
        handler: Box<InvokeFn<S>>,
    ) -> Result<(), HookRegistrationError> {
        self.entry::<S>(name)?
            .handlers
            .push(Handler::Invoke(Box::new(handler)));
        Ok(())
    }

    fn push_alter<S: HookSignature>(
        &mut self,
        name: &str,
        handler: Box<AlterFn<S>>,
    ) -> Result<(), HookRegistrationError> {
        self.entry::<S>(name)?
            .handlers
            .push(Handler::Alter(Box::new(handler)));
        Ok(())
    }

    /// Append an `invoke` handler to `P`.
    pub fn register_invoke<P: HookPoint>(
        &mut self,
        handler: impl Fn(&P::Args) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Result<(), HookRegistrationError> {
        self.push_invoke::<P>(P::NAME, Box::new(handler))
    }

    /// Append an `alter` handler to `P`.
    pub fn register_alter<P: HookPoint>(
        &mut self,
        handler: impl Fn(P::Value, &P::Args) -> Result<P::Value, BoxError> + Send + Sync + 'static,
    ) -> Result<(), HookRegistrationError> {
        self.push_alter::<P>(P::NAME, Box::new(handler))
    }

    /// Append an `invoke` handler to a point named at runtime.
    pub fn register_named_invoke(
        &mut self,
        name: &str,
        handler: impl Fn(&[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Result<(), HookRegistrationError> {
        self.push_invoke::<Dynamic>(name, Box::new(handler))
    }

    /// Append an `alter` handler to a point named at runtime.
    pub fn register_named_alter(
        &mut self,
        name: &str,
        handler: impl Fn(Value, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Result<(), HookRegistrationError> {
        self.push_alter::<Dynamic>(name, Box::new(handler))
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn lookup<S: HookSignature>(&self, name: &str) -> Result<Option<&PointEntry>, HookError> {
        match self.points.get(name) {
            Some(entry) if entry.signature != TypeId::of::<S>() => {
                Err(HookError::SignatureMismatch {
                    point: name.to_string(),
                    registered: entry.signature_name,
                    requested: type_name::<S>(),
                })
            }
            other => Ok(other),
        }
    }

    fn run_invoke<S: HookSignature>(&self, name: &str, args: &S::Args) -> Result<bool, HookError> {
        let entry = match self.lookup::<S>(name)? {
            Some(entry) => entry,
            None => return Ok(false),
        };
        let mut ran = false;
        for handler in entry.invokers::<S>() {
            handler(args).map_err(|source| HookError::HandlerFailed {
                point: name.to_string(),
                source,
            })?;
            ran = true;
        }
        Ok(ran)
    }

    fn run_alter<S: HookSignature>(
        &self,
        name: &str,
        value: S::Value,
        args: &S::Args,
    ) -> Result<S::Value, HookError> {
        let entry = match self.lookup::<S>(name)? {
            Some(entry) => entry,
            None => return Ok(value),
        };
        let mut value = value;
        for handler in entry.alterers::<S>() {
            value = handler(value, args).map_err(|source| HookError::HandlerFailed {
                point: name.to_string(),
                source,
            })?;
        }
        Ok(value)
    }

    /// Run every `invoke` handler of `P` in order.
    ///
    /// Returns `false` when there are none, meaning the caller should fall back
    /// to its default behaviour. The first failing handler aborts the call.
    pub fn invoke<P: HookPoint>(&self, args: &P::Args) -> Result<bool, HookError> {
        self.run_invoke::<P>(P::NAME, args)
    }

    /// Fold `value` through every `alter` handler of `P` in order.
    pub fn alter<P: HookPoint>(&self, value: P::Value, args: &P::Args) -> Result<P::Value, HookError> {
        self.run_alter::<P>(P::NAME, value, args)
    }

    pub fn invoke_named(&self, name: &str, args: &[Value]) -> Result<bool, HookError> {
        self.run_invoke::<Dynamic>(name, args)
    }

    pub fn alter_named(&self, name: &str, value: Value, args: &[Value]) -> Result<Value, HookError> {
        self.run_alter::<Dynamic>(name, value, args)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn has_handlers(&self, name: &str) -> bool {
        self.handler_count(name) > 0
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.points
            .get(name)
            .map(|entry| entry.handlers.len())
            .unwrap_or(0)
    }

    /// Names of every point with at least one handler, sorted.
    pub fn point_names(&self) -> Vec<&str> {
        self.points.keys().map(String::as_str).collect()
    }
}
