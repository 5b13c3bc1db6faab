use std::fmt;

use crate::error::{BoxError, HookRegistrationError};
use crate::hooks::point::HookPoint;
use crate::hooks::registry::HookRegistry;
use crate::value::Value;

type Registration = Box<dyn FnOnce(&mut HookRegistry) -> Result<(), HookRegistrationError> + Send>;

/// Host-supplied hook mapping, replayed into a [`HookRegistry`] at boot.
///
/// ```
/// use formlogic::hooks::{EmitLog, HookConfig, HookRegistry};
///
/// let config = HookConfig::new()
///     .alter::<EmitLog>(|_emit, _line| Ok(false))
///     .on_named("forms.saved", |_args| Ok(()));
/// let registry = HookRegistry::from_config(config).unwrap();
/// assert!(registry.invoke_named("forms.saved", &[]).unwrap());
/// ```
#[derive(Default)]
pub struct HookConfig {
    registrations: Vec<Registration>,
}

impl fmt::Debug for HookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookConfig")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

impl HookConfig {
    pub fn new() -> Self {
        HookConfig::default()
    }

    pub fn on<P: HookPoint>(
        mut self,
        handler: impl Fn(&P::Args) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.registrations
            .push(Box::new(move |registry: &mut HookRegistry| registry.register_invoke::<P>(handler)));
        self
    }

    pub fn alter<P: HookPoint>(
        mut self,
        handler: impl Fn(P::Value, &P::Args) -> Result<P::Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.registrations
            .push(Box::new(move |registry: &mut HookRegistry| registry.register_alter::<P>(handler)));
        self
    }

    pub fn on_named(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        self.registrations.push(Box::new(move |registry: &mut HookRegistry| {
            registry.register_named_invoke(&name, handler)
        }));
        self
    }

    pub fn alter_named(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(Value, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        self.registrations.push(Box::new(move |registry: &mut HookRegistry| {
            registry.register_named_alter(&name, handler)
        }));
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub(crate) fn apply(self, registry: &mut HookRegistry) -> Result<(), HookRegistrationError> {
        for registration in self.registrations {
            registration(registry)?;
        }
        Ok(())
    }
}
