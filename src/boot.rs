//! Startup wiring: hook registry first, then the evaluator.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{ConfigurationError, Error};
use crate::hooks::{HookConfig, HookRegistry, InstallEvaluator};
use crate::sandbox::{
    register_evaluator, EvaluationRequest, EvaluationResult, EvaluatorHandle, Sandbox,
    SandboxConfig,
};

/// Boot-time configuration read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootConfig {
    pub sandbox: SandboxConfig,
}

impl BootConfig {
    pub fn new(sandbox: SandboxConfig) -> Self {
        BootConfig { sandbox }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        SandboxConfig::load(path).map(BootConfig::new)
    }
}

impl From<SandboxConfig> for BootConfig {
    fn from(sandbox: SandboxConfig) -> Self {
        BootConfig::new(sandbox)
    }
}

/// What a successful boot hands to the rest of the process.
#[derive(Debug, Clone)]
pub struct Runtime {
    hooks: Arc<HookRegistry>,
    evaluator: EvaluatorHandle,
}

impl Runtime {
    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// Handle to inject into components that evaluate form logic.
    pub fn evaluator(&self) -> &EvaluatorHandle {
        &self.evaluator
    }

    pub fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult, Error> {
        self.evaluator.evaluate(request)
    }

    /// Publish the booted evaluator as the process-wide one.
    pub fn install_process_evaluator(&self) -> Result<(), Error> {
        let evaluator = self.evaluator.current()?;
        if register_evaluator(evaluator).is_some() {
            info!("process evaluator replaced");
        }
        Ok(())
    }
}

/// Build the hook registry, then install an evaluator.
///
/// Handlers on `sandbox.install` may claim the step by registering their own
/// evaluator on the handle they receive. When none exist the default
/// [`Sandbox`] is configured from `config`.
pub fn boot(config: BootConfig, hooks: HookConfig) -> Result<Runtime, Error> {
    let hooks = Arc::new(HookRegistry::from_config(hooks)?);
    info!(points = ?hooks.point_names(), "hook registry built");

    let evaluator = EvaluatorHandle::new();
    if hooks.invoke::<InstallEvaluator>(&evaluator)? {
        info!("evaluator installation handled by hooks");
    } else {
        let sandbox = Sandbox::configure(config.sandbox, Arc::clone(&hooks))?;
        evaluator.register(Arc::new(sandbox));
    }
    if !evaluator.is_registered() {
        return Err(ConfigurationError::NoEvaluator.into());
    }
    Ok(Runtime { hooks, evaluator })
}
