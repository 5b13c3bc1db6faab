//! End-to-end tests: boot, evaluator installation and the hooks a host wires
//! in at startup.

extern crate formlogic;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use formlogic::boot::{boot, BootConfig};
use formlogic::error::{ConfigurationError, Error, HookRegistrationError};
use formlogic::hooks::{
    AfterEvaluate, ConfigureSandbox, EmitLog, HookConfig, InstallEvaluator,
};
use formlogic::sandbox::{
    process_evaluator, EvaluationFailure, EvaluationRequest, EvaluationResult, Evaluator,
    EvaluatorHandle, SandboxConfig,
};
use formlogic::value::Value;

fn config(timeout_ms: u64) -> BootConfig {
    BootConfig::new(SandboxConfig::with_timeout_ms(timeout_ms))
}

/// Answers every request with the length of its script.
struct ScriptLength;

impl Evaluator for ScriptLength {
    fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult, Error> {
        Ok(EvaluationResult::Success(Value::Number(
            request.script.len() as f64,
        )))
    }
}

#[test]
fn test_boot_installs_default_sandbox() {
    let runtime = boot(config(100), HookConfig::new()).unwrap();
    assert!(runtime.evaluator().is_registered());

    let result = runtime
        .evaluate(
            EvaluationRequest::new("return a + b;")
                .with_binding("a", 2)
                .with_binding("b", 3),
        )
        .unwrap();
    assert_eq!(result, EvaluationResult::Success(Value::Number(5.0)));

    let result = runtime.evaluate(EvaluationRequest::new("while(true){}")).unwrap();
    assert_eq!(
        result.failure(),
        Some(&EvaluationFailure::Timeout { budget_ms: 100 })
    );
}

#[test]
fn test_boot_without_timeout_fails() {
    match boot(BootConfig::default(), HookConfig::new()) {
        Err(Error::Configuration(ConfigurationError::MissingTimeout)) => {}
        other => panic!("Unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_boot_timeout_from_hook() {
    let hooks = HookConfig::new().alter::<ConfigureSandbox>(|mut config, _| {
        config.timeout_ms = Some(60);
        Ok(config)
    });
    let runtime = boot(BootConfig::default(), hooks).unwrap();
    let result = runtime.evaluate(EvaluationRequest::new("for (;;) {}")).unwrap();
    assert_eq!(
        result.failure(),
        Some(&EvaluationFailure::Timeout { budget_ms: 60 })
    );
}

#[test]
fn test_install_hook_claims_evaluator() {
    let hooks = HookConfig::new().on::<InstallEvaluator>(|handle: &EvaluatorHandle| {
        handle.register(Arc::new(ScriptLength));
        Ok(())
    });
    // The default sandbox is never configured, so a missing timeout is fine.
    let runtime = boot(BootConfig::default(), hooks).unwrap();
    let result = runtime.evaluate(EvaluationRequest::new("while(true){}")).unwrap();
    assert_eq!(result.value(), Some(&Value::Number(13.0)));
}

#[test]
fn test_install_hook_that_registers_nothing() {
    let hooks = HookConfig::new().on::<InstallEvaluator>(|_| Ok(()));
    match boot(config(100), hooks) {
        Err(Error::Configuration(ConfigurationError::NoEvaluator)) => {}
        other => panic!("Unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_install_hook_failure_aborts_boot() {
    let hooks = HookConfig::new().on::<InstallEvaluator>(|_| Err("no evaluator today".into()));
    assert!(matches!(
        boot(config(100), hooks),
        Err(Error::Hook(_))
    ));
}

#[test]
fn test_conflicting_handler_signatures_abort_boot() {
    let hooks = HookConfig::new()
        .on_named("log.emit", |_| Ok(()))
        .alter::<EmitLog>(|emit, _| Ok(emit));
    match boot(config(100), hooks) {
        Err(Error::HookRegistration(HookRegistrationError::SignatureMismatch {
            point, ..
        })) => assert_eq!(point, "log.emit"),
        other => panic!("Unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_result_post_processing() {
    let suppressed = Arc::new(AtomicUsize::new(0));
    let hooks = {
        let suppressed = Arc::clone(&suppressed);
        HookConfig::new()
            .alter::<AfterEvaluate>(|result, _| {
                Ok(match result {
                    EvaluationResult::Success(Value::Number(n)) => {
                        EvaluationResult::Success(Value::Number((n * 100.0).round() / 100.0))
                    }
                    other => other,
                })
            })
            .alter::<EmitLog>(move |_, _| {
                suppressed.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            })
    };
    let runtime = boot(config(50), hooks).unwrap();

    let result = runtime.evaluate(EvaluationRequest::new("10 / 3")).unwrap();
    assert_eq!(result.value(), Some(&Value::Number(3.33)));

    let result = runtime.evaluate(EvaluationRequest::new("while (true) {}")).unwrap();
    assert!(result.failure().is_some());
    assert_eq!(suppressed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_named_points_are_available_to_hosts() {
    let seen = Arc::new(AtomicUsize::new(0));
    let hooks = {
        let seen = Arc::clone(&seen);
        HookConfig::new()
            .on_named("form.submitted", move |args| {
                seen.fetch_add(args.len(), Ordering::SeqCst);
                Ok(())
            })
            .alter_named("form.label", |value, args| {
                Ok(Value::String(format!(
                    "{}{}",
                    value.as_str().unwrap_or_default(),
                    args.first().and_then(Value::as_str).unwrap_or_default()
                )))
            })
    };
    let runtime = boot(config(100), hooks).unwrap();
    let registry = runtime.hooks();

    assert!(registry
        .invoke_named("form.submitted", &[Value::from(1), Value::from(2)])
        .unwrap());
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert!(!registry.invoke_named("form.unknown", &[]).unwrap());

    assert_eq!(
        registry
            .alter_named("form.label", Value::from("Total"), &[Value::from(":")])
            .unwrap(),
        Value::from("Total:")
    );
    assert_eq!(
        registry
            .alter_named("form.unknown", Value::from("same"), &[])
            .unwrap(),
        Value::from("same")
    );
}

#[test]
fn test_process_evaluator() {
    let runtime = boot(config(100), HookConfig::new()).unwrap();
    runtime.install_process_evaluator().unwrap();

    let handle = process_evaluator();
    assert!(handle.is_registered());
    let result = handle
        .evaluate(EvaluationRequest::new("[1, 2, 3].length").with_timeout(Duration::from_millis(200)))
        .unwrap();
    assert_eq!(result.value(), Some(&Value::Number(3.0)));
}

#[test]
fn test_shared_handle_sees_replacement() {
    let runtime = boot(config(100), HookConfig::new()).unwrap();
    let handle = runtime.evaluator().clone();
    assert!(handle.register(Arc::new(ScriptLength)).is_some());

    let result = runtime.evaluate(EvaluationRequest::new("1 + 1")).unwrap();
    assert_eq!(result.value(), Some(&Value::Number(5.0)));
}
