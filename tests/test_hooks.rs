//! Tests for the hook registry through its public API.

extern crate formlogic;

use std::sync::Arc;

use formlogic::error::HookError;
use formlogic::hooks::{
    AfterEvaluate, BeforeEvaluate, EmitLog, EvaluationTimedOut, HookConfig, HookPoint,
    HookRegistry,
};
use formlogic::sandbox::{EvaluationRecord, EvaluationRequest, EvaluationResult, LogLine};
use formlogic::value::Value;
use parking_lot::Mutex;
use std::time::Duration;
use uuid::Uuid;

fn record() -> EvaluationRecord {
    EvaluationRecord {
        id: Uuid::new_v4(),
        elapsed: Duration::from_millis(3),
        budget: Duration::from_millis(100),
        script_bytes: 5,
    }
}

#[test]
fn test_point_names() {
    assert_eq!(BeforeEvaluate::NAME, "evaluate.request");
    assert_eq!(AfterEvaluate::NAME, "evaluate.result");
    assert_eq!(EvaluationTimedOut::NAME, "evaluate.timeout");
    assert_eq!(EmitLog::NAME, "log.emit");
}

#[test]
fn test_handlers_run_in_registration_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut config = HookConfig::new();
    for label in ["first", "second", "third"] {
        let calls = Arc::clone(&calls);
        config = config.on::<EvaluationTimedOut>(move |_| {
            calls.lock().push(label);
            Ok(())
        });
    }
    assert_eq!(config.len(), 3);

    let registry = HookRegistry::from_config(config).unwrap();
    assert!(registry.invoke::<EvaluationTimedOut>(&record()).unwrap());
    assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
}

#[test]
fn test_alter_threads_value_through_handlers() {
    let registry = HookRegistry::from_config(
        HookConfig::new()
            .alter::<BeforeEvaluate>(|request, _| Ok(request.with_binding("a", 1)))
            .alter::<BeforeEvaluate>(|request, _| {
                let script = format!("{}; return a;", request.script);
                Ok(EvaluationRequest { script, ..request })
            }),
    )
    .unwrap();
    let request = registry
        .alter::<BeforeEvaluate>(EvaluationRequest::new("let b = 2"), &())
        .unwrap();
    assert_eq!(request.script, "let b = 2; return a;");
    assert_eq!(request.bindings.get("a"), Some(&Value::Number(1.0)));
}

#[test]
fn test_alter_handlers_see_args() {
    let registry = HookRegistry::from_config(HookConfig::new().alter::<EmitLog>(
        |emit, line: &LogLine| Ok(emit && line.kind != "resource_exceeded"),
    ))
    .unwrap();
    let line = |kind| LogLine {
        evaluation_id: Uuid::new_v4(),
        kind,
        message: String::new(),
    };
    assert!(registry.alter::<EmitLog>(true, &line("timeout")).unwrap());
    assert!(!registry
        .alter::<EmitLog>(true, &line("resource_exceeded"))
        .unwrap());
}

#[test]
fn test_invoke_and_alter_handlers_are_independent() {
    let registry = HookRegistry::from_config(
        HookConfig::new().alter::<AfterEvaluate>(|result, _| Ok(result)),
    )
    .unwrap();
    assert!(registry.has_handlers(AfterEvaluate::NAME));
    // Only invoke handlers count as handling the call.
    assert!(!registry.invoke::<AfterEvaluate>(&record()).unwrap());
}

#[test]
fn test_handler_failure_stops_dispatch() {
    let registry = HookRegistry::from_config(
        HookConfig::new()
            .alter::<AfterEvaluate>(|_, _| Err("post-processing failed".into()))
            .alter::<AfterEvaluate>(|_, _| panic!("must not run")),
    )
    .unwrap();
    let err = registry
        .alter::<AfterEvaluate>(EvaluationResult::Success(Value::Null), &record())
        .unwrap_err();
    match err {
        HookError::HandlerFailed { point, source } => {
            assert_eq!(point, "evaluate.result");
            assert_eq!(source.to_string(), "post-processing failed");
        }
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_named_dispatch_against_typed_point_is_rejected() {
    let mut registry = HookRegistry::new();
    registry
        .register_invoke::<EvaluationTimedOut>(|_| Ok(()))
        .unwrap();
    assert!(matches!(
        registry.invoke_named("evaluate.timeout", &[]),
        Err(HookError::SignatureMismatch { .. })
    ));
    assert!(registry.register_named_invoke("evaluate.timeout", |_| Ok(())).is_err());
    assert_eq!(registry.handler_count("evaluate.timeout"), 1);
}

#[test]
fn test_point_names_are_sorted() {
    let registry = HookRegistry::from_config(
        HookConfig::new()
            .on_named("zeta", |_| Ok(()))
            .alter::<EmitLog>(|emit, _| Ok(emit))
            .on_named("alpha", |_| Ok(())),
    )
    .unwrap();
    assert_eq!(registry.point_names(), vec!["alpha", "log.emit", "zeta"]);
}
