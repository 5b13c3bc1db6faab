//! Tests for the evaluation sandbox: timeouts, isolation, concurrency and the
//! hooks it calls around each evaluation.

extern crate formlogic;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use formlogic::error::{ConfigurationError, Error, HookError};
use formlogic::hooks::{
    AfterEvaluate, BeforeEvaluate, ConfigureSandbox, EmitLog, EvaluationTimedOut, HookConfig,
    HookRegistry,
};
use formlogic::runner::ds::value::JsValue;
use formlogic::runner::plugin::{BuiltInObject, BuiltInRegistry};
use formlogic::sandbox::{
    EvaluationFailure, EvaluationRequest, EvaluationResult, Sandbox, SandboxConfig,
};
use formlogic::value::Value;

fn sandbox(timeout_ms: u64) -> Sandbox {
    Sandbox::configure(
        SandboxConfig::with_timeout_ms(timeout_ms),
        Arc::new(HookRegistry::new()),
    )
    .unwrap()
}

fn sandbox_with_hooks(timeout_ms: u64, hooks: HookConfig) -> Sandbox {
    Sandbox::configure(
        SandboxConfig::with_timeout_ms(timeout_ms),
        Arc::new(HookRegistry::from_config(hooks).unwrap()),
    )
    .unwrap()
}

fn failure(result: EvaluationResult) -> EvaluationFailure {
    match result {
        EvaluationResult::Failure(failure) => failure,
        EvaluationResult::Success(value) => panic!("Expected a failure, got {}", value),
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_configure_requires_a_timeout() {
    let hooks = Arc::new(HookRegistry::new());
    assert!(matches!(
        Sandbox::configure(SandboxConfig::default(), Arc::clone(&hooks)),
        Err(Error::Configuration(ConfigurationError::MissingTimeout))
    ));
    assert!(matches!(
        Sandbox::configure(SandboxConfig::with_timeout_ms(0), hooks),
        Err(Error::Configuration(ConfigurationError::InvalidTimeout))
    ));
}

#[test]
fn test_configure_hook_can_supply_options() {
    let hooks = HookConfig::new().alter::<ConfigureSandbox>(|mut config, _| {
        config.timeout_ms.get_or_insert(75);
        Ok(config)
    });
    let sandbox = Sandbox::configure(
        SandboxConfig::default(),
        Arc::new(HookRegistry::from_config(hooks).unwrap()),
    )
    .unwrap();
    assert_eq!(sandbox.default_timeout(), Duration::from_millis(75));
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_end_to_end_scenario() {
    let sandbox = sandbox(100);
    let result = sandbox
        .evaluate(
            EvaluationRequest::new("return a + b;")
                .with_binding("a", 2)
                .with_binding("b", 3),
        )
        .unwrap();
    assert_eq!(result, EvaluationResult::Success(Value::Number(5.0)));

    let started = Instant::now();
    let result = sandbox
        .evaluate(EvaluationRequest::new("while(true){}"))
        .unwrap();
    let elapsed = started.elapsed();
    assert_eq!(failure(result), EvaluationFailure::Timeout { budget_ms: 100 });
    assert!(elapsed >= Duration::from_millis(100), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "returned after {:?}", elapsed);
}

#[test]
fn test_infinite_loop_times_out_promptly() {
    let sandbox = sandbox(50);
    for script in [
        "while (true) {}",
        "for (;;) {}",
        "do {} while (true)",
        "let a = [1]; for (const x of a) a.push(x);",
    ] {
        let started = Instant::now();
        let result = sandbox.evaluate(EvaluationRequest::new(script)).unwrap();
        let elapsed = started.elapsed();
        assert!(
            matches!(
                failure(result),
                EvaluationFailure::Timeout { budget_ms: 50 }
                    | EvaluationFailure::ResourceExceeded { .. }
            ),
            "{:?}",
            script
        );
        assert!(elapsed < Duration::from_millis(500), "{:?} took {:?}", script, elapsed);
    }
}

#[test]
fn test_timeout_cannot_be_caught() {
    let sandbox = sandbox(50);
    let result = sandbox
        .evaluate(EvaluationRequest::new(
            "try { while (true) {} } catch (e) { 'escaped' } finally { 'escaped' }",
        ))
        .unwrap();
    assert!(matches!(failure(result), EvaluationFailure::Timeout { .. }));
}

#[test]
fn test_per_request_timeout_overrides_default() {
    let sandbox = sandbox(5_000);
    let started = Instant::now();
    let result = sandbox
        .evaluate(EvaluationRequest::new("while (true) {}").with_timeout(Duration::from_millis(30)))
        .unwrap();
    assert_eq!(failure(result), EvaluationFailure::Timeout { budget_ms: 30 });
    assert!(started.elapsed() < Duration::from_millis(1_000));
}

#[test]
fn test_slow_parse_past_deadline_is_a_timeout() {
    let sandbox = sandbox(5_000);
    let script = format!("var a;\n{}a", "a = 1;\n".repeat(7_000));
    let result = sandbox
        .evaluate(EvaluationRequest::new(script).with_timeout(Duration::from_millis(1)))
        .unwrap();
    assert_eq!(failure(result), EvaluationFailure::Timeout { budget_ms: 1 });
}

#[test]
fn test_failures_are_classified() {
    let sandbox = sandbox(200);
    assert!(matches!(
        failure(sandbox.evaluate(EvaluationRequest::new("undefinedVariable + 1")).unwrap()),
        EvaluationFailure::RuntimeError { message } if message == "ReferenceError: undefinedVariable is not defined"
    ));
    assert!(matches!(
        failure(sandbox.evaluate(EvaluationRequest::new("let = ;")).unwrap()),
        EvaluationFailure::CompileError { line: 1, .. }
    ));
    assert!(matches!(
        failure(sandbox.evaluate(EvaluationRequest::new("'x'.repeat(1e9)")).unwrap()),
        EvaluationFailure::ResourceExceeded { resource: "string length", .. }
    ));
}

#[test]
fn test_script_size_limit() {
    let mut config = SandboxConfig::with_timeout_ms(100);
    config.limits.max_script_bytes = 16;
    let sandbox = Sandbox::configure(config, Arc::new(HookRegistry::new())).unwrap();
    let result = sandbox
        .evaluate(EvaluationRequest::new("1 + 1 + 1 + 1 + 1 + 1"))
        .unwrap();
    assert_eq!(
        failure(result),
        EvaluationFailure::ResourceExceeded {
            resource: "script size",
            limit: 16
        }
    );
}

#[test]
fn test_deep_nesting_is_a_compile_error() {
    let sandbox = sandbox(1_000);
    let script = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
    let result = sandbox.evaluate(EvaluationRequest::new(script)).unwrap();
    assert!(matches!(failure(result), EvaluationFailure::CompileError { .. }));
}

#[test]
fn test_evaluations_do_not_share_state() {
    let sandbox = sandbox(200);
    let first = sandbox
        .evaluate(EvaluationRequest::new("var leaked = 'first'; leaked"))
        .unwrap();
    assert_eq!(first.value(), Some(&Value::from("first")));
    let second = sandbox
        .evaluate(EvaluationRequest::new("typeof leaked"))
        .unwrap();
    assert_eq!(second.value(), Some(&Value::from("undefined")));
}

#[test]
fn test_timeout_does_not_affect_next_evaluation() {
    let sandbox = sandbox(30);
    let _ = sandbox.evaluate(EvaluationRequest::new("while (true) {}")).unwrap();
    let result = sandbox.evaluate(EvaluationRequest::new("6 * 7")).unwrap();
    assert_eq!(result.value(), Some(&Value::Number(42.0)));
}

#[test]
fn test_same_script_same_result() {
    let sandbox = sandbox(200);
    let request = EvaluationRequest::new("JSON.stringify(Object.entries(x).sort())")
        .with_binding(
            "x",
            Value::from_json(r#"{"b": [1, 2], "a": "text"}"#).unwrap(),
        );
    let first = sandbox.evaluate(request.clone()).unwrap();
    assert!(first.is_success());
    for _ in 0..3 {
        assert_eq!(sandbox.evaluate(request.clone()).unwrap(), first);
    }
}

#[test]
fn test_custom_builtins() {
    let mut builtins = BuiltInRegistry::with_core();
    builtins.register_object(
        BuiltInObject::new("Shipping").add_property("FLAT", JsValue::Number(4.5)),
    );
    let sandbox = sandbox(100).with_builtins(Arc::new(builtins));
    let result = sandbox
        .evaluate(EvaluationRequest::new("subtotal + Shipping.FLAT").with_binding("subtotal", 10))
        .unwrap();
    assert_eq!(result.value(), Some(&Value::Number(14.5)));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_looping_evaluation_does_not_block_trivial_one() {
    let sandbox = Arc::new(sandbox(400));
    let looping = {
        let sandbox = Arc::clone(&sandbox);
        thread::spawn(move || sandbox.evaluate(EvaluationRequest::new("while (true) {}")))
    };
    thread::sleep(Duration::from_millis(20));

    let started = Instant::now();
    let result = sandbox.evaluate(EvaluationRequest::new("1 + 1")).unwrap();
    assert_eq!(result.value(), Some(&Value::Number(2.0)));
    assert!(started.elapsed() < Duration::from_millis(200));

    let looped = looping.join().unwrap().unwrap();
    assert!(matches!(failure(looped), EvaluationFailure::Timeout { .. }));
}

#[test]
fn test_concurrency_limit() {
    let mut config = SandboxConfig::with_timeout_ms(300);
    config.limits.max_concurrent = 1;
    let sandbox = Arc::new(Sandbox::configure(config, Arc::new(HookRegistry::new())).unwrap());
    let busy = {
        let sandbox = Arc::clone(&sandbox);
        thread::spawn(move || sandbox.evaluate(EvaluationRequest::new("while (true) {}")))
    };
    let deadline = Instant::now() + Duration::from_millis(200);
    while sandbox.active_evaluations() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    let rejected = sandbox.evaluate(EvaluationRequest::new("1")).unwrap();
    assert_eq!(
        failure(rejected),
        EvaluationFailure::ResourceExceeded {
            resource: "concurrent evaluations",
            limit: 1
        }
    );
    busy.join().unwrap().unwrap();

    let deadline = Instant::now() + Duration::from_millis(500);
    while sandbox.active_evaluations() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    let accepted = sandbox.evaluate(EvaluationRequest::new("1")).unwrap();
    assert!(accepted.is_success());
}

#[tokio::test]
async fn test_async_evaluation() {
    let sandbox = sandbox(100);
    let result = sandbox
        .evaluate_async(
            EvaluationRequest::new("return a + b;")
                .with_binding("a", 2)
                .with_binding("b", 3),
        )
        .await
        .unwrap();
    assert_eq!(result.value(), Some(&Value::Number(5.0)));

    let started = Instant::now();
    let result = sandbox
        .evaluate_async(EvaluationRequest::new("while (true) {}"))
        .await
        .unwrap();
    assert!(matches!(failure(result), EvaluationFailure::Timeout { budget_ms: 100 }));
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_evaluations_overlap() {
    let sandbox = Arc::new(sandbox(300));
    let looping = {
        let sandbox = Arc::clone(&sandbox);
        tokio::spawn(async move {
            sandbox
                .evaluate_async(EvaluationRequest::new("while (true) {}"))
                .await
        })
    };
    let started = Instant::now();
    let quick = sandbox
        .evaluate_async(EvaluationRequest::new("[1, 2, 3].join('')"))
        .await
        .unwrap();
    assert_eq!(quick.value(), Some(&Value::from("123")));
    assert!(started.elapsed() < Duration::from_millis(200));
    assert!(looping.await.unwrap().unwrap().failure().is_some());
}

// ============================================================================
// Hooks around evaluation
// ============================================================================

#[test]
fn test_request_and_result_hooks() {
    let hooks = HookConfig::new()
        .alter::<BeforeEvaluate>(|request, _| Ok(request.with_binding("tax", 0.5)))
        .alter::<AfterEvaluate>(|result, record| {
            assert!(record.elapsed <= record.budget + Duration::from_millis(100));
            Ok(match result {
                EvaluationResult::Success(Value::Number(n)) => {
                    EvaluationResult::Success(Value::String(format!("{:.2}", n)))
                }
                other => other,
            })
        });
    let sandbox = sandbox_with_hooks(100, hooks);
    let result = sandbox
        .evaluate(EvaluationRequest::new("price * (1 + tax)").with_binding("price", 10))
        .unwrap();
    assert_eq!(result.value(), Some(&Value::from("15.00")));
}

#[test]
fn test_timeout_hook_and_log_suppression() {
    let timeouts = Arc::new(AtomicUsize::new(0));
    let logs = Arc::new(AtomicUsize::new(0));
    let hooks = {
        let timeouts = Arc::clone(&timeouts);
        let logs = Arc::clone(&logs);
        HookConfig::new()
            .on::<EvaluationTimedOut>(move |record| {
                assert_eq!(record.budget, Duration::from_millis(30));
                timeouts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .alter::<EmitLog>(move |_emit, line| {
                assert_eq!(line.kind, "timeout");
                logs.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            })
    };
    let sandbox = sandbox_with_hooks(30, hooks);

    sandbox.evaluate(EvaluationRequest::new("1")).unwrap();
    assert_eq!(timeouts.load(Ordering::SeqCst), 0);
    assert_eq!(logs.load(Ordering::SeqCst), 0);

    sandbox.evaluate(EvaluationRequest::new("while (true) {}")).unwrap();
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    assert_eq!(logs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_hook_aborts_evaluation() {
    let hooks = HookConfig::new().alter::<BeforeEvaluate>(|_, _| Err("request rejected".into()));
    let sandbox = sandbox_with_hooks(100, hooks);
    match sandbox.evaluate(EvaluationRequest::new("1")) {
        Err(Error::Hook(HookError::HandlerFailed { point, source })) => {
            assert_eq!(point, "evaluate.request");
            assert_eq!(source.to_string(), "request rejected");
        }
        other => panic!("Unexpected {:?}", other),
    }
}
