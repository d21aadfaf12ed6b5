//! Security tests to verify sandbox isolation.
//!
//! These tests attempt various escape techniques to verify the evaluator
//! only exposes its builtin whitelist and the available library modules.

use std::time::Duration;

use calcpad_sandbox::prelude::*;

/// Helper to create a test sandbox config.
fn test_config() -> SandboxConfig {
    SandboxConfig::builder()
        .timeout(Duration::from_secs(5))
        .build()
}

async fn run(lines: &[&str]) -> Vec<String> {
    let sandbox = CalcSandbox::new(test_config());
    sandbox
        .evaluate(EvaluationRequest::new(lines.iter().copied()))
        .await
        .unwrap()
        .results
}

/// Test that infinite loops are properly terminated.
#[tokio::test]
async fn test_infinite_loop_timeout() {
    let config = SandboxConfig::builder()
        .timeout(Duration::from_millis(500))
        .max_steps(u64::MAX)
        .build();

    let sandbox = CalcSandbox::new(config);
    let result = sandbox
        .evaluate(EvaluationRequest::new(["while True: pass", "1 + 1"]))
        .await
        .unwrap();

    assert_eq!(result.results.len(), 2, "results stay aligned with lines");
    assert_eq!(result.results[0], "Error: execution timed out");
    assert!(result.metadata.timed_out);
}

/// Test that the step budget stops a loop well before the timeout.
#[tokio::test]
async fn test_step_budget_per_line() {
    let config = SandboxConfig::builder()
        .timeout(Duration::from_secs(30))
        .max_steps(50_000)
        .build();

    let sandbox = CalcSandbox::new(config);
    let result = sandbox
        .evaluate(EvaluationRequest::new(["while True: pass", "2 * 21"]))
        .await
        .unwrap();

    assert!(result.results[0].starts_with("Error: execution step limit exceeded"));
    assert_eq!(result.results[1], "42", "later lines get a fresh budget");
    assert!(!result.metadata.timed_out);
}

/// Test that host modules cannot be imported.
#[tokio::test]
async fn test_os_import_blocked() {
    let results = run(&[
        "import os",
        "import subprocess",
        "from os import system",
        "import socket as s",
    ])
    .await;

    assert_eq!(results[0], "Error: Module 'os' is not allowed");
    assert_eq!(results[1], "Error: Module 'subprocess' is not allowed");
    assert_eq!(results[2], "Error: Module 'os' is not allowed");
    assert_eq!(results[3], "Error: Module 'socket' is not allowed");
}

/// Test that modules without a provider are denied even though they are listed.
#[tokio::test]
async fn test_unavailable_library_import_blocked() {
    let results = run(&["import numpy", "np.sqrt(4)", "import math", "math.sqrt(16)"]).await;

    assert_eq!(results[0], "Error: Module 'numpy' is not allowed");
    assert_eq!(results[1], "Error: name 'np' is not defined");
    assert_eq!(results[2], "");
    assert_eq!(results[3], "4.0");
}

/// Test that filesystem and dynamic-code builtins do not exist.
#[tokio::test]
async fn test_dangerous_builtins_absent() {
    let results = run(&[
        "open('/etc/passwd')",
        "__import__('os')",
        "eval('1+1')",
        "exec('x = 1')",
        "globals()",
        "getattr(math, 'sqrt')",
        "print('hi')",
    ])
    .await;

    for (line, result) in results.iter().enumerate() {
        assert!(
            result.starts_with("Error: name '") && result.ends_with("' is not defined"),
            "line {line} should be undefined, got {result}"
        );
    }
}

/// Test that dunder attribute walks find nothing to escape through.
#[tokio::test]
async fn test_attribute_escape_blocked() {
    let results = run(&[
        "(1).__class__",
        "''.__class__.__mro__",
        "math.__dict__",
        "(lambda: 0).__globals__",
        "abs.__self__",
    ])
    .await;

    for result in &results {
        assert!(result.starts_with("Error: "), "expected an error, got {result}");
        assert!(result.contains("has no attribute"), "got {result}");
    }
}

/// Test that module attributes cannot be overwritten.
#[tokio::test]
async fn test_module_is_read_only() {
    let results = run(&["math.pi = 3", "math.pi"]).await;

    assert!(results[0].starts_with("Error: "));
    assert_eq!(results[1], "3.141592653589793");
}

/// Test that a binding in one request never leaks into the next.
#[tokio::test]
async fn test_requests_are_isolated() {
    let sandbox = CalcSandbox::new(test_config());

    let first = sandbox
        .evaluate(EvaluationRequest::new(["secret = 42"]))
        .await
        .unwrap();
    assert_eq!(first.context["secret"], 42);

    let second = sandbox
        .evaluate(EvaluationRequest::new(["secret"]))
        .await
        .unwrap();
    assert_eq!(second.results[0], "Error: name 'secret' is not defined");
    assert!(second.context.is_empty());
}

/// Test that huge allocations are refused instead of attempted.
#[tokio::test]
async fn test_memory_exhaustion_refused() {
    let results = run(&[
        "'a' * 10 ** 12",
        "[0] * 10 ** 12",
        "list_ = [n for n in range(10 ** 12)]",
        "len(range(10 ** 12))",
    ])
    .await;

    assert!(results[0].starts_with("Error: sequence of length"));
    assert!(results[1].starts_with("Error: sequence of length"));
    assert!(results[2].starts_with("Error: "));
    assert_eq!(results[3], "1000000000000", "ranges stay lazy");
}

/// Test that deep recursion is stopped by the call depth limit.
#[tokio::test]
async fn test_recursion_limit() {
    let results = run(&["def down(n): return down(n + 1)", "down(0)", "1"]).await;

    assert_eq!(results[1], "Error: maximum recursion depth exceeded");
    assert_eq!(results[2], "1");
}

/// Test that integer overflow is an error rather than a wrap.
#[tokio::test]
async fn test_integer_overflow_is_error() {
    let results = run(&["2 ** 63", "9223372036854775807 + 1", "2 ** 62"]).await;

    assert!(results[0].starts_with("Error: "));
    assert!(results[1].starts_with("Error: "));
    assert_eq!(results[2], "4611686018427387904");
}

/// Test that callables never leave the sandbox through the exported context.
#[tokio::test]
async fn test_code_values_not_exported() {
    let sandbox = CalcSandbox::new(test_config());
    let result = sandbox
        .evaluate(EvaluationRequest::new([
            "import math as m",
            "def f(x): return x",
            "g = lambda: 1",
            "h = abs",
            "_private = 1",
            "value = f(3)",
        ]))
        .await
        .unwrap();

    let keys: Vec<_> = result.context.keys().map(String::as_str).collect();
    assert_eq!(keys, ["value"]);
}

/// Test that values nested far deeper than any walk limit neither crash the
/// worker on teardown nor when rendered, compared or exported.
#[tokio::test]
async fn test_deep_nesting_is_contained() {
    let config = SandboxConfig::builder()
        .timeout(Duration::from_secs(60))
        .max_steps(u64::MAX)
        .stack_size(2 * 1024 * 1024)
        .build();
    let mut lines = vec!["t = []", "u = ()"];
    lines.extend(std::iter::repeat("for i in range(100000): t = [t]").take(2));
    lines.extend(std::iter::repeat("for i in range(100000): u = (u,)").take(2));
    lines.extend(["len(t)", "t == t", "{u: 1}", "u", "1"]);

    let sandbox = CalcSandbox::new(config);
    let result = sandbox
        .evaluate(EvaluationRequest::new(lines.iter().copied()))
        .await
        .unwrap();

    let tail = &result.results[lines.len() - 5..];
    assert_eq!(tail[0], "1");
    assert_eq!(tail[1], "True");
    assert_eq!(tail[2], "Error: value nested deeper than 200 levels");
    assert!(tail[3].starts_with("(((") && tail[3].contains("(...)"));
    assert_eq!(tail[4], "1");
    assert!(result.context["t"].is_array());
}

/// Test that string methods refuse results past the size limit before
/// building them.
#[tokio::test]
async fn test_string_growth_refused_before_allocation() {
    let results = run(&[
        "s = 'a' * 1000000",
        "s.replace('a', s)",
        "s.replace('a', s, 1)[:3]",
        "'-'.join([s] * 1000)",
        "'-'.join(['x', 'y'])",
        "1",
    ])
    .await;

    assert_eq!(results[0], "");
    assert!(results[1].starts_with("Error: sequence of length 1000000000000"));
    assert!(results[2].starts_with("Error: sequence of length"));
    assert!(results[3].starts_with("Error: sequence of length"));
    assert_eq!(results[4], "'x-y'");
    assert_eq!(results[5], "1");
}

/// Test that shared structure too large to show or export costs a bounded
/// amount of work and keeps every line result.
#[tokio::test]
async fn test_huge_shared_structure_is_bounded() {
    let sandbox = CalcSandbox::new(
        SandboxConfig::builder()
            .timeout(Duration::from_secs(10))
            .build(),
    );
    let result = sandbox
        .evaluate(EvaluationRequest::new([
            "a = [0] * 1000",
            "b = [a] * 1000",
            "c = [b] * 1000",
            "len(c)",
            "c",
            "[b] * 1000",
        ]))
        .await
        .unwrap();

    assert_eq!(result.results.len(), 6);
    assert_eq!(result.results[3], "1000");
    assert!(result.results[4].starts_with("Error: result is longer than"));
    assert!(result.results[5].starts_with("Error: result is longer than"));
    assert!(!result.metadata.timed_out);
    assert_eq!(result.context["a"].as_array().map(Vec::len), Some(1000));
    assert_eq!(result.context["c"], "<value too large to export>");
}

/// Test that integer edge cases are line errors or exact values, never a
/// lost batch.
#[tokio::test]
async fn test_integer_edge_cases_keep_batch() {
    let results = run(&[
        "round(5, -9223372036854775807 - 1)",
        "round(15, -4294967297)",
        "len(range(-9223372036854775807 - 1, 9223372036854775807))",
        "math.gcd(-9223372036854775807 - 1, 0)",
        "range(-9223372036854775807 - 1, 9223372036854775807)[-1]",
        "1",
    ])
    .await;

    assert_eq!(results[0], "0");
    assert_eq!(results[1], "0");
    assert_eq!(results[2], "Error: integer overflow");
    assert_eq!(results[3], "Error: integer overflow");
    assert_eq!(results[4], "9223372036854775806");
    assert_eq!(results[5], "1");
}

/// Test that a config with an empty budget is rejected up front.
#[tokio::test]
async fn test_invalid_config_rejected() {
    let sandbox = CalcSandbox::new(SandboxConfig::builder().max_steps(0).build());
    let err = sandbox
        .evaluate(EvaluationRequest::new(["1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SandboxError::Config(_)));
}
