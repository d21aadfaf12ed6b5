//! End-to-end tests for batch evaluation and the service surface.

use std::sync::Arc;
use std::time::Duration;

use calcpad_sandbox::prelude::*;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn run(lines: &[&str]) -> EvaluationResult {
    init_tracing();
    CalcSandbox::new(SandboxConfig::default())
        .evaluate(EvaluationRequest::new(lines.iter().copied()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_results_align_with_lines() {
    let lines = ["1+1", "", "# comment", "1/0", "x = 5", "x * 2", "undefined", "   "];
    let result = run(&lines).await;

    assert_eq!(result.results.len(), lines.len());
    assert_eq!(result.results[0], "2");
    assert_eq!(result.results[1], "");
    assert_eq!(result.results[2], "");
    assert!(result.results[3].starts_with("Error: "));
    assert_eq!(result.results[4], "");
    assert_eq!(result.results[5], "10");
    assert!(result.results[6].starts_with("Error: "));
    assert_eq!(result.results[7], "");
    assert_eq!(result.context, json!({"x": 5}).as_object().unwrap().clone());
}

#[tokio::test]
async fn test_page_context_namespaces() {
    init_tracing();
    let request = EvaluationRequest::new([
        "page1.x * 2",
        "page1.nested['y']",
        "total = page1.x + page2.rate",
        "page1.missing",
    ])
    .with_page("page1", json!({"x": 5, "nested": {"y": "z"}}))
    .with_page("page2", json!({"rate": 0.5}));

    let result = CalcSandbox::default().evaluate(request).await.unwrap();

    assert_eq!(result.results[0], "10");
    assert_eq!(result.results[1], "'z'");
    assert_eq!(result.results[2], "");
    assert_eq!(result.results[3], "Error: page 'page1' has no attribute 'missing'");
    assert_eq!(result.context["total"], json!(5.5));
    assert_eq!(result.context["page1"], json!({"x": 5, "nested": {"y": "z"}}));
    assert_eq!(result.context["page2"], json!({"rate": 0.5}));
}

#[tokio::test]
async fn test_library_modules() {
    let result = run(&[
        "math.factorial(10)",
        "math.gcd(12, 18)",
        "round(math.pi, 2)",
        "from math import sqrt, hypot as h",
        "sqrt(16) + h(3, 4)",
        "statistics.mean([1, 2, 3, 4])",
        "statistics.median([3, 1, 2])",
        "statistics.pstdev([2, 4, 4, 4, 5, 5, 7, 9])",
        "abs(cmath.sqrt(-4))",
        "math.sqrt(-1)",
        "statistics.mean([])",
    ])
    .await;

    assert_eq!(
        result.results[..9],
        ["3628800", "6", "3.14", "", "9.0", "2.5", "2", "2.0", "2.0"]
    );
    assert_eq!(result.results[9], "Error: math domain error");
    assert_eq!(
        result.results[10],
        "Error: mean requires at least one data point"
    );
}

#[tokio::test]
async fn test_seeded_random_is_repeatable() {
    let result = run(&[
        "random.seed(7)",
        "a = [random.randint(1, 100) for _ in range(5)]",
        "random.seed(7)",
        "b = [random.randint(1, 100) for _ in range(5)]",
        "a == b",
    ])
    .await;

    assert_eq!(result.results[4], "True");
    assert_eq!(result.context["a"], result.context["b"]);
}

#[tokio::test]
async fn test_exported_values_are_transport_safe() {
    let result = run(&[
        "t = (1, 'two', None)",
        "d = {'k': [1.5, True], 3: 'int key'}",
        "r = range(3)",
        "z = 1 + 2j",
        "big = 1e308 * 10",
        "xs = [1]",
        "xs.append(xs)",
    ])
    .await;

    assert_eq!(result.context["t"], json!([1, "two", null]));
    assert_eq!(result.context["d"], json!({"k": [1.5, true], "3": "int key"}));
    assert_eq!(result.context["r"], json!([0, 1, 2]));
    assert_eq!(result.context["z"], json!("(1+2j)"));
    assert_eq!(result.context["big"], json!("inf"));
    assert_eq!(result.context["xs"], json!([1, "[...]"]));
}

#[tokio::test]
async fn test_disabled_library() {
    init_tracing();
    let library = Arc::new(Library::new(LibraryCatalog::default().without("random")));
    let sandbox = CalcSandbox::with_library(SandboxConfig::default(), library);
    let result = sandbox
        .evaluate(EvaluationRequest::new(["import random", "random.random()", "math.e"]))
        .await
        .unwrap();

    assert_eq!(result.results[0], "Error: Module 'random' is not allowed");
    assert_eq!(result.results[1], "Error: name 'random' is not defined");
    assert_eq!(result.results[2], "2.718281828459045");
}

#[test]
fn test_blocking_entry_point() {
    let sandbox = CalcSandbox::new(
        SandboxConfig::builder()
            .timeout(Duration::from_secs(2))
            .build(),
    );
    let result = sandbox.evaluate_blocking(&EvaluationRequest::new(["def sq(v): return v * v", "sq(12)"]));
    assert_eq!(result.results, ["", "144"]);
}

#[tokio::test]
async fn test_service_evaluate_payload() {
    let service = CalcpadService::default();
    let result = service
        .evaluate(&json!({
            "lines": ["a = 2", "a ** 10"],
            "context": {"page1": {"x": 5}}
        }))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "results": ["", "1024"],
            "context": {"a": 2, "page1": {"x": 5}}
        })
    );

    let err = service
        .evaluate(&json!({"lines": {"not": "a list"}}))
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}

#[test]
fn test_service_search() {
    let service = CalcpadService::default();
    let response = serde_json::to_value(service.function_search("np.sqrt")).unwrap();

    assert_eq!(response["query"], "sqrt");
    let results = response["results"].as_array().unwrap();
    assert_eq!(results.len(), 10);

    let math = &results[0];
    assert_eq!(math["library"], "math");
    assert_eq!(math["available"], true);
    assert_eq!(math["matchCount"], 2);
    assert_eq!(math["matches"][0]["name"], "sqrt");
    assert_eq!(math["matches"][0]["signature"], "sqrt(x, /)");
    assert_eq!(math["matches"][0]["doc"], "Return the square root of x.");
    assert_eq!(math["libraryMatch"], false);

    let numpy = &results[6];
    assert_eq!(numpy["library"], "numpy");
    assert_eq!(numpy["available"], false);
    assert_eq!(numpy["matchCount"], 0);
}

#[test]
fn test_service_phrase_search() {
    let service = CalcpadService::default();
    let response = service.function_search("standard deviation");
    let stats = response
        .results
        .iter()
        .find(|r| r.library == "statistics")
        .unwrap();

    assert!(stats.matches.is_empty());
    assert_eq!(stats.human_terms, ["standard deviation"]);
    assert_eq!(stats.human_matches, ["stdev"]);
}

#[test]
fn test_service_error_log_is_bounded() {
    let service = CalcpadService::default();
    for i in 0..120 {
        service.log_error(&json!({"message": format!("failure {i}"), "lineNo": i}));
    }
    let logs = serde_json::to_value(service.error_logs()).unwrap();
    let errors = logs["errors"].as_array().unwrap();

    assert_eq!(errors.len(), 100);
    assert_eq!(errors[0]["message"], "failure 20");
    assert_eq!(errors[0]["type"], "client");
    assert_eq!(errors[99]["lineNo"], 119);
}
