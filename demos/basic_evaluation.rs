//! Basic example of evaluating a batch of lines.
//!
//! Run with: cargo run --example basic_evaluation

use std::time::Duration;

use calcpad_sandbox::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    // Configure the sandbox
    let config = SandboxConfig::builder()
        .timeout(Duration::from_secs(5))
        .max_steps(100_000)
        .build();

    println!("Creating sandbox with config: {:?}", config);
    let sandbox = CalcSandbox::new(config);

    println!("\n=== Test 1: Lines and results ===");
    let lines = [
        "# loan payment",
        "principal = 250000",
        "rate = 0.045 / 12",
        "months = 30 * 12",
        "payment = principal * rate / (1 - (1 + rate) ** -months)",
        "round(payment, 2)",
        "1 / 0",
        "import os",
    ];
    let result = sandbox.evaluate(EvaluationRequest::new(lines)).await?;
    for (line, output) in lines.iter().zip(&result.results) {
        println!("{:<60} | {}", line, output);
    }
    println!("steps: {}", result.metadata.steps);
    println!("duration: {:?}", result.metadata.duration);

    println!("\n=== Test 2: Page contexts ===");
    let request = EvaluationRequest::new(["budget.rent + budget.food", "ratio = budget.rent / budget.income"])
        .with_page("budget", json!({"rent": 1200, "food": 450, "income": 5000}));
    let result = sandbox.evaluate(request).await?;
    println!("results: {:?}", result.results);
    println!(
        "context: {}",
        serde_json::to_string_pretty(&result.context).unwrap_or_default()
    );

    println!("\n=== Test 3: Runaway loop ===");
    let result = sandbox
        .evaluate(EvaluationRequest::new(["while True: pass", "'still running'"]))
        .await?;
    println!("results: {:?}", result.results);

    Ok(())
}
