//! Example of searching the indexed library functions.
//!
//! Run with: cargo run --example function_search -- [query]

use calcpad_sandbox::prelude::*;

fn main() -> Result<()> {
    let service = CalcpadService::default();

    println!("=== Libraries ===");
    for library in service.libraries().libraries {
        let status = if library.available { "available" } else { "missing" };
        println!("{:<12} {}", library.name, status);
    }

    let queries: Vec<String> = match std::env::args().nth(1) {
        Some(query) => vec![query],
        None => ["sqrt", "np.log", "square root", "standard deviation"]
            .iter()
            .map(|q| q.to_string())
            .collect(),
    };

    for query in queries {
        println!("\n=== Search: {query:?} ===");
        let response = service.function_search(&query);
        for bundle in response.results.iter().filter(|r| {
            r.match_count > 0 || !r.human_matches.is_empty() || r.library_match
        }) {
            println!(
                "{} (available: {}, library match: {})",
                bundle.library, bundle.available, bundle.library_match
            );
            for m in &bundle.matches {
                println!("  {:<40} {}", m.signature, m.description);
            }
            if !bundle.human_matches.is_empty() {
                println!(
                    "  phrases {:?} -> {}",
                    bundle.human_terms,
                    bundle.human_matches.join(", ")
                );
            }
        }
    }

    println!("\n=== Function info ===");
    let info = service.function_info("math", "hypot")?;
    println!("{}\n{}\n{}", info.signature, info.doc, info.doc_url);

    Ok(())
}
