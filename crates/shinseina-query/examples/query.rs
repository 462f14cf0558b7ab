//! Run one catalogue query from the command line.
//!
//! `cargo run -p shinseina-query --example query -- 5 rare flora that glows`
//! Reads `config.toml` from the current directory; `RUST_LOG` controls logging.
use std::env;

use shinseina_core::config::Config;
use shinseina_query::QueryEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let text = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() { eprintln!("Usage: query <search text>"); std::process::exit(1); }

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let engine = QueryEngine::from_config(&config)?;
    let report = engine.explain(&text)?;

    println!("\n--- Top Results ---");
    if report.results.is_empty() { println!("No results found."); }
    for r in &report.results {
        println!("{}", r);
        if let Some(link) = &r.link { println!("       {}", link); }
    }
    for d in &report.diagnostics { eprintln!("note: {}", d); }
    Ok(())
}
