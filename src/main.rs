use std::sync::Arc;

use doc_courier::api;
use doc_courier::config::ServiceConfig;
use doc_courier::error::Result;
use doc_courier::llm::create_provider;
use doc_courier::pipeline::DocumentPipeline;
use doc_courier::repl;
use doc_courier::store::{InMemoryDocumentStore, InMemoryUserDirectory};

enum Mode {
    Serve,
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mode = match std::env::args().nth(1).as_deref() {
        None | Some("serve") => Mode::Serve,
        Some("repl") => Mode::Repl,
        Some(other) => {
            eprintln!("Error: unknown command '{}'", other);
            eprintln!("  usage: doc-courier [serve|repl]");
            std::process::exit(2);
        }
    };

    let config = ServiceConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  {}", e.hint());
        std::process::exit(1);
    });

    let llm = create_provider(&config.llm)?;
    let documents = Arc::new(InMemoryDocumentStore::seeded());
    let users = Arc::new(InMemoryUserDirectory::seeded());
    let pipeline = Arc::new(DocumentPipeline::new(
        llm,
        documents,
        users,
        config.pipeline.clone(),
    ));

    eprintln!("📨 Doc Courier v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!(
        "   Clearance guard: {}",
        if config.pipeline.enforce_clearance { "on" } else { "off" }
    );

    match mode {
        Mode::Serve => {
            eprintln!("   API: http://0.0.0.0:{}/process", config.port);
            eprintln!("   Demo: http://0.0.0.0:{}/demo-scenarios\n", config.port);
            api::serve(config.port, pipeline).await?;
        }
        Mode::Repl => {
            eprintln!("   Enter an email. Empty sender to quit.\n");
            repl::run(&pipeline).await?;
        }
    }

    Ok(())
}
