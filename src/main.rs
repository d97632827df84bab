use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use e2e_agent::agent::E2eTestAgent;
use e2e_agent::config::Config;
use e2e_agent::llm::{LanguageModel, OpenAiClient};
use e2e_agent::server::{self, AppState};
use e2e_agent::store::TestStore;

#[derive(Parser)]
#[command(name = "e2e-agent", about = "LLM-driven end-to-end browser testing agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the test harness HTTP API.
    Serve,
    /// Run the agent once against a requirement and print the transcript.
    Run { requirement: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(&config));

    match cli.command {
        Commands::Serve => {
            let store = Arc::new(TestStore::open(&config.db_path)?);
            let agent = Arc::new(E2eTestAgent::new(llm.clone(), &config));
            let state = AppState {
                store,
                agent,
                llm,
                reports_dir: config.reports_dir.clone(),
            };
            server::serve(state, &config.bind_addr).await
        }
        Commands::Run { requirement } => {
            let agent = E2eTestAgent::new(llm, &config);
            let outcome = agent.run(&requirement).await?;
            for entry in &outcome.transcript {
                println!("[{}] {}", entry.kind.as_str(), entry.content);
            }
            println!(
                "run ended: {:?} after {} action(s)",
                outcome.status, outcome.cycles
            );
            Ok(())
        }
    }
}
