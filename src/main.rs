// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use graff_rs::config::LlmConfig;
use graff_rs::graff::output;
use graff_rs::graff::server::{self, ViewerState};
use graff_rs::{Graph, Notifier, ScaffLoader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a blueprint file
    Run {
        /// Path to the blueprint YAML
        #[arg(short, long)]
        file: String,

        /// Text made available to the run as the `result` of an `input` node
        #[arg(short, long)]
        input: Option<String>,

        /// LLM provider (groq, openai, ollama)
        #[arg(long)]
        provider: Option<String>,

        /// LLM model name
        #[arg(short, long)]
        model: Option<String>,

        /// Serve the live viewer on this port and keep it up after the run
        #[arg(long)]
        serve: Option<u16>,

        /// Log a snapshot of the graph on every change
        #[arg(long)]
        print_updates: bool,
    },
    /// Check that a blueprint file loads
    Validate {
        #[arg(short, long)]
        file: String,
    },
    /// Send a single prompt to the configured LLM
    Prompt {
        #[arg(short, long)]
        prompt: String,

        #[arg(long)]
        provider: Option<String>,

        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            file,
            input,
            provider,
            model,
            serve,
            print_updates,
        } => {
            let config = LlmConfig::from_env()?.with_overrides(provider.as_deref(), model)?;
            // Blueprints without llm blocks run fine without a client.
            let client = match config.build_client() {
                Ok(client) => Some(client),
                Err(e) => {
                    log::warn!("No LLM client available: {}", e);
                    None
                }
            };

            let scaff = ScaffLoader::new(client)
                .load_file(&file)
                .with_context(|| format!("failed to load blueprint {}", file))?;

            let notifier = Notifier::new();
            let graph = Graph::with_notifier(notifier.clone());
            if print_updates {
                output::print_updates(&notifier, graph.reader());
            }
            if let Some(port) = serve {
                let state = ViewerState::new(&notifier, graph.reader());
                tokio::spawn(async move {
                    if let Err(e) = server::serve(port, state).await {
                        log::error!("Viewer failed: {}", e);
                    }
                });
            }

            if let Some(text) = input {
                let seed = graph.new_node("input", None);
                seed.set_str("result", &text);
                seed.mark_done();
            }

            println!("Running blueprint: {}", file);
            let result = scaff.go(&graph).await;
            println!("{}", serde_json::to_string_pretty(&output::snapshot(&graph.reader()))?);
            result?;

            if serve.is_some() {
                println!("Run finished; viewer still up, press Ctrl-C to exit");
                tokio::signal::ctrl_c().await?;
            }
        }
        Commands::Validate { file } => {
            ScaffLoader::validate_file(&file)
                .with_context(|| format!("invalid blueprint {}", file))?;
            println!("{} is valid", file);
        }
        Commands::Prompt {
            prompt,
            provider,
            model,
        } => {
            let config = LlmConfig::from_env()?.with_overrides(provider.as_deref(), model)?;
            let client = config.build_client()?;

            println!("Sending prompt: {}", prompt);
            let response = client.chat("", &prompt, None).await?;
            println!("Response: {}", response);
        }
    }

    Ok(())
}
