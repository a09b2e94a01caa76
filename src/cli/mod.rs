//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod model_list;
pub mod persona_list;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::chat::{run_chat, ChatOptions};
use crate::cli::model_list::list_models;
use crate::cli::persona_list::list_personas;
use crate::core::config::Config;
use crate::logging::init_tracing;

#[derive(Parser)]
#[command(name = "goblin")]
#[command(about = "Persona-driven chat with a hosted LLM, in the terminal or the browser")]
#[command(
    long_about = "Goblin merges one or more persona files into a system instruction and chats \
with a hosted chat-completions endpoint. Every session is saved as a plain-text transcript.\n\n\
Environment Variables:\n\
  HUNYUAN_API_KEY   API key sent as a bearer token (name configurable via api_key_env)\n\
  RUST_LOG          Diagnostic log filter (written to stderr)\n\n\
Terminal chat:\n\
  exit / quit       End the session and save the transcript\n\
  Ctrl+D / Ctrl+C   End the session and save the transcript"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Model to chat with
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Persona file to merge into the system message (repeat to merge several, in order)
    #[arg(short = 'P', long = "persona", global = true, value_name = "PERSONA")]
    pub personas: Vec<String>,

    /// Start without any persona
    #[arg(long, global = true, conflicts_with = "personas")]
    pub no_persona: bool,

    /// Sampling temperature (0.0 to 2.0)
    #[arg(short = 't', long, global = true)]
    pub temperature: Option<f32>,

    /// Maximum tokens per reply (64 to 4096)
    #[arg(long, global = true, value_name = "N")]
    pub max_tokens: Option<u32>,

    /// Log debug diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Chat in the terminal (default)
    Chat,
    /// Serve the browser panel
    Panel {
        /// Address to listen on
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// List persona files found in the personas directory
    Personas,
    /// List selectable models
    Models,
    /// Show the effective configuration
    Config,
}

impl Args {
    /// Chat options after applying flags over the config.
    pub fn chat_options(&self, config: &Config) -> ChatOptions {
        let personas = if self.no_persona {
            Vec::new()
        } else if !self.personas.is_empty() {
            self.personas.clone()
        } else {
            config.default_personas()
        };

        ChatOptions {
            model: self.model.clone().unwrap_or_else(|| config.model()),
            personas,
            params: config
                .generation_params()
                .with_overrides(self.temperature, self.max_tokens),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async_main());
    // stdin reads run on a blocking thread that may still be parked
    runtime.shutdown_background();
    result
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose)?;
    let config = Config::load(args.config.as_deref())?;

    match args.command.as_ref().unwrap_or(&Commands::Chat) {
        Commands::Chat => run_chat(&config, args.chat_options(&config)).await,
        Commands::Panel { bind } => {
            let bind = bind
                .clone()
                .unwrap_or_else(|| config.panel_bind().to_string());
            crate::panel::serve(config, &bind).await
        }
        Commands::Personas => list_personas(&config),
        Commands::Models => list_models(&config),
        Commands::Config => {
            config.print_all();
            Ok(())
        }
    }
}
