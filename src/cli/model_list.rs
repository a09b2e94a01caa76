//! Model listing functionality
//!
//! Models come from the local allow-list file, or the built-in list when it is absent.

use crate::core::config::{path_display, Config};
use std::error::Error;

pub fn list_models(config: &Config) -> Result<(), Box<dyn Error>> {
    let models_file = config.models_file();
    let source = if models_file.is_file() {
        path_display(&models_file)
    } else {
        "built-in list".to_string()
    };
    let default_model = config.model();

    println!("🤖 Available Models ({source})");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    for model in config.models() {
        if model == default_model {
            println!("  • {model} (default)");
        } else {
            println!("  • {model}");
        }
    }

    let params = config.generation_params();
    println!();
    println!(
        "🎛️  Defaults: temperature {:.1}, max tokens {}",
        params.temperature, params.max_tokens
    );

    Ok(())
}
