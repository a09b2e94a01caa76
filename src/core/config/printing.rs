use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        let params = self.generation_params();
        println!("Current configuration:");
        println!("  model: {}", self.model());
        println!("  models-file: {}", path_display(self.models_file()));
        println!("  personas-dir: {}", path_display(self.personas_dir()));
        let personas = self.default_personas();
        if personas.is_empty() {
            println!("  default-personas: (none)");
        } else {
            println!("  default-personas: {}", personas.join(", "));
        }
        println!("  log-dir: {}", path_display(self.log_dir()));
        println!("  temperature: {}", params.temperature);
        println!("  max-tokens: {}", params.max_tokens);
        println!("  max-turns: {}", self.max_turns());
        println!("  base-url: {}", self.base_url());
        println!("  api-key-env: {}", self.api_key_env());
        match self.stream() {
            true => println!("  stream: on"),
            false => println!("  stream: off"),
        }
        println!("  request-timeout: {}s", self.request_timeout().as_secs());
        println!("  panel-bind: {}", self.panel_bind());
    }
}
