use crate::core::config::{path_display, Config};
use crate::core::persona::PersonaStore;
use std::error::Error;

pub fn list_personas(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = PersonaStore::new(config.personas_dir());
    let personas: Vec<String> = store.scan().collect();

    println!(
        "Available persona files (from {}):\n",
        path_display(store.root())
    );

    if personas.is_empty() {
        println!("  No .xml files found.");
        println!("\n💡 Add persona files to the directory above, or point");
        println!("   personas_dir in the config file somewhere else.");
        return Ok(());
    }

    let defaults = config.default_personas();
    for persona in &personas {
        if defaults.contains(persona) {
            println!("  • {persona} (default)");
        } else {
            println!("  • {persona}");
        }
    }
    println!("\n💡 Merge personas into a chat with:");
    println!("   goblin -P <persona> [-P <persona> ...]");

    Ok(())
}
