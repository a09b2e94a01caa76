fn main() {
    if let Err(e) = goblin_chat::cli::main() {
        eprintln!("❌ Error: {e}");
        std::process::exit(1);
    }
}
