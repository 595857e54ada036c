//! `finrag ask`: answer one question, optionally following up on prior turns.

use std::path::{Path, PathBuf};

use finrag_core::message::TurnHistory;

pub async fn run(message: String, history: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let pipeline = super::build_pipeline(&config)?;

    let history = history.as_deref().map(read_history).transpose()?;
    let cancel = super::cancel_on_ctrl_c();

    let result = pipeline.answer(&message, history.as_ref(), &cancel).await?;

    if let Some(rewritten) = &result.rewritten_query {
        println!("(searched for: {rewritten})\n");
    }
    println!("{}", result.answer);

    if !result.sources.is_empty() {
        println!("\nSources:");
        for source in &result.sources {
            println!("  - {source}");
        }
    }

    Ok(())
}

fn read_history(path: &Path) -> Result<TurnHistory, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
    let history: TurnHistory = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid history {}: {e}", path.display()))?;
    history.validate()?;
    Ok(history)
}
