//! `finrag retrieve`: show the chunks and sources for a query.

pub async fn run(query: String, top_k: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let pipeline = super::build_pipeline(&config)?;
    let cancel = super::cancel_on_ctrl_c();

    let result = pipeline
        .retrieve_context(&query, None, top_k, &cancel)
        .await?;

    if result.is_empty() {
        println!("No matching chunks. Is the index at {} populated?", config.index.path.display());
        return Ok(());
    }

    for (i, chunk) in result.chunks.iter().enumerate() {
        println!("--- [CHUNK {}] ---\n{chunk}\n", i + 1);
    }
    println!("Sources:");
    for source in &result.sources {
        println!("  - {source}");
    }

    Ok(())
}
