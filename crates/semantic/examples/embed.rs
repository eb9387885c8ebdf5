//! Embed a snippet with the configured backend.
//!
//! ```bash
//! cargo run -p asm-semantic --example embed -- "mov eax, 1\nret"
//! cargo run -p asm-semantic --example embed -- "mov eax, 1\nret" stub
//! ```
//!
//! The candle backend downloads `microsoft/codebert-base` into `./models` on first use.

use std::{env, error::Error};

use semantic::{Backend, Embedder, EmbedderConfig};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let text = args.next().unwrap_or_else(|| "mov eax, 1\nret".into());
    let backend = match args.next().as_deref() {
        Some("stub") => Backend::Stub,
        _ => Backend::Candle,
    };

    let cfg = EmbedderConfig {
        backend,
        ..EmbedderConfig::default()
    };

    let embedder = Embedder::load(&cfg)?;
    let embedding = embedder.embed(&text)?;
    println!("model: {}", embedder.model_id());
    println!(
        "tokens: {}/{} (truncated: {})",
        embedding.token_count,
        embedder.max_sequence_length(),
        embedding.truncated
    );
    println!("dim: {}", embedding.embedding_dim);
    println!(
        "first values: {:?}",
        &embedding.vector[..embedding.vector.len().min(8)]
    );

    Ok(())
}
