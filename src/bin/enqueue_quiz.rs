use std::env;

use anyhow::{anyhow, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let quiz_ids: Vec<String> = env::args().skip(1).collect();
    if quiz_ids.is_empty() {
        return Err(anyhow!("Usage: enqueue-quiz <quiz-id> [<quiz-id> ...]"));
    }

    if let Err(e) = quiz_listener::enqueue_ai_processing(&quiz_ids).await {
        eprintln!("enqueue-quiz fatal: {e:#}");
        std::process::exit(1);
    }

    for quiz_id in &quiz_ids {
        println!("queued {quiz_id}");
    }
    Ok(())
}
