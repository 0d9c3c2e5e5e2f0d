#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quiz_listener::run().await {
        eprintln!("quiz-listener fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
