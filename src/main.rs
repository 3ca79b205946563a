#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = alfred_rust::run().await {
        eprintln!("alfred-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
