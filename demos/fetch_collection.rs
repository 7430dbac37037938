//! Fetch a collection and print it as JSON
//!
//! Usage: `cargo run --example fetch_collection -- <username> [LOG_LEVEL]`
//!
//! Ctrl+C cancels the fetch, including while the service is still
//! preparing the export.

use bgg_collection::{CollectionClient, Config, logging};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(username) = args.next() else {
        eprintln!("Usage: fetch_collection <username> [ERROR|WARN|INFO|TRACE]");
        std::process::exit(2);
    };
    logging::init(args.next().as_deref().unwrap_or("INFO"));

    let client = CollectionClient::new(Config::default())?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C signal");
            on_signal.cancel();
        }
    });

    let collection = client.fetch_collection(&username, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&collection)?);

    Ok(())
}
