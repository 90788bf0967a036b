use std::sync::Arc;
use anyhow::Context;
use dropslot::config::Config;
use dropslot::{FileInfo, HttpRecordClient, SlotConfig, SlotEvent, UploadService, UploadSlot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load("config.toml")?;
    let path = std::env::args().nth(1).context("Usage: dropslot <file>")?;
    let metadata = std::fs::metadata(&path).with_context(|| format!("Failed to stat {path}"))?;
    let name = std::path::Path::new(&path)
        .file_name()
        .and_then(|name| name.to_str())
        .context("File has no readable name")?
        .to_string();

    let client = HttpRecordClient::new(&config.endpoint, &config.token)?;
    let service = Arc::new(UploadService::new(Arc::new(client)));
    let slot = UploadSlot::with_service(
        SlotConfig {
            max_file_size: config.max_file_size,
            ..SlotConfig::default()
        },
        service,
    );
    let mut events = slot.subscribe_events();

    slot.add_file(FileInfo {
        name,
        size: metadata.len(),
        mime: "application/octet-stream".to_string(),
    })
    .await?;
    slot.upload().await?;

    while let Ok(event) = events.recv().await {
        match event {
            SlotEvent::Progress { percent } => println!("{percent}%"),
            SlotEvent::Completed { uploaded_at } => {
                println!("Completed at {uploaded_at}");
                break;
            }
            SlotEvent::Failed { error } => {
                println!("Failed: {error}");
                break;
            }
            _ => {}
        }
    }

    slot.shutdown().await;

    Ok(())
}
