//! The example session: write, read back, share and list.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use lockbox::config::default_config_path;
use lockbox::{Client, ClientConfig, ClientId, ErrorKind, RecordData, StaticKeyManager};

use crate::RunArgs;

pub const FEEDBACK: &str = "feedback";
pub const THANKS: &str = "lockbox_says_thanks";

/// Load the configuration the arguments point at.
fn load_config(args: &RunArgs) -> Result<ClientConfig> {
    match (&args.config, args.credentials.is_empty()) {
        (Some(path), true) => {
            println!("Reading configuration from: {}", path.display());
            Ok(ClientConfig::from_file(path)?)
        }
        (_, true) => {
            println!("Reading configuration from: {}", default_config_path()?.display());
            Ok(ClientConfig::load(&args.credentials)?)
        }
        (_, false) => {
            println!("Reading configuration from: command line");
            Ok(ClientConfig::load(&args.credentials)?)
        }
    }
}

/// Keys from the configuration, or else from the config file.
///
/// Credentials given on the command line carry no keys.
fn key_manager(config: &ClientConfig, args: &RunArgs) -> Result<StaticKeyManager> {
    if config.keys.is_some() {
        return Ok(config.key_manager()?);
    }

    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    debug!(path = %path.display(), "loading keys");
    let file = ClientConfig::from_file(&path)?;
    if file.client_id != config.client_id {
        warn!(
            configured = %config.client_id,
            in_file = %file.client_id,
            "keys in config file belong to another client"
        );
    }
    Ok(file.key_manager()?)
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let keys = key_manager(&config, &args)?;
    let client = Client::connect(&config, keys)
        .await
        .with_context(|| format!("connecting to {}", config.service_url))?;

    if !args.no_write {
        write_feedback(&client).await?;
    }

    if let Some(reader) = &args.share_with {
        let transition = client
            .share(reader, FEEDBACK)
            .await
            .with_context(|| format!("sharing {FEEDBACK} with {reader}"))?;
        println!("Shared {FEEDBACK} with {reader}: {:?} -> {:?}", transition.from, transition.to);
    }

    print_records(&client, args.limit).await?;
    print_feedback(&client, args.thank).await
}

async fn write_feedback(client: &Client) -> Result<()> {
    let data = RecordData::new().with("comment", "Hello World! I successfully ran the example program.");
    let record_id = client.write(FEEDBACK, data).await?;
    println!("Feedback created: {record_id}");

    let record = client.read(&record_id).await?;
    println!("Read the comment: {}", record.field("comment").unwrap_or_default());
    Ok(())
}

async fn print_records(client: &Client, limit: usize) -> Result<()> {
    println!();
    println!("{:<40} Type", "Record ID");
    println!("{}", "-".repeat(50));
    for meta in client.list(limit, 0, &[]).await? {
        println!("{:<40} {}", meta.record_id.to_string(), meta.record_type);
    }
    Ok(())
}

async fn print_feedback(client: &Client, thank: bool) -> Result<()> {
    println!();
    println!("{:<40} Comment", "Writer ID");
    println!("{}", "-".repeat(50));

    let mut cursor = client.cursor(&[FEEDBACK])?;
    while let Some(meta) = cursor.next().await? {
        let record = match client.read(&meta.record_id).await {
            Ok(record) => record,
            Err(e) if e.kind() == ErrorKind::AccessDenied => {
                warn!(record_id = %meta.record_id, "skipping unreadable record");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let Some(comment) = record.field("comment") else {
            continue;
        };
        println!("{} says: {comment}", meta.writer_id);

        if thank && meta.writer_id != client.id() {
            send_thanks(client, &meta.writer_id).await?;
        }
    }
    Ok(())
}

/// Let a feedback writer read this client's thank-you records, if any
/// were written.
async fn send_thanks(client: &Client, writer_id: &ClientId) -> Result<()> {
    match client.share(writer_id, THANKS).await {
        Ok(transition) => {
            debug!(writer = %writer_id, ?transition, "thanked");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::KeyNotFound => {
            debug!(writer = %writer_id, "no {THANKS} records to share");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
