//! `lockbox register`: create an identity and save its configuration.

use anyhow::{bail, Context, Result};
use tracing::info;

use lockbox::config::{default_config_path, default_service_url};
use lockbox::crypto::ClientKeys;
use lockbox::transport::register_client;
use lockbox::{ClientConfig, KeyMaterial, ServiceUrl};

use crate::RegisterArgs;

pub async fn register(args: RegisterArgs) -> Result<()> {
    let path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    if path.exists() && !args.force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }

    let url = match args.url {
        Some(url) => url.parse::<ServiceUrl>()?,
        None => default_service_url(),
    };
    if url == ServiceUrl::Memory {
        bail!("cannot register with {url}: the service would not outlive this command");
    }

    let keys = ClientKeys::generate();
    let backend = url.open().with_context(|| format!("opening {url}"))?;
    let credentials = register_client(
        backend.as_ref(),
        keys.encryption.public_key(),
        keys.signing.public_key(),
    )
    .await?;

    let config = ClientConfig {
        client_id: credentials.client_id,
        api_key_id: credentials.api_key_id,
        api_secret: credentials.api_secret,
        service_url: url,
        keys: Some(KeyMaterial::from_keys(&keys)),
    };
    config.write_file(&path)?;

    info!(client_id = %config.client_id, path = %path.display(), "registered");
    println!("Registered client {}", config.client_id);
    println!("Configuration written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegisterArgs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_register_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let args = || RegisterArgs {
            url: Some(format!("sqlite://{}", dir.path().join("lockbox.db").display())),
            config: Some(path.clone()),
            force: false,
        };

        register(args()).await.unwrap();
        let first = ClientConfig::from_file(&path).unwrap();
        assert!(first.keys.is_some());

        assert!(register(args()).await.is_err());

        register(RegisterArgs { force: true, ..args() }).await.unwrap();
        let second = ClientConfig::from_file(&path).unwrap();
        assert_ne!(first.client_id, second.client_id);
    }

    #[tokio::test]
    async fn test_register_rejects_memory() {
        let dir = TempDir::new().unwrap();
        let err = register(RegisterArgs {
            url: Some("memory:".to_string()),
            config: Some(dir.path().join("config.json")),
            force: false,
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("memory:"));
    }
}
