//! Client configuration.
//!
//! A [`ClientConfig`] is built once, validated in full, and immutable
//! afterwards. It comes from exactly three command-line arguments
//! (`client_id api_key_id api_secret`) or from `~/.lockbox/config.json`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lockbox_core::ClientId;
use lockbox_crypto::{ClientKeys, StaticKeyManager};
use lockbox_transport::{Credentials, ServiceUrl};

const LOCKBOX_DIR: &str = ".lockbox";
const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "lockbox.db";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Positional arguments were given, but not exactly three.
    #[error("expected 3 arguments (client_id api_key_id api_secret), got {0}")]
    WrongArgumentCount(usize),

    /// A required field was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field was present but invalid.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The home directory could not be determined.
    #[error("cannot determine home directory")]
    NoHomeDir,

    /// The config file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON.
    #[error("malformed config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// `~/.lockbox`
pub fn lockbox_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(LOCKBOX_DIR))
        .ok_or(ConfigError::NoHomeDir)
}

/// `~/.lockbox/config.json`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(lockbox_dir()?.join(CONFIG_FILE))
}

/// The service used when none is configured: a SQLite database under
/// `~/.lockbox`, or in the working directory if there is no home directory.
pub fn default_service_url() -> ServiceUrl {
    let path = lockbox_dir()
        .map(|dir| dir.join(DATABASE_FILE))
        .unwrap_or_else(|_| PathBuf::from(DATABASE_FILE));
    ServiceUrl::Sqlite(path)
}

/// On-disk layout of the config file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    client_id: Option<String>,
    api_key_id: Option<String>,
    api_secret: Option<String>,
    api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_signing_key: Option<String>,
}

/// Hex-encoded secret keys carried alongside the credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub private_key: String,
    pub private_signing_key: String,
}

impl KeyMaterial {
    pub fn from_keys(keys: &ClientKeys) -> Self {
        let (private_key, private_signing_key) = keys.to_hex();
        Self {
            private_key,
            private_signing_key,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// Everything a client needs to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: ClientId,
    pub api_key_id: String,
    pub api_secret: String,
    pub service_url: ServiceUrl,
    pub keys: Option<KeyMaterial>,
}

/// A `memory:` service starts empty on every connect, so no registration
/// could ever be found there.
fn check_persistent(service_url: &ServiceUrl) -> Result<()> {
    match service_url {
        ServiceUrl::Memory => Err(ConfigError::InvalidField {
            field: "api_url",
            reason: format!("{service_url} is in-process only and cannot hold a registration"),
        }),
        ServiceUrl::Sqlite(_) => Ok(()),
    }
}

impl ClientConfig {
    /// Validate and build a configuration.
    pub fn new(
        client_id: &str,
        api_key_id: &str,
        api_secret: &str,
        service_url: &str,
    ) -> Result<Self> {
        let service_url = required("api_url", service_url)?
            .parse::<ServiceUrl>()
            .map_err(|e| ConfigError::InvalidField {
                field: "api_url",
                reason: e.to_string(),
            })?;
        check_persistent(&service_url)?;
        Self::with_service(client_id, api_key_id, api_secret, service_url)
    }

    fn with_service(
        client_id: &str,
        api_key_id: &str,
        api_secret: &str,
        service_url: ServiceUrl,
    ) -> Result<Self> {
        let client_id = required("client_id", client_id)?;
        let client_id = ClientId::parse(client_id).map_err(|e| ConfigError::InvalidField {
            field: "client_id",
            reason: e.to_string(),
        })?;

        Ok(Self {
            client_id,
            api_key_id: required("api_key_id", api_key_id)?.to_string(),
            api_secret: required("api_secret", api_secret)?.to_string(),
            service_url,
            keys: None,
        })
    }

    /// Fails unless the service URL names a service that outlives one
    /// connection.
    pub fn validate_service(&self) -> Result<()> {
        check_persistent(&self.service_url)
    }

    /// Attach secret key material.
    pub fn with_keys(mut self, keys: KeyMaterial) -> Self {
        self.keys = Some(keys);
        self
    }

    /// From `client_id api_key_id api_secret`; the service URL defaults.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        match args {
            [client_id, api_key_id, api_secret] => Self::with_service(
                client_id.as_ref(),
                api_key_id.as_ref(),
                api_secret.as_ref(),
                default_service_url(),
            ),
            _ => Err(ConfigError::WrongArgumentCount(args.len())),
        }
    }

    /// Parse the JSON config format. All four connection fields are required.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;

        let config = Self::new(
            file.client_id.as_deref().unwrap_or_default(),
            file.api_key_id.as_deref().unwrap_or_default(),
            file.api_secret.as_deref().unwrap_or_default(),
            file.api_url.as_deref().unwrap_or_default(),
        )?;

        match (file.private_key, file.private_signing_key) {
            (Some(private_key), Some(private_signing_key)) => Ok(config.with_keys(KeyMaterial {
                private_key,
                private_signing_key,
            })),
            (None, None) => Ok(config),
            (Some(_), None) => Err(ConfigError::MissingField("private_signing_key")),
            (None, Some(_)) => Err(ConfigError::MissingField("private_key")),
        }
    }

    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Three arguments, or none and the default config file.
    pub fn load<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        if args.is_empty() {
            let path = default_config_path()?;
            tracing::debug!(path = %path.display(), "loading config file");
            Self::from_file(path)
        } else {
            Self::from_args(args)
        }
    }

    /// Serialize to the JSON config format.
    pub fn to_json(&self) -> Result<String> {
        let file = ConfigFile {
            client_id: Some(self.client_id.to_string()),
            api_key_id: Some(self.api_key_id.clone()),
            api_secret: Some(self.api_secret.clone()),
            api_url: Some(self.service_url.to_string()),
            private_key: self.keys.as_ref().map(|k| k.private_key.clone()),
            private_signing_key: self.keys.as_ref().map(|k| k.private_signing_key.clone()),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the JSON config file, creating parent directories.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_json()?).map_err(io_err)
    }

    /// The API credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id,
            api_key_id: self.api_key_id.clone(),
            api_secret: self.api_secret.clone(),
        }
    }

    /// A key manager holding the configured keys.
    ///
    /// Fails with `MissingField` if the configuration carries no keys.
    pub fn key_manager(&self) -> Result<StaticKeyManager> {
        let keys = self
            .keys
            .as_ref()
            .ok_or(ConfigError::MissingField("private_key"))?;
        StaticKeyManager::from_hex(&keys.private_key, &keys.private_signing_key).map_err(|e| {
            ConfigError::InvalidField {
                field: "private_key",
                reason: e.to_string(),
            }
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(ConfigError::MissingField(field))
    } else {
        Ok(value)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("api_key_id", &self.api_key_id)
            .field("api_secret", &"<redacted>")
            .field("service_url", &self.service_url)
            .field("keys", &self.keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CLIENT_ID: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";

    #[test]
    fn test_from_three_args() {
        let config = ClientConfig::from_args(&[CLIENT_ID, "key", "secret"]).unwrap();
        assert_eq!(config.client_id.to_string(), CLIENT_ID);
        assert_eq!(config.api_key_id, "key");
        assert_eq!(config.service_url, default_service_url());
        assert!(config.keys.is_none());
    }

    #[test]
    fn test_wrong_arg_count() {
        for args in [&["a"][..], &["a", "b"][..], &["a", "b", "c", "d"][..]] {
            assert!(matches!(
                ClientConfig::from_args(args),
                Err(ConfigError::WrongArgumentCount(n)) if n == args.len()
            ));
        }
    }

    #[test]
    fn test_invalid_client_id() {
        assert!(matches!(
            ClientConfig::from_args(&["not-a-uuid", "key", "secret"]),
            Err(ConfigError::InvalidField { field: "client_id", .. })
        ));
    }

    #[test]
    fn test_empty_field_is_missing() {
        assert!(matches!(
            ClientConfig::from_args(&[CLIENT_ID, " ", "secret"]),
            Err(ConfigError::MissingField("api_key_id"))
        ));
    }

    #[test]
    fn test_json_requires_all_four_fields() {
        let json = format!(
            r#"{{"client_id": "{CLIENT_ID}", "api_key_id": "k", "api_secret": "s"}}"#
        );
        assert!(matches!(
            ClientConfig::from_json(&json),
            Err(ConfigError::MissingField("api_url"))
        ));
    }

    #[test]
    fn test_json_full() {
        let json = format!(
            r#"{{"client_id": "{CLIENT_ID}", "api_key_id": "k", "api_secret": "s",
                 "api_url": "sqlite:///tmp/lockbox.db"}}"#
        );
        let config = ClientConfig::from_json(&json).unwrap();
        assert_eq!(
            config.service_url,
            ServiceUrl::Sqlite(PathBuf::from("/tmp/lockbox.db"))
        );
    }

    #[test]
    fn test_json_half_key_pair_rejected() {
        let json = format!(
            r#"{{"client_id": "{CLIENT_ID}", "api_key_id": "k", "api_secret": "s",
                 "api_url": "sqlite:///tmp/lockbox.db", "private_key": "00"}}"#
        );
        assert!(matches!(
            ClientConfig::from_json(&json),
            Err(ConfigError::MissingField("private_signing_key"))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ClientConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_unsupported_url() {
        assert!(matches!(
            ClientConfig::new(CLIENT_ID, "k", "s", "https://api.example.com"),
            Err(ConfigError::InvalidField { field: "api_url", .. })
        ));
    }

    #[test]
    fn test_memory_url_rejected() {
        assert!(matches!(
            ClientConfig::new(CLIENT_ID, "k", "s", "memory:"),
            Err(ConfigError::InvalidField { field: "api_url", .. })
        ));

        let json = format!(
            r#"{{"client_id": "{CLIENT_ID}", "api_key_id": "k", "api_secret": "s",
                 "api_url": "memory:"}}"#
        );
        assert!(matches!(
            ClientConfig::from_json(&json),
            Err(ConfigError::InvalidField { field: "api_url", .. })
        ));
    }

    #[test]
    fn test_file_roundtrip_with_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".lockbox").join("config.json");
        let keys = ClientKeys::generate();

        let config = ClientConfig::new(CLIENT_ID, "k", "s", "sqlite:///tmp/lockbox.db")
            .unwrap()
            .with_keys(KeyMaterial::from_keys(&keys));
        config.write_file(&path).unwrap();

        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);

        let manager = loaded.key_manager().unwrap();
        use lockbox_crypto::KeyManager;
        assert_eq!(
            manager.keys().signing.public_key(),
            keys.signing.public_key()
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ClientConfig::from_file(dir.path().join("absent.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::new(CLIENT_ID, "k", "hunter2", "sqlite:///tmp/lockbox.db")
            .unwrap()
            .with_keys(KeyMaterial {
                private_key: "deadbeef".into(),
                private_signing_key: "cafebabe".into(),
            });
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("deadbeef"));
    }
}
