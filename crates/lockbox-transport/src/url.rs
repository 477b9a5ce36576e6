//! Service URLs for the local backends.
//!
//! - `memory:` opens a fresh, empty in-process backend. Client
//!   configurations refuse it, since nothing registered there survives.
//! - `sqlite://<path>` opens (creating if needed) a SQLite database file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{Result, TransportError};
use crate::memory::MemoryBackend;
use crate::sqlite::SqliteBackend;

const MEMORY_SCHEME: &str = "memory:";
const SQLITE_SCHEME: &str = "sqlite://";

/// Where a client's record service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceUrl {
    Memory,
    Sqlite(PathBuf),
}

impl ServiceUrl {
    /// Open the backend this URL names.
    pub fn open(&self) -> Result<Arc<dyn Backend>> {
        match self {
            Self::Memory => Ok(Arc::new(MemoryBackend::new())),
            Self::Sqlite(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Arc::new(SqliteBackend::open(path)?))
            }
        }
    }
}

impl FromStr for ServiceUrl {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == MEMORY_SCHEME {
            return Ok(Self::Memory);
        }
        match s.strip_prefix(SQLITE_SCHEME) {
            Some(path) if !path.is_empty() => Ok(Self::Sqlite(PathBuf::from(path))),
            Some(_) => Err(TransportError::InvalidUrl(format!("{s}: missing path"))),
            None => Err(TransportError::InvalidUrl(format!(
                "{s}: expected {MEMORY_SCHEME} or {SQLITE_SCHEME}<path>"
            ))),
        }
    }
}

impl fmt::Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str(MEMORY_SCHEME),
            Self::Sqlite(path) => write!(f, "{SQLITE_SCHEME}{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory() {
        assert_eq!("memory:".parse::<ServiceUrl>().unwrap(), ServiceUrl::Memory);
    }

    #[test]
    fn test_parse_sqlite() {
        let url: ServiceUrl = "sqlite:///tmp/lockbox.db".parse().unwrap();
        assert_eq!(url, ServiceUrl::Sqlite(PathBuf::from("/tmp/lockbox.db")));
        assert_eq!(url.to_string(), "sqlite:///tmp/lockbox.db");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!("https://api.example.com".parse::<ServiceUrl>().is_err());
        assert!("sqlite://".parse::<ServiceUrl>().is_err());
    }

    #[test]
    fn test_open_sqlite_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("lockbox.db");
        let url = ServiceUrl::Sqlite(path.clone());

        url.open().unwrap();
        assert!(path.exists());
    }
}
