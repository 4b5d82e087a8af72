use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use kvdrop_store::CollisionPolicy;

use crate::error::{ServerError, ServerResult};

/// Largest value a key-value namespace accepts (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Base that access URLs are built on. When unset, the base is taken
    /// from the request's `Host` and `X-Forwarded-Proto` headers.
    pub public_base_url: Option<String>,
    pub max_upload_bytes: usize,
    pub collision_policy: CollisionPolicy,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub compat: CompatConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            public_base_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            collision_policy: CollisionPolicy::default(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
            compat: CompatConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Gzip bodies before handing them to the backing store.
    pub compress: bool,
    /// Rehash bodies read from the backing store before serving them.
    pub verify_on_read: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compress: false,
            verify_on_read: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1024,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Answer unknown identifiers with 400 instead of 404.
    pub legacy_not_found_status: bool,
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_upload_bytes == 0 {
            return Err(ServerError::Config("max_upload_bytes must be positive".into()));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ServerError::Config(
                "cache.max_entries must be positive when the cache is enabled".into(),
            ));
        }
        self.public_base_url()?;
        Ok(())
    }

    /// The configured public base URL, with a trailing `/` so identifiers
    /// join onto it rather than replacing its last segment.
    pub fn public_base_url(&self) -> ServerResult<Option<Url>> {
        let Some(raw) = &self.public_base_url else {
            return Ok(None);
        };
        let mut url = Url::parse(raw)
            .map_err(|e| ServerError::Config(format!("public_base_url {raw:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ServerError::Config(format!(
                "public_base_url {raw:?} must be an absolute http(s) URL"
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(Some(url))
    }
}
