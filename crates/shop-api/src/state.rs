//! # Application State
//!
//! Shared state for the Axum application.
//! Contains configuration, the product catalog and the per-customer sessions.

use lru::LruCache;
use parking_lot::Mutex;
use shop_core::{
    FileStore, KeyValueStore, MemoryStore, ProductCatalog, ShopError, ShopResult, ShopSession,
};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Live sessions kept when `MAX_SESSIONS` is unset
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Idle lifetime when `SESSION_IDLE_SECS` is unset
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Explicit catalog file; searched for under `config/` when unset
    pub catalog_path: Option<PathBuf>,
    /// Directory for file-backed sessions; in-memory when unset
    pub data_dir: Option<PathBuf>,
    /// Upper bound on sessions held in memory
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped from memory
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            catalog_path: std::env::var_os("CATALOG_PATH").map(PathBuf::from),
            data_dir: std::env::var_os("DATA_DIR").map(PathBuf::from),
            max_sessions: std::env::var("MAX_SESSIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(DEFAULT_MAX_SESSIONS),
            session_idle_timeout: std::env::var("SESSION_IDLE_SECS")
                .ok()
                .and_then(|secs| secs.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_IDLE),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            catalog_path: None,
            data_dir: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_idle_timeout: DEFAULT_SESSION_IDLE,
        }
    }
}

/// Check a client-supplied session id
pub fn validate_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= 100
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

struct SessionEntry {
    session: Arc<Mutex<ShopSession>>,
    last_seen: Instant,
}

/// Live sessions keyed by id, each behind its own lock.
///
/// Sessions start only through [`SessionRegistry::create`]. At most
/// `capacity` are held in memory; the least recently used one is dropped
/// when a new one arrives, and any left idle past `idle_timeout` are dropped
/// on the next access. Disk-backed sessions are reloaded from `data_dir`
/// after being dropped; in-memory ones are gone.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<LruCache<String, SessionEntry>>>,
    data_dir: Option<PathBuf>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    /// Sessions kept in memory only
    pub fn in_memory(capacity: usize, idle_timeout: Duration) -> Self {
        Self::build(None, capacity, idle_timeout)
    }

    /// Sessions persisted under `data_dir/<session_id>/`
    pub fn on_disk(data_dir: impl Into<PathBuf>, capacity: usize, idle_timeout: Duration) -> Self {
        Self::build(Some(data_dir.into()), capacity, idle_timeout)
    }

    fn build(data_dir: Option<PathBuf>, capacity: usize, idle_timeout: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Arc::new(Mutex::new(LruCache::new(capacity))),
            data_dir,
            idle_timeout,
        }
    }

    /// Start a session under `session_id`
    pub fn create(&self, session_id: &str) -> ShopResult<()> {
        check_session_id(session_id)?;

        let store: Arc<dyn KeyValueStore> = match &self.data_dir {
            Some(dir) => Arc::new(FileStore::open(dir.join(session_id))?),
            None => Arc::new(MemoryStore::new()),
        };
        let session = Arc::new(Mutex::new(ShopSession::restore(store)));

        let mut sessions = self.sessions.lock();
        self.evict_idle(&mut sessions);
        Self::admit(&mut sessions, session_id, session);
        debug!(session_id, "session created");
        Ok(())
    }

    /// Run `f` against an existing session.
    ///
    /// The session lock is held for the duration of `f`; `f` must not block.
    pub fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut ShopSession) -> R,
    ) -> ShopResult<R> {
        let session = self.lookup(session_id)?;
        let mut guard = session.lock();
        Ok(f(&mut guard))
    }

    /// Number of sessions held in memory
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    fn lookup(&self, session_id: &str) -> ShopResult<Arc<Mutex<ShopSession>>> {
        check_session_id(session_id)?;

        let mut sessions = self.sessions.lock();
        self.evict_idle(&mut sessions);
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_seen = Instant::now();
            return Ok(entry.session.clone());
        }

        // Only sessions that were created and written to disk come back.
        let dir = self
            .data_dir
            .as_ref()
            .map(|dir| dir.join(session_id))
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| ShopError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir)?);
        let session = Arc::new(Mutex::new(ShopSession::restore(store)));
        Self::admit(&mut sessions, session_id, session.clone());
        debug!(session_id, "session reloaded from disk");
        Ok(session)
    }

    fn admit(
        sessions: &mut LruCache<String, SessionEntry>,
        session_id: &str,
        session: Arc<Mutex<ShopSession>>,
    ) {
        let entry = SessionEntry {
            session,
            last_seen: Instant::now(),
        };
        if let Some((evicted, _)) = sessions.push(session_id.to_string(), entry) {
            if evicted != session_id {
                info!(session_id = %evicted, "session limit reached, dropped least recently used");
            }
        }
    }

    fn evict_idle(&self, sessions: &mut LruCache<String, SessionEntry>) {
        loop {
            let expired = matches!(
                sessions.peek_lru(),
                Some((_, entry)) if entry.last_seen.elapsed() >= self.idle_timeout
            );
            if !expired {
                break;
            }
            if let Some((session_id, _)) = sessions.pop_lru() {
                debug!(session_id = %session_id, "dropped idle session");
            }
        }
    }
}

fn check_session_id(session_id: &str) -> ShopResult<()> {
    if validate_session_id(session_id) {
        Ok(())
    } else {
        Err(ShopError::InvalidSession {
            session_id: session_id.to_string(),
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Customer sessions
    pub sessions: SessionRegistry,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState from environment configuration
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_product_catalog(config.catalog_path.as_ref())?;
        Ok(Self::with_catalog(config, catalog))
    }

    /// Build state around an already-loaded catalog
    pub fn with_catalog(config: AppConfig, catalog: ProductCatalog) -> Self {
        let (capacity, idle) = (config.max_sessions, config.session_idle_timeout);
        let sessions = match &config.data_dir {
            Some(dir) => {
                info!("Persisting sessions under {}", dir.display());
                SessionRegistry::on_disk(dir.clone(), capacity, idle)
            }
            None => SessionRegistry::in_memory(capacity, idle),
        };

        Self {
            catalog: Arc::new(catalog),
            sessions,
            config,
        }
    }
}

/// Load product catalog from config file
fn load_product_catalog(explicit: Option<&PathBuf>) -> anyhow::Result<ProductCatalog> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let catalog = ProductCatalog::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        info!("Loaded {} products from {}", catalog.products.len(), path.display());
        return Ok(catalog);
    }

    // Try to load from config/products.toml
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    // Return empty catalog if no config found
    warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}
