//! Server state and configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::compose::CaptionFont;
use crate::error::QuickQrError;
use crate::generator::Generator;
use crate::history::{FileStore, HistoryStore, KeyValueStore, MemoryStore};
use crate::session::Composition;

/// Idle time after which a composition session is dropped.
pub const SESSION_EXPIRATION_SECS: u64 = 30 * 60;

/// Default upload limit for logos.
pub const DEFAULT_MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:3000")
    pub listen_addr: String,
    /// Directory holding the persisted history; `None` uses the platform data dir
    pub data_dir: Option<PathBuf>,
    /// TrueType font used for frame captions; `None` uses the built-in bitmap font
    pub font_path: Option<PathBuf>,
    /// Idle session lifetime
    pub session_ttl: Duration,
    /// Maximum accepted logo upload size in bytes
    pub max_logo_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            data_dir: None,
            font_path: None,
            session_ttl: Duration::from_secs(SESSION_EXPIRATION_SECS),
            max_logo_bytes: DEFAULT_MAX_LOGO_BYTES,
        }
    }
}

impl ServerConfig {
    /// Resolve the history directory, falling back to `<data dir>/quickqr`.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("quickqr")))
    }
}

/// Marks a generation as in flight; cleared on drop.
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    /// Claim the flag, or fail if another generation holds it.
    pub fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, QuickQrError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| QuickQrError::Busy)?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A composition plus its bookkeeping.
pub struct CompositionSession {
    pub composition: Composition,
    pub generating: Arc<AtomicBool>,
    pub last_accessed: Instant,
}

impl CompositionSession {
    pub fn new() -> Self {
        Self {
            composition: Composition::new(),
            generating: Arc::new(AtomicBool::new(false)),
            last_accessed: Instant::now(),
        }
    }

    /// Update last accessed time.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

impl Default for CompositionSession {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSession = Arc<Mutex<CompositionSession>>;

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub generator: Generator,
    pub font: CaptionFont,
    /// Writes persist synchronously; take an owned guard into `spawn_blocking`.
    pub history: Arc<RwLock<HistoryStore>>,
    pub sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl AppState {
    /// Build state from configuration: load the caption font and history.
    ///
    /// A history directory that cannot be created degrades to an in-memory
    /// store; a font that cannot be loaded is a configuration error.
    pub fn new(config: ServerConfig) -> Result<Self, QuickQrError> {
        let font = match &config.font_path {
            Some(path) => CaptionFont::load(path)?,
            None => CaptionFont::Spleen,
        };

        let backend: Box<dyn KeyValueStore> = match config.resolved_data_dir() {
            Some(dir) => match FileStore::open(&dir) {
                Ok(store) => {
                    tracing::info!(dir = %store.dir().display(), "history directory");
                    Box::new(store)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "history will not survive restarts");
                    Box::new(MemoryStore::new())
                }
            },
            None => {
                tracing::warn!("no data directory available; history kept in memory");
                Box::new(MemoryStore::new())
            }
        };

        Ok(Self::with_parts(
            config,
            Generator::default(),
            font,
            HistoryStore::load(backend),
        ))
    }

    pub fn with_parts(
        config: ServerConfig,
        generator: Generator,
        font: CaptionFont,
        history: HistoryStore,
    ) -> Self {
        Self {
            config,
            generator,
            font,
            history: Arc::new(RwLock::new(history)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a session by its string id.
    pub async fn session(&self, id: &str) -> Result<SharedSession, QuickQrError> {
        let session_id = Uuid::parse_str(id)
            .map_err(|_| QuickQrError::Validation("Invalid session ID".to_string()))?;
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| QuickQrError::NotFound("Session not found or expired".to_string()))
    }

    /// Drop sessions idle for longer than the configured TTL.
    ///
    /// Sessions that are currently locked are in use and kept.
    pub async fn expire_sessions(&self, now: Instant) -> usize {
        let ttl = self.config.session_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| match s.try_lock() {
            Ok(s) => now.saturating_duration_since(s.last_accessed) < ttl,
            Err(_) => true,
        });
        before - sessions.len()
    }
}
