pub mod clock;
pub mod round_gate;
pub mod session;

use std::{sync::Arc, time::SystemTime};

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::trivia_store::TriviaStore, error::ServiceError};

pub use self::clock::{Clock, ManualClock, SystemClock, truncate_to_millis};
pub use self::round_gate::{GatedOperation, RoundPhase, TimingViolation};
pub use self::session::{SessionRegistry, SessionToken};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, session registry, clock and configuration.
pub struct AppState {
    store: RwLock<Option<Arc<dyn TriviaStore>>>,
    sessions: SessionRegistry,
    clock: Arc<dyn Clock>,
    config: AppConfig,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] reading time from the system clock.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Construct a new [`AppState`] with an injected clock.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            sessions: SessionRegistry::new(),
            clock,
            config,
            degraded: degraded_tx,
        })
    }

    /// Obtain the installed store, failing while the service is degraded.
    pub async fn require_store(&self) -> Result<Arc<dyn TriviaStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        let guard = self.store.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn TriviaStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        if self.store.read().await.is_none() {
            return true;
        }
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Identity bindings of the current process.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current instant according to the injected clock, at millisecond precision.
    ///
    /// Every instant the services persist or compare against derives from this value, so what a
    /// write returns is what later reads return from any backend.
    pub fn now(&self) -> SystemTime {
        truncate_to_millis(self.clock.now())
    }
}
