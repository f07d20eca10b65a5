use crate::api::ApiClient;
use crate::capture::{CaptureOptions, CaptureSession};
use crate::device::{EncoderFactory, MediaDevices};
use crate::form::{SellMachineForm, UploadPaths};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// An open capture session plus the last time a request used it
///
/// The inner value is `None` once the session has been accepted or closed.
pub struct SessionSlot {
    session: Mutex<Option<CaptureSession>>,
    last_touched: std::sync::Mutex<Instant>,
}

impl SessionSlot {
    pub fn new(session: CaptureSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            last_touched: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Lock the session and mark it as used
    pub async fn lock(&self) -> MutexGuard<'_, Option<CaptureSession>> {
        let guard = self.session.lock().await;
        self.touch();
        guard
    }

    pub fn idle_for(&self) -> Duration {
        match self.last_touched.lock() {
            Ok(last) => last.elapsed(),
            Err(poisoned) => poisoned.into_inner().elapsed(),
        }
    }

    fn touch(&self) {
        match self.last_touched.lock() {
            Ok(mut last) => *last = Instant::now(),
            Err(poisoned) => *poisoned.into_inner() = Instant::now(),
        }
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Open capture sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionSlot>>>>,

    /// The sell-machine form accepted recordings are attached to
    pub sell_form: Arc<Mutex<SellMachineForm>>,

    pub devices: Arc<dyn MediaDevices>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub api: Arc<dyn ApiClient>,
    pub capture: CaptureOptions,
    pub uploads: UploadPaths,
}

impl AppState {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        encoders: Arc<dyn EncoderFactory>,
        api: Arc<dyn ApiClient>,
        capture: CaptureOptions,
        uploads: UploadPaths,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            sell_form: Arc::new(Mutex::new(SellMachineForm::default())),
            devices,
            encoders,
            api,
            capture,
            uploads,
        }
    }

    pub async fn session(&self, session_id: &str) -> Option<Arc<SessionSlot>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Close every session no request has used for `max_idle`
    ///
    /// Covers pages that went away without closing their capture modal.
    /// Returns the number of sessions closed.
    pub async fn close_idle_sessions(&self, max_idle: Duration) -> usize {
        let expired: Vec<(String, Arc<SessionSlot>)> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, slot)| slot.idle_for() >= max_idle)
                .map(|(id, _)| id.clone())
                .collect();

            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|slot| (id, slot)))
                .collect()
        };

        let mut closed = 0;
        for (id, slot) in expired {
            if let Some(session) = slot.session.lock().await.take() {
                info!("Closing idle capture session {}", id);
                session.close();
                closed += 1;
            }
        }

        closed
    }
}

/// Periodically close sessions idle for longer than `idle_timeout`
pub fn spawn_session_reaper(state: AppState, idle_timeout: Duration) -> JoinHandle<()> {
    let period = (idle_timeout / 2).max(Duration::from_millis(10));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let closed = state.close_idle_sessions(idle_timeout).await;
            if closed > 0 {
                debug!("Reaped {} idle capture sessions", closed);
            }
        }
    })
}
