//! Server-side sessions keyed by an opaque cookie.
//!
//! Handlers never touch a global: the [`session_layer`] middleware resolves the
//! cookie to a [`Session`] handle and puts it into the request extensions, and
//! handlers receive it as an extractor. A session entry only exists once a
//! handler writes to it; read-only requests such as `/health` leave the store alone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::state::AppState;

const SESSION_ID_BYTES: usize = 32;
const DEFAULT_IDLE_SECS: i64 = 7200;

/// Anti-forgery token as kept in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub value: String,
    pub issued_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: Option<Uuid>,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
    pub csrf: Option<StoredToken>,
    pub last_seen: OffsetDateTime,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            user_id: None,
            success_message: None,
            error_message: None,
            csrf: None,
            last_seen: OffsetDateTime::now_utc(),
        }
    }
}

/// Flash messages taken out of the session for a single render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, SessionData>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_SECS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(secs: i64) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            idle_timeout: Duration::seconds(secs),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Stores `data` under a fresh random id and returns the id.
    pub fn insert(&self, data: SessionData) -> String {
        let id = random_hex(SESSION_ID_BYTES);
        self.inner.insert(id.clone(), data);
        id
    }

    pub fn create(&self) -> String {
        self.insert(SessionData::default())
    }

    pub fn remove(&self, id: &str) -> Option<SessionData> {
        self.inner.remove(id).map(|(_, data)| data)
    }

    pub fn get<R>(&self, id: &str, f: impl FnOnce(&SessionData) -> R) -> Option<R> {
        self.inner.get(id).map(|entry| f(entry.value()))
    }

    /// Runs `f` while holding the entry lock for `id`; `None` when the session is gone.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        self.inner.get_mut(id).map(|mut entry| f(entry.value_mut()))
    }

    /// Marks `id` as used at `now`. An unknown or idle id is dropped and reported as absent.
    pub fn touch(&self, id: &str, now: OffsetDateTime) -> bool {
        let live = self.update(id, |data| {
            if self.is_idle(data, now) {
                false
            } else {
                data.last_seen = now;
                true
            }
        });
        match live {
            Some(true) => true,
            Some(false) => {
                self.inner.remove(id);
                false
            }
            None => false,
        }
    }

    /// Drops every session idle at `now`; returns how many were removed.
    pub fn evict_idle(&self, now: OffsetDateTime) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, data| !self.is_idle(data, now));
        before.saturating_sub(self.inner.len())
    }

    /// Periodically evicts idle sessions until the task is dropped with the runtime.
    pub fn spawn_idle_sweep(&self, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(std::time::Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.evict_idle(OffsetDateTime::now_utc());
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "idle sessions evicted");
                }
            }
        })
    }

    pub fn handle(&self, id: Option<String>) -> Session {
        Session {
            id: Arc::new(Mutex::new(id)),
            store: self.clone(),
        }
    }

    fn is_idle(&self, data: &SessionData, now: OffsetDateTime) -> bool {
        now - data.last_seen > self.idle_timeout
    }
}

/// Per-request session context. The id is `None` until something is written.
#[derive(Clone)]
pub struct Session {
    id: Arc<Mutex<Option<String>>>,
    store: SessionStore,
}

impl Session {
    fn lock_id(&self) -> MutexGuard<'_, Option<String>> {
        self.id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_id(&self) -> Option<String> {
        self.lock_id().clone()
    }

    /// Reads the session; a missing session reads as empty.
    pub fn read<R>(&self, f: impl FnOnce(&SessionData) -> R) -> R {
        let id = self.lock_id();
        match id
            .as_deref()
            .and_then(|id| self.store.get(id, SessionData::clone))
        {
            Some(data) => f(&data),
            None => f(&SessionData::default()),
        }
    }

    /// Mutates an existing session only; `None` when there is none.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let id = self.lock_id();
        id.as_deref().and_then(|id| self.store.update(id, f))
    }

    /// Mutates the session, creating it first when absent.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut id = self.lock_id();
        if let Some(current) = id.as_deref() {
            if let Some(mut entry) = self.store.inner.get_mut(current) {
                return f(entry.value_mut());
            }
        }
        let mut data = SessionData::default();
        let out = f(&mut data);
        *id = Some(self.store.insert(data));
        debug!("new session created");
        out
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.read(|s| s.user_id)
    }

    /// Binds the user and moves the session to a fresh id.
    pub fn log_in(&self, user_id: Uuid) {
        let mut id = self.lock_id();
        let previous = id.take().and_then(|old| self.store.remove(&old));
        let data = SessionData {
            user_id: Some(user_id),
            csrf: None,
            last_seen: OffsetDateTime::now_utc(),
            ..previous.unwrap_or_default()
        };
        *id = Some(self.store.insert(data));
    }

    /// Removes the session entry; a later write starts a new anonymous session.
    pub fn log_out(&self) {
        let mut id = self.lock_id();
        if let Some(old) = id.take() {
            self.store.remove(&old);
        }
    }

    pub fn flash_success(&self, message: impl Into<String>) {
        let message = message.into();
        self.with(|s| s.success_message = Some(message));
    }

    pub fn flash_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.with(|s| s.error_message = Some(message));
    }

    /// Removes both flash messages; they are shown once.
    pub fn take_flash(&self) -> Flash {
        self.update(|s| Flash {
            success: s.success_message.take(),
            error: s.error_message.take(),
        })
        .unwrap_or_default()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            warn!("session extractor used without session_layer");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "session unavailable".to_string(),
            )
        })
    }
}

/// Resolves the session for the request and sets or clears the cookie when its id changed.
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let cfg = &state.config.session;
    let now = OffsetDateTime::now_utc();
    let incoming = jar
        .get(&cfg.cookie_name)
        .map(|c| c.value().to_string())
        .filter(|id| state.sessions.touch(id, now));

    let session = state.sessions.handle(incoming.clone());
    req.extensions_mut().insert(session.clone());
    let mut res = next.run(req).await;

    let cookie = match (incoming, session.current_id()) {
        (before, Some(after)) if before.as_deref() != Some(after.as_str()) => {
            Some(session_cookie(cfg, after))
        }
        (Some(_), None) => Some(removal_cookie(cfg)),
        _ => None,
    };
    if let Some(cookie) = cookie {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(v) => {
                res.headers_mut().append(header::SET_COOKIE, v);
            }
            Err(e) => warn!(error = %e, "session cookie not representable as header"),
        }
    }
    res
}

fn session_cookie(cfg: &SessionConfig, id: String) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), id))
        .http_only(true)
        .secure(cfg.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn removal_cookie(cfg: &SessionConfig) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), String::new()))
        .http_only(true)
        .secure(cfg.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub(crate) fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
