//! Single-use anti-forgery tokens bound to the server-side session.

use axum::http::Method;
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::session::{random_hex, Session, SessionData, StoredToken};
use crate::views::escape;

pub const FIELD_NAME: &str = "csrf_token";
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct CsrfManager {
    ttl: Duration,
}

impl CsrfManager {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Returns the live token, generating a new one if absent or expired.
    pub fn issue(&self, session: &Session) -> String {
        let now = OffsetDateTime::now_utc();
        session.with(|data| self.issue_at(data, now))
    }

    pub fn hidden_input(&self, session: &Session) -> String {
        format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            FIELD_NAME,
            escape(&self.issue(session))
        )
    }

    /// Checks `supplied` against the stored token and consumes it on success.
    pub fn validate(&self, session: &Session, supplied: Option<&str>) -> bool {
        let now = OffsetDateTime::now_utc();
        session
            .update(|data| self.validate_at(data, supplied, now))
            .unwrap_or(false)
    }

    /// Safe methods pass through; everything else must carry a valid token.
    pub fn validate_request(
        &self,
        session: &Session,
        method: &Method,
        form_token: Option<&str>,
    ) -> bool {
        if is_safe(method) {
            return true;
        }
        self.validate(session, form_token)
    }

    pub(crate) fn issue_at(&self, data: &mut SessionData, now: OffsetDateTime) -> String {
        match &data.csrf {
            Some(t) if !self.is_expired(t, now) => t.value.clone(),
            _ => {
                let value = random_hex(TOKEN_BYTES);
                data.csrf = Some(StoredToken {
                    value: value.clone(),
                    issued_at: now,
                });
                debug!("csrf token issued");
                value
            }
        }
    }

    pub(crate) fn validate_at(
        &self,
        data: &mut SessionData,
        supplied: Option<&str>,
        now: OffsetDateTime,
    ) -> bool {
        let Some(supplied) = supplied.filter(|s| !s.is_empty()) else {
            return false;
        };
        let Some(stored) = &data.csrf else {
            return false;
        };
        if self.is_expired(stored, now) {
            data.csrf = None;
            return false;
        }

        let valid: bool = stored.value.as_bytes().ct_eq(supplied.as_bytes()).into();
        if valid {
            data.csrf = None;
        }
        valid
    }

    fn is_expired(&self, token: &StoredToken, now: OffsetDateTime) -> bool {
        now - token.issued_at > self.ttl
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}
