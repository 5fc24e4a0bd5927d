use chrono::{DateTime, Duration, Utc};

/// Explicit per-session state handed to the engine at startup.
///
/// Nothing in the engine reads ambient globals; whatever the login flow
/// knows about the current session is passed in here.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Option<String>,
    pub auth_token: Option<String>,
    /// Set right after a login. Any view ledger or cached engagement state
    /// from a previous user must not leak into this session.
    pub fresh_login: bool,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            auth_token: None,
            fresh_login: false,
            started_at: Utc::now(),
        }
    }

    pub fn authenticated(user_id: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            auth_token: Some(auth_token.into()),
            fresh_login: false,
            started_at: Utc::now(),
        }
    }

    pub fn with_fresh_login(mut self, fresh_login: bool) -> Self {
        self.fresh_login = fresh_login;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// User id for logs, `anonymous` when signed out.
    pub fn display_user(&self) -> &str {
        match &self.user_id {
            Some(id) if !id.is_empty() => id.as_str(),
            _ => "anonymous",
        }
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
