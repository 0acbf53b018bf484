//! Config schema for the tracker client (API endpoint and auth settings).

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

/// Where the tracker API lives and how long a single call may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto.
    pub base_url: String,

    /// Per-request transport timeout. `0` disables it.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".into(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// Auth endpoint paths and credential handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub login_path: String,
    pub refresh_path: String,
    pub logout_path: String,
    pub me_path: String,

    /// Upper bound on a single refresh cycle. Unset means only the transport
    /// timeout applies, and a hung refresh holds every queued request.
    pub refresh_timeout_secs: Option<u64>,

    /// Override for the credential file (defaults to
    /// `~/.config/triage/credentials.json`).
    pub credentials_path: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/auth/login".into(),
            refresh_path: "/auth/refresh".into(),
            logout_path: "/auth/logout".into(),
            me_path: "/auth/me".into(),
            refresh_timeout_secs: None,
            credentials_path: None,
        }
    }
}

impl AuthConfig {
    pub fn refresh_timeout(&self) -> Option<Duration> {
        self.refresh_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tracker_contract() {
        let cfg = TriageConfig::default();
        assert_eq!(cfg.api.base_url, "http://localhost:3000/api");
        assert_eq!(cfg.auth.refresh_path, "/auth/refresh");
        assert_eq!(cfg.auth.login_path, "/auth/login");
        assert!(cfg.auth.refresh_timeout().is_none());
        assert_eq!(cfg.api.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_request_timeout_disables_it() {
        let api = ApiConfig {
            request_timeout_secs: 0,
            ..ApiConfig::default()
        };
        assert!(api.request_timeout().is_none());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let cfg: TriageConfig = toml::from_str(
            r#"
            [auth]
            refresh_timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.auth.refresh_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(cfg.auth.logout_path, "/auth/logout");
        assert_eq!(cfg.api, ApiConfig::default());
    }
}
