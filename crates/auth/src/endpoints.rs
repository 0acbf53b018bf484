use triage_config::AuthConfig;

/// Paths of the auth endpoints, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub me: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

impl AuthEndpoints {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            login: config.login_path.clone(),
            refresh: config.refresh_path.clone(),
            logout: config.logout_path.clone(),
            me: config.me_path.clone(),
        }
    }

    /// Login and refresh authenticate by other means (submitted secret,
    /// session cookie): they never carry the bearer credential and their
    /// 401s never start a refresh.
    pub fn is_credential_issuing(&self, route: &str) -> bool {
        route == self.login || route == self.refresh
    }
}
