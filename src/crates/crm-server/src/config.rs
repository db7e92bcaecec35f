//! Server configuration (spec §6 "Environment configuration"), loaded with
//! [`tooling::config::ConfigBuilder`] the way the rest of the workspace's
//! ambient config does.

use tooling::config::{get_env, get_env_bool, get_env_or, ConfigBuilder};
use tooling::{Result as ToolingResult, ToolingError};

/// Which environment the domain API base URL points at. Classified from the
/// URL itself rather than configured separately, mirroring how the original
/// orchestrator told `rc` and `production` CRM hosts apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrlKind {
    Rc,
    Production,
    Custom,
}

fn classify_base_url(url: &str) -> BaseUrlKind {
    if url.contains("rc.") || url.contains("//rc-") {
        BaseUrlKind::Rc
    } else if url.contains("production") || url.ends_with(".com") || url.ends_with(".com/") {
        BaseUrlKind::Production
    } else {
        BaseUrlKind::Custom
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub base_url_kind: BaseUrlKind,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub checkpoint_db_url: Option<String>,
    pub memory_api_key: Option<String>,
    pub use_v2_architecture: bool,
    pub tracing_enabled: bool,
    pub tracing_project: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: String::new(),
            base_url_kind: BaseUrlKind::Custom,
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            checkpoint_db_url: None,
            memory_api_key: None,
            use_v2_architecture: true,
            tracing_enabled: false,
            tracing_project: None,
            openai_api_key: None,
        }
    }
}

impl ServerConfig {
    pub fn oauth_exchange_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }

    pub fn token_exchange_url(&self) -> String {
        format!("{}/oauth/session-token", self.base_url)
    }

    pub fn refresh_url(&self) -> String {
        format!("{}/oauth/refresh", self.base_url)
    }
}

impl ConfigBuilder for ServerConfig {
    fn validate(&self) -> ToolingResult<()> {
        if self.base_url.is_empty() {
            return Err(ToolingError::General("BASE_URL is required".to_string()));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ToolingError::General("CLIENT_ID and CLIENT_SECRET are required".to_string()));
        }
        Ok(())
    }

    fn from_env(_prefix: &str) -> ToolingResult<Self> {
        let host = get_env_or("HOST", "127.0.0.1")?;
        let port = get_env("PORT")?.map(|v| v.parse::<u16>().map_err(|e| ToolingError::General(format!("PORT must be a valid u16: {e}")))).transpose()?.unwrap_or(8080);
        let base_url = get_env_or("BASE_URL", "")?;

        Ok(Self {
            host,
            port,
            base_url_kind: classify_base_url(&base_url),
            base_url,
            client_id: get_env_or("CLIENT_ID", "")?,
            client_secret: get_env_or("CLIENT_SECRET", "")?,
            redirect_uri: get_env_or("REDIRECT_URI", "")?,
            checkpoint_db_url: get_env("CHECKPOINT_DB_URL")?,
            memory_api_key: get_env("MEMORY_API_KEY")?,
            use_v2_architecture: get_env_bool("USE_V2_ARCHITECTURE")?.unwrap_or(true),
            tracing_enabled: get_env_bool("TRACING_ENABLED")?.unwrap_or(false),
            tracing_project: get_env("TRACING_PROJECT")?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        if !other.base_url.is_empty() {
            self.base_url = other.base_url;
            self.base_url_kind = other.base_url_kind;
        }
        if !other.client_id.is_empty() {
            self.client_id = other.client_id;
        }
        if !other.client_secret.is_empty() {
            self.client_secret = other.client_secret;
        }
        if !other.redirect_uri.is_empty() {
            self.redirect_uri = other.redirect_uri;
        }
        if other.checkpoint_db_url.is_some() {
            self.checkpoint_db_url = other.checkpoint_db_url;
        }
        if other.memory_api_key.is_some() {
            self.memory_api_key = other.memory_api_key;
        }
        if other.openai_api_key.is_some() {
            self.openai_api_key = other.openai_api_key;
        }
        self.use_v2_architecture = other.use_v2_architecture;
        self.tracing_enabled = other.tracing_enabled;
        if other.tracing_project.is_some() {
            self.tracing_project = other.tracing_project;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rc_hosts() {
        assert_eq!(classify_base_url("https://rc.example-crm.com/api"), BaseUrlKind::Rc);
    }

    #[test]
    fn classifies_production_hosts() {
        assert_eq!(classify_base_url("https://api.example-crm.com"), BaseUrlKind::Production);
    }

    #[test]
    fn anything_else_is_custom() {
        assert_eq!(classify_base_url("http://localhost:9000"), BaseUrlKind::Custom);
    }

    #[test]
    fn validate_requires_base_url_and_oauth_client() {
        let config = ServerConfig::default();
        assert!(config.validate().is_err());
    }
}
