use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    #[serde(default)]
    assistant: Assistant,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "App::default_token_ttl_days")]
    token_ttl_days: i64,
    #[serde(default = "App::default_pass_threshold")]
    pass_threshold: f64,
    #[serde(default = "App::default_uploads_dir")]
    uploads_dir: String,
}

/// OpenAI-compatible chat completion endpoint used by the study bot.
/// Without an `api_key` the bot answers with a canned study plan.
#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "Assistant::default_base_url")]
    base_url: String,
    #[serde(default = "Assistant::default_model")]
    model: String,
    #[serde(default = "Assistant::default_timeout_secs")]
    timeout_secs: u64,
}

impl Config {
    pub fn from_toml(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let raw = read_config(use_local)?;
                    Self::from_toml(&raw)
                };

                match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    fn default_token_ttl_days() -> i64 {
        7
    }

    fn default_pass_threshold() -> f64 {
        crate::scoring::DEFAULT_PASS_THRESHOLD
    }

    fn default_uploads_dir() -> String {
        String::from("uploads")
    }

    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn token_ttl_days(&self) -> i64 {
        self.token_ttl_days
    }

    #[inline]
    pub fn pass_threshold(&self) -> f64 {
        self.pass_threshold
    }

    #[inline]
    pub fn uploads_dir(&self) -> &str {
        &self.uploads_dir
    }
}

impl Default for Assistant {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl Assistant {
    fn default_base_url() -> String {
        String::from("https://api.openai.com/v1")
    }

    fn default_model() -> String {
        String::from("gpt-4o-mini")
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    /// Empty keys count as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Upper bound on one upstream call before the fallback answers.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
