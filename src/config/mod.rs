use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the scraping proxy credential
pub const PROXY_API_KEY_ENV: &str = "STASH_PROXY_API_KEY";

/// Environment variable holding the summarizer API key
pub const SUMMARIZER_API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transcript fetching
    pub fetch: FetchConfig,

    /// AI summaries
    pub summarizer: SummarizerConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Caption languages to try first, in order
    pub preferred_languages: Vec<String>,

    /// Upper bound for every outbound request, in seconds
    pub timeout_secs: u64,

    /// User agent sent to YouTube and the proxy
    pub user_agent: String,

    /// Scraping proxy used by the fallback source
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy fetch endpoint
    pub endpoint: String,

    /// Use the proxy when a credential is available
    pub enabled: bool,

    /// Credential, read from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Generate summaries when saving videos
    pub enabled: bool,

    /// OpenAI-compatible chat completions endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,

    /// Transcript characters sent to the model
    pub max_input_chars: usize,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound for the generated summary
    pub max_tokens: u32,

    /// API key, read from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Saved videos file (defaults to the platform data directory)
    pub store_path: Option<PathBuf>,

    /// User the CLI acts as when --user is not given
    pub default_user_id: u64,

    /// Default output format
    pub default_output_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig {
                preferred_languages: vec!["en".to_string()],
                timeout_secs: 30,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
                proxy: ProxyConfig {
                    endpoint: "https://api.scraperapi.com/".to_string(),
                    enabled: true,
                    api_key: None,
                },
            },
            summarizer: SummarizerConfig {
                enabled: true,
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                max_input_chars: 4000,
                temperature: 0.4,
                max_tokens: 1000,
                api_key: None,
            },
            app: AppConfig {
                store_path: None,
                default_user_id: 1,
                default_output_format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            serde_yaml::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("stash").join("config.yaml"))
    }

    /// Pick up secrets from the environment
    pub fn apply_env(&mut self) {
        self.fetch.proxy.api_key = non_empty_env(PROXY_API_KEY_ENV);
        self.summarizer.api_key = non_empty_env(SUMMARIZER_API_KEY_ENV);
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.fetch.preferred_languages.iter().all(|lang| lang.trim().is_empty()) {
            anyhow::bail!("At least one preferred caption language must be configured");
        }

        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be greater than zero");
        }

        if self.summarizer.max_input_chars == 0 {
            anyhow::bail!("summarizer.max_input_chars must be greater than zero");
        }

        if self.fetch.proxy.enabled && self.fetch.proxy.endpoint.trim().is_empty() {
            anyhow::bail!("fetch.proxy.endpoint must be set when the proxy is enabled");
        }

        Ok(())
    }

    /// Timeout applied to each outbound request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    /// Proxy credential, if the proxied source should run
    pub fn active_proxy_key(&self) -> Option<&str> {
        if !self.fetch.proxy.enabled {
            return None;
        }
        self.fetch.proxy.api_key.as_deref()
    }

    /// Summarizer key, if summaries should be generated
    pub fn active_summarizer_key(&self) -> Option<&str> {
        if !self.summarizer.enabled {
            return None;
        }
        self.summarizer.api_key.as_deref()
    }

    /// Location of the saved videos file
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.app.store_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir()
            .context("Could not determine data directory")?;

        Ok(data_dir.join("stash").join("videos.json"))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Preferred Languages: {}", self.fetch.preferred_languages.join(", "));
        println!("  Request Timeout: {}s", self.fetch.timeout_secs);
        let proxy_status = match (self.fetch.proxy.enabled, self.fetch.proxy.api_key.is_some()) {
            (false, _) => "disabled".to_string(),
            (true, true) => "configured".to_string(),
            (true, false) => format!("no {} set", PROXY_API_KEY_ENV),
        };
        println!("  Proxy: {} ({})", self.fetch.proxy.endpoint, proxy_status);
        println!(
            "  Summarizer: {} ({})",
            self.summarizer.model,
            if self.active_summarizer_key().is_some() { "configured" } else { "not configured" }
        );
        if let Some(path) = &self.app.store_path {
            println!("  Store: {}", path.display());
        }
        println!("  Default User: {}", self.app.default_user_id);
        println!("  Default Format: {}", self.app.default_output_format);
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
