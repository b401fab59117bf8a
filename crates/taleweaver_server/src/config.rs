//! Layered application configuration.
//!
//! Sources, lowest precedence first:
//! - Bundled defaults (include_str! from taleweaver.toml)
//! - `~/.config/taleweaver/taleweaver.toml`
//! - `./taleweaver.toml`
//! - `TALEWEAVER_<SECTION>__<KEY>` environment variables

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use taleweaver_core::{ModelCatalog, TokenLimitRange, UnitEstimator};
use taleweaver_error::{ConfigError, TaleweaverError, TaleweaverResult};
use taleweaver_models::OllamaConfig;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../taleweaver.toml");

/// Token limit settings.
///
/// # Example
///
/// ```toml
/// [generation]
/// min_tokens = 100
/// max_tokens = 4000
/// default_tokens = 1000
/// estimator = "words"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Smallest limit a request may ask for
    pub min_tokens: u32,
    /// Largest limit a request may ask for
    pub max_tokens: u32,
    /// Limit used when a request names none
    pub default_tokens: u32,
    /// How generated text is counted against the limit
    pub estimator: UnitEstimator,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let range = TokenLimitRange::default();
        Self {
            min_tokens: *range.min_tokens(),
            max_tokens: *range.max_tokens(),
            default_tokens: *range.default_tokens(),
            estimator: UnitEstimator::default(),
        }
    }
}

/// Story storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory stories are written to
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Model classification lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Uncensored models suggested to users
    pub uncensored: Vec<String>,
    /// Name fragments that mark a model as uncensored
    pub uncensored_keywords: Vec<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let catalog = ModelCatalog::default();
        Self {
            uncensored: catalog.recommended_uncensored().to_vec(),
            uncensored_keywords: catalog.uncensored_keywords().to_vec(),
        }
    }
}

/// Complete Taleweaver configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaleweaverConfig {
    /// Inference service connection
    pub ollama: OllamaConfig,
    /// Token limits
    pub generation: GenerationConfig,
    /// Story storage
    pub storage: StorageConfig,
    /// Web server
    pub server: ServerConfig,
    /// Model classification
    pub models: ModelsConfig,
}

impl TaleweaverConfig {
    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is invalid.
    #[instrument]
    pub fn load() -> TaleweaverResult<Self> {
        debug!("Loading configuration");
        let home = dirs::home_dir().map(|home| home.join(".config/taleweaver/taleweaver.toml"));
        Self::load_layered(home.as_deref(), Some(Path::new("taleweaver.toml")), None)
    }

    /// Load the bundled defaults overridden by one explicit file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or invalid.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_from_file(path: impl AsRef<Path>) -> TaleweaverResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::missing_file(path).into());
        }
        Self::load_layered(None, Some(path), None)
    }

    /// Parse TOML layered over the bundled defaults.
    ///
    /// Environment variables are not consulted.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn from_toml_str(toml: &str) -> TaleweaverResult<Self> {
        Self::build(
            Config::builder()
                .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
                .add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    /// Layer the given sources.
    ///
    /// `env` replaces the process environment when given.
    pub fn load_layered(
        home: Option<&Path>,
        local: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> TaleweaverResult<Self> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = home {
            builder = builder.add_source(File::from(home).required(false));
        }
        if let Some(local) = local {
            builder = builder.add_source(File::from(local).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("TALEWEAVER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> TaleweaverResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| TaleweaverError::from(ConfigError::load(e.to_string())))?
            .try_deserialize()
            .map_err(|e| TaleweaverError::from(ConfigError::load(e.to_string())))?;

        config.validate()?;
        debug!(
            base_url = %config.ollama.base_url(),
            model = %config.ollama.default_model(),
            output_dir = %config.storage.output_dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Check values that deserialization cannot.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ollama.base_url().trim().is_empty() {
            return Err(ConfigError::new("ollama.base_url must not be empty"));
        }
        if self.ollama.default_model().trim().is_empty() {
            return Err(ConfigError::new("ollama.default_model must not be empty"));
        }
        if *self.ollama.request_timeout_secs() == 0 || *self.ollama.status_timeout_secs() == 0 {
            return Err(ConfigError::new("ollama timeouts must be at least one second"));
        }
        if self.server.port == 0 {
            return Err(ConfigError::new("server.port must not be 0"));
        }
        if self.storage.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::new("storage.output_dir must not be empty"));
        }
        self.token_limits().map(|_| ())
    }

    /// Validated token limit range.
    pub fn token_limits(&self) -> Result<TokenLimitRange, ConfigError> {
        TokenLimitRange::new(
            self.generation.min_tokens,
            self.generation.max_tokens,
            self.generation.default_tokens,
        )
    }

    /// Model catalog built from the `models` section.
    pub fn catalog(&self) -> ModelCatalog {
        ModelCatalog::new(
            self.models.uncensored.clone(),
            self.models.uncensored_keywords.clone(),
        )
    }
}
