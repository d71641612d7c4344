use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application-level constants
pub const APP_NAME: &str = "HealthVault";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "0.0.0.0:5001";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "medgemma";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "healthvault=info,healthvault_lib=info,tower_http=info"
}

/// Get the application data directory (~/HealthVault)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} is required when {reason}")]
    Missing { key: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    Gemini,
}

impl FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Ollama,
    /// Local all-MiniLM-L6-v2 via ONNX Runtime (`onnx-embeddings` feature).
    Onnx,
}

impl FromStr for EmbeddingBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "onnx" => Ok(Self::Onnx),
            _ => Err(()),
        }
    }
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub rate_limit_per_hour: u32,
    pub rate_limit_per_day: u32,
    /// Key clients on `X-Forwarded-For` instead of the socket peer.
    /// Enable only behind a reverse proxy that overwrites the header.
    pub trust_proxy: bool,
    pub llm_provider: LlmProvider,
    pub ollama_url: String,
    pub ollama_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub llm_timeout_secs: u64,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_model_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub rag_top_k: usize,
    pub pbkdf2_iterations: u32,
}

impl AppConfig {
    /// Defaults rooted at `data_dir`, with no environment lookups.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5001)),
            data_dir: data_dir.to_path_buf(),
            database_path: data_dir.join("healthvault.db"),
            environment: "production".to_string(),
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            max_upload_bytes: 50 * 1024 * 1024,
            rate_limit_per_hour: 50,
            rate_limit_per_day: 200,
            trust_proxy: false,
            llm_provider: LlmProvider::Ollama,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            llm_timeout_secs: 300,
            embedding_backend: EmbeddingBackend::Ollama,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_model_dir: data_dir.join("models").join("all-MiniLM-L6-v2"),
            chunk_size: 10_000,
            chunk_overlap: 1_000,
            rag_top_k: 5,
            pbkdf2_iterations: crate::crypto::PBKDF2_ITERATIONS,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = get("HEALTHVAULT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let mut config = Self::for_data_dir(&data_dir);

        if let Some(path) = get("HEALTHVAULT_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = get("EMBEDDING_MODEL_DIR") {
            config.embedding_model_dir = PathBuf::from(dir);
        }
        if let Some(env) = get("HEALTHVAULT_ENV") {
            config.environment = env;
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        config.bind_addr = parse_or(&get, "HEALTHVAULT_BIND", config.bind_addr)?;
        let upload_mb: usize = parse_or(&get, "MAX_UPLOAD_MB", 50)?;
        config.max_upload_bytes = upload_mb * 1024 * 1024;
        config.rate_limit_per_hour = parse_or(&get, "RATE_LIMIT_PER_HOUR", config.rate_limit_per_hour)?;
        config.rate_limit_per_day = parse_or(&get, "RATE_LIMIT_PER_DAY", config.rate_limit_per_day)?;
        config.trust_proxy = parse_or(&get, "TRUST_PROXY", config.trust_proxy)?;
        config.llm_timeout_secs = parse_or(&get, "LLM_TIMEOUT_SECS", config.llm_timeout_secs)?;
        config.chunk_size = parse_or(&get, "CHUNK_SIZE", config.chunk_size)?;
        config.chunk_overlap = parse_or(&get, "CHUNK_OVERLAP", config.chunk_overlap)?;
        config.rag_top_k = parse_or(&get, "RAG_TOP_K", config.rag_top_k)?;
        config.pbkdf2_iterations = parse_or(&get, "PBKDF2_ITERATIONS", config.pbkdf2_iterations)?;

        if let Some(provider) = get("LLM_PROVIDER") {
            config.llm_provider = provider.parse().map_err(|_| ConfigError::Invalid {
                key: "LLM_PROVIDER",
                value: provider.clone(),
            })?;
        }
        if let Some(backend) = get("EMBEDDING_BACKEND") {
            config.embedding_backend = backend.parse().map_err(|_| ConfigError::Invalid {
                key: "EMBEDDING_BACKEND",
                value: backend.clone(),
            })?;
        }
        if let Some(url) = get("OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            config.ollama_model = model;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        config.gemini_api_key = get("GEMINI_API_KEY");

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.llm_provider == LlmProvider::Gemini && self.gemini_api_key.is_none() {
            return Err(ConfigError::Missing {
                key: "GEMINI_API_KEY",
                reason: "LLM_PROVIDER=gemini",
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "CHUNK_SIZE",
                value: self.chunk_size.to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid {
                key: "CHUNK_OVERLAP",
                value: self.chunk_overlap.to_string(),
            });
        }
        if self.rag_top_k == 0 {
            return Err(ConfigError::Invalid {
                key: "RAG_TOP_K",
                value: "0".to_string(),
            });
        }
        if self.pbkdf2_iterations == 0 {
            return Err(ConfigError::Invalid {
                key: "PBKDF2_ITERATIONS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with("HealthVault"));
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[("HEALTHVAULT_DATA_DIR", "/tmp/hv")])).unwrap();
        assert_eq!(config.bind_addr.port(), 5001);
        assert_eq!(config.database_path, PathBuf::from("/tmp/hv/healthvault.db"));
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.rate_limit_per_hour, 50);
        assert_eq!(config.rate_limit_per_day, 200);
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.chunk_overlap, 1_000);
        assert_eq!(config.rag_top_k, 5);
        assert_eq!(config.llm_provider, LlmProvider::Ollama);
        assert!(!config.trust_proxy);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HEALTHVAULT_BIND", "127.0.0.1:8080"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example ,"),
            ("MAX_UPLOAD_MB", "10"),
            ("RAG_TOP_K", "3"),
            ("LLM_PROVIDER", "Gemini"),
            ("GEMINI_API_KEY", "key"),
            ("TRUST_PROXY", "true"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.rag_top_k, 3);
        assert_eq!(config.llm_provider, LlmProvider::Gemini);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert!(config.trust_proxy);
    }

    #[test]
    fn gemini_requires_key() {
        let err = AppConfig::from_lookup(lookup(&[("LLM_PROVIDER", "gemini")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "GEMINI_API_KEY", .. }));
    }

    #[test]
    fn invalid_number_reports_key() {
        let err = AppConfig::from_lookup(lookup(&[("CHUNK_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CHUNK_SIZE", .. }));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let err = AppConfig::from_lookup(lookup(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CHUNK_OVERLAP", .. }));
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("LLM_PROVIDER", "openai")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LLM_PROVIDER", .. }));
    }
}
