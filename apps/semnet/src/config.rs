//! # Configuration
//!
//! `semnet.toml`, parsed with serde defaults so every section is optional.
//!
//! ```toml
//! [knowledge]
//! source = "kitchen.json"
//!
//! [dispatcher]
//! timeout_ms = 5000
//!
//! [scheme]
//! language = "lang_ru"
//! labels = "ru"
//!
//! [llm]
//! endpoint = "http://localhost:11434/v1"
//! model = "qwen2.5"
//! api_key_env = "SEMNET_LLM_KEY"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use crate::llm::LlmIntentRouter;
use semnet_core::primitives::{DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_LANGUAGE};
use semnet_core::{
    Dispatcher, KnowledgeBase, KnowledgeSource, OperationRegistry, SchemeLabels, SearchSettings,
    SemnetError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "semnet.toml";

/// Maximum size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum size of a knowledge source (100 MB).
const MAX_SOURCE_FILE_SIZE: u64 = 100 * 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// JSON knowledge source loaded at startup.
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Bounded wait for an operation's completion signal.
    pub timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeConfig {
    /// Language class of step texts.
    pub language: String,
    /// Marker label set: `en` or `ru`.
    pub labels: String,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            labels: "en".to_string(),
        }
    }
}

/// OpenAI-compatible chat-completion endpoint used for intent routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended.
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub knowledge: KnowledgeConfig,
    pub dispatcher: DispatcherConfig,
    pub scheme: SchemeConfig,
    /// No `[llm]` section means `ask` is unavailable.
    pub llm: Option<LlmConfig>,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load `path`, or `semnet.toml` if it exists, or the defaults.
    ///
    /// A relative knowledge source is taken relative to the config file.
    pub fn load(path: Option<&Path>) -> Result<Self, SemnetError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let content = read_text_file(&path, MAX_CONFIG_FILE_SIZE)?;
        let mut config = Self::from_toml(&content)?;
        if let Some(dir) = path.parent()
            && let Some(source) = config.knowledge.source.as_mut()
            && source.is_relative()
        {
            *source = dir.join(&*source);
        }
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, SemnetError> {
        toml::from_str(content)
            .map_err(|e| SemnetError::SerializationError(format!("Invalid configuration: {}", e)))
    }

    /// Settings for the standard search operations.
    pub fn search_settings(&self) -> Result<SearchSettings, SemnetError> {
        let labels = SchemeLabels::for_code(&self.scheme.labels).ok_or_else(|| {
            SemnetError::InvalidArguments(format!(
                "unknown scheme label set {:?} (expected \"en\" or \"ru\")",
                self.scheme.labels
            ))
        })?;
        Ok(SearchSettings {
            language: self.scheme.language.clone(),
            labels,
        })
    }

    /// A knowledge base seeded from `[knowledge] source`, if any.
    pub fn load_knowledge(&self) -> Result<KnowledgeBase, SemnetError> {
        let kb = KnowledgeBase::empty()?;
        if let Some(source) = &self.knowledge.source {
            let content = read_text_file(source, MAX_SOURCE_FILE_SIZE)?;
            let report = KnowledgeSource::from_json(&content)?.load_into(&kb)?;
            tracing::info!(
                nodes = report.nodes,
                links = report.links,
                arcs = report.arcs,
                "Loaded knowledge source {}",
                source.display()
            );
        }
        Ok(kb)
    }

    /// A dispatcher over `kb` with the standard operations registered.
    ///
    /// The `[scheme] language` class must exist in `kb`.
    pub fn dispatcher(&self, kb: KnowledgeBase) -> Result<Dispatcher, SemnetError> {
        let settings = self.search_settings()?;
        if let Err(SemnetError::KeynodeNotFound(_)) = kb.keynode(&settings.language) {
            return Err(SemnetError::InvalidArguments(format!(
                "unknown scheme language {:?}: no such class in the knowledge base",
                settings.language
            )));
        }
        let registry = OperationRegistry::standard(settings)?;
        Ok(Dispatcher::new(kb, registry).with_timeout(Duration::from_millis(self.dispatcher.timeout_ms)))
    }

    /// The LLM client, if an `[llm]` section is present. It serves as both
    /// the intent router and the answer phraser.
    pub fn llm_router(&self) -> Result<Option<Arc<LlmIntentRouter>>, SemnetError> {
        self.llm
            .as_ref()
            .map(|llm| LlmIntentRouter::new(llm).map(Arc::new))
            .transpose()
    }
}

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Read a UTF-8 file after checking that it is a regular file within `max_size`.
pub fn read_text_file(path: &Path, max_size: u64) -> Result<String, SemnetError> {
    let canonical = path.canonicalize().map_err(|e| {
        SemnetError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SemnetError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| SemnetError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(SemnetError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    std::fs::read_to_string(&canonical)
        .map_err(|e| SemnetError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.dispatcher.timeout_ms, DEFAULT_ACTION_TIMEOUT_MS);
        assert_eq!(config.scheme.language, "lang_ru");
        assert!(config.llm.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [dispatcher]
            timeout_ms = 250

            [scheme]
            labels = "ru"

            [llm]
            endpoint = "http://localhost:9999/v1"
            model = "test"
            "#,
        )
        .expect("parse");

        assert_eq!(config.dispatcher.timeout_ms, 250);
        assert_eq!(config.scheme.language, "lang_ru");
        let llm = config.llm.as_ref().expect("llm");
        assert_eq!(llm.timeout_secs, 30);
        assert!(llm.api_key_env.is_none());
        assert!(config.llm_router().expect("router").is_some());
        assert_eq!(
            config.search_settings().expect("settings").labels,
            SchemeLabels::russian()
        );
    }

    #[test]
    fn unknown_label_set_is_rejected() {
        let config = AppConfig::from_toml("[scheme]\nlabels = \"fr\"").expect("parse");
        assert!(matches!(
            config.search_settings(),
            Err(SemnetError::InvalidArguments(_))
        ));
    }

    #[test]
    fn unknown_language_is_rejected_by_the_dispatcher() {
        let config = AppConfig::from_toml("[scheme]\nlanguage = \"lang_de\"").expect("parse");
        let kb = config.load_knowledge().expect("knowledge");
        assert!(matches!(
            config.dispatcher(kb),
            Err(SemnetError::InvalidArguments(message)) if message.contains("lang_de")
        ));

        let kb = AppConfig::default().load_knowledge().expect("knowledge");
        assert!(AppConfig::default().dispatcher(kb).is_ok());
    }

    #[test]
    fn malformed_toml_is_a_serialization_error() {
        assert!(matches!(
            AppConfig::from_toml("[dispatcher\ntimeout_ms = 1"),
            Err(SemnetError::SerializationError(_))
        ));
    }

    #[test]
    fn source_is_relative_to_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("kb.json"),
            r#"{"nodes": [{"id": "дерево", "names": {"lang_ru": "Дерево"}}]}"#,
        )
        .expect("write source");
        let config_path = dir.path().join("semnet.toml");
        let mut file = std::fs::File::create(&config_path).expect("create");
        writeln!(file, "[knowledge]\nsource = \"kb.json\"").expect("write config");

        let config = AppConfig::load(Some(&config_path)).expect("load");
        assert_eq!(config.knowledge.source, Some(dir.path().join("kb.json")));

        let kb = config.load_knowledge().expect("knowledge");
        assert!(kb.keynode("дерево").is_ok());
    }

    #[test]
    fn demo_config_loads_the_kitchen() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/semnet.toml");
        let config = AppConfig::load(Some(&path)).expect("load");
        assert!(config.llm.is_none());

        let kb = config.load_knowledge().expect("knowledge");
        assert!(kb.keynode("borscht_recipe").is_ok());
        let dispatcher = config.dispatcher(kb).expect("dispatcher");
        assert_eq!(dispatcher.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn missing_explicit_config_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            AppConfig::load(Some(&dir.path().join("absent.toml"))),
            Err(SemnetError::IoError(_))
        ));
    }
}
