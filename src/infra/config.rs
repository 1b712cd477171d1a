// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub combinations: CombinationsConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

/// `[engine]` — iteration loop bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_iterations: u8,
    pub quality_threshold: f32,
    pub max_parallel_tools: usize,
    pub tool_timeout_seconds: u64,
    /// Optional wall-clock budget for a whole run, checked between
    /// iterations. `None` means unbounded.
    pub run_budget_seconds: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            quality_threshold: 7.0,
            max_parallel_tools: 3,
            tool_timeout_seconds: 30,
            run_budget_seconds: None,
        }
    }
}

/// `[models]` — per-role model overrides. `None` uses the provider default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub classifier: Option<String>,
    pub synthesizer: Option<String>,
    pub assessor: Option<String>,
}

/// `[provider]` — the OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub max_retries: u32,
    pub request_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            max_retries: 2,
            request_timeout_seconds: 60,
        }
    }
}

/// `[retrieval]` — the external vector-search service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8900".into(),
            request_timeout_seconds: 30,
        }
    }
}

/// `[combinations]` — named multi-tool escalation sets. Each value is an
/// ordered list of tool ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationsConfig {
    pub safety_and_penalties: Vec<String>,
    pub comprehensive_analysis: Vec<String>,
    pub comparison_analysis: Vec<String>,
}

impl Default for CombinationsConfig {
    fn default() -> Self {
        Self {
            safety_and_penalties: vec!["regulation_search".into(), "penalty_lookup".into()],
            comprehensive_analysis: vec!["regulation_search".into(), "regulation_summary".into()],
            comparison_analysis: vec!["regulation_comparison".into(), "regulation_summary".into()],
        }
    }
}

/// `[api]` — HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub listen: String,
    /// Bearer token required on every request when set.
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8780".into(),
            auth_token: None,
        }
    }
}

impl Config {
    /// Load the user config, or pure defaults when no file exists.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read {}: {e}", path.display()))?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let c = Config::default();
        assert_eq!(c.engine.max_iterations, 3);
        assert!((c.engine.quality_threshold - 7.0).abs() < 0.001);
        assert_eq!(c.engine.max_parallel_tools, 3);
        assert_eq!(c.engine.tool_timeout_seconds, 30);
        assert!(c.engine.run_budget_seconds.is_none());
        assert!(c.api.auth_token.is_none());
    }

    #[test]
    fn test_combination_defaults() {
        let c = CombinationsConfig::default();
        assert_eq!(
            c.safety_and_penalties,
            vec!["regulation_search", "penalty_lookup"]
        );
        assert_eq!(
            c.comprehensive_analysis,
            vec!["regulation_search", "regulation_summary"]
        );
        assert_eq!(
            c.comparison_analysis,
            vec!["regulation_comparison", "regulation_summary"]
        );
    }

    #[test]
    fn test_models_default_unset() {
        let m = ModelsConfig::default();
        assert!(m.classifier.is_none());
        assert!(m.synthesizer.is_none());
        assert!(m.assessor.is_none());
    }

    #[test]
    fn test_empty_toml_keeps_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.max_iterations, 3);
        assert_eq!(config.provider.model, "gpt-4o-mini");
    }

    #[test]
    fn test_full_toml_overrides_every_section() {
        let toml_str = r#"
[engine]
max_iterations = 5
quality_threshold = 8.5
max_parallel_tools = 2
tool_timeout_seconds = 10
run_budget_seconds = 120

[models]
classifier = "gpt-4o-mini"
assessor = "gpt-4o"

[provider]
base_url = "http://localhost:11434/v1"
model = "llama3.1"
api_key_env = "LOCAL_KEY"
max_retries = 0
request_timeout_seconds = 90

[retrieval]
base_url = "http://retrieval.internal:9000"
request_timeout_seconds = 5

[combinations]
safety_and_penalties = ["penalty_lookup"]
comprehensive_analysis = ["regulation_search", "regulation_summary"]
comparison_analysis = ["regulation_comparison"]

[api]
listen = "0.0.0.0:9100"
auth_token = "secret"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.max_iterations, 5);
        assert!((config.engine.quality_threshold - 8.5).abs() < 0.001);
        assert_eq!(config.engine.run_budget_seconds, Some(120));
        assert_eq!(config.models.classifier, Some("gpt-4o-mini".into()));
        assert!(config.models.synthesizer.is_none());
        assert_eq!(config.provider.base_url, "http://localhost:11434/v1");
        assert_eq!(config.provider.max_retries, 0);
        assert_eq!(config.retrieval.base_url, "http://retrieval.internal:9000");
        assert_eq!(config.combinations.safety_and_penalties, vec!["penalty_lookup"]);
        assert_eq!(config.api.listen, "0.0.0.0:9100");
        assert_eq!(config.api.auth_token, Some("secret".into()));
    }

    #[test]
    fn test_defaults_roundtrip_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.engine.max_iterations,
            config.engine.max_iterations
        );
        assert_eq!(
            deserialized.combinations.safety_and_penalties,
            config.combinations.safety_and_penalties
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }
}
