use super::{ConverterConfig, EstimatorConfig, Settings};
use crate::error::RecastResult;
use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml, Yaml},
};
use std::path::Path;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Prefix of environment variable overrides, e.g. `RECAST_CONVERTER__POOL_SIZE`
pub const ENV_PREFIX: &str = "RECAST_";

/// Layered configuration source.
///
/// Priority, lowest first: embedded defaults, user config, repository
/// config, then environment variables. An explicit config file replaces the
/// user and repository layers.
pub struct RecastConfig {
    figment: Figment,
}

impl RecastConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        Ok(Self::build(custom_config.map(Path::new), ENV_PREFIX))
    }

    /// Defaults overlaid with a TOML document, without files or environment
    pub fn from_toml_str(toml: &str) -> Self {
        Self {
            figment: Figment::new()
                .merge(Toml::string(DEFAULT_CONFIG))
                .merge(Toml::string(toml)),
        }
    }

    pub(crate) fn build(custom_config: Option<&Path>, env_prefix: &str) -> Self {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        if let Some(custom_path) = custom_config {
            figment = match custom_path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            let user = Self::user_config_dir();
            figment = figment
                // User config - support multiple formats
                .merge(Toml::file(format!("{}/config.toml", user)))
                .merge(Json::file(format!("{}/config.json", user)))
                .merge(Yaml::file(format!("{}/config.yaml", user)))
                .merge(Yaml::file(format!("{}/config.yml", user)))
                // Repository config - support multiple formats
                .merge(Toml::file("recast.toml"))
                .merge(Json::file("recast.json"))
                .merge(Yaml::file("recast.yaml"))
                .merge(Yaml::file("recast.yml"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed(env_prefix).split("__"));

        RecastConfig { figment }
    }

    /// Transformer settings, validated
    pub fn converter(&self) -> RecastResult<ConverterConfig> {
        let converter: ConverterConfig = self.figment.extract_inner("converter")?;
        converter.validate()?;
        Ok(converter)
    }

    pub fn estimator(&self) -> RecastResult<EstimatorConfig> {
        Ok(self.figment.extract_inner("estimator")?)
    }

    /// Every section as typed settings, validated
    pub fn settings(&self) -> RecastResult<Settings> {
        let settings: Settings = self.figment.extract()?;
        settings.converter.validate()?;
        Ok(settings)
    }

    /// Get a nested object/section as JSON
    pub fn get_section(&self, path: &str) -> Result<serde_json::Value> {
        Ok(self.figment.extract_inner(path)?)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    fn user_config_dir() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/.config/recast", home),
            Err(_) => "~/.config/recast".to_string(),
        }
    }
}
