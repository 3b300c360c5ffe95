use crate::{
    enrichment::BucketStrategy,
    period::PeriodMode,
    types::{ARCHIVE_SUFFIX, LOOKUP_CAP, SENTINEL_NAME},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Heuristic layout expectations for the archive root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Year-named directory that must sit directly under the root.
    pub year_dir: String,
    /// Path segments below `year_dir` that must exist, e.g. `["08", "28"]`.
    pub sample_subpath: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            year_dir: "2019".into(),
            sample_subpath: vec!["08".into(), "28".into()],
        }
    }
}

impl LayoutConfig {
    pub fn sample_path(&self, root: &Path) -> PathBuf {
        let mut path = root.join(&self.year_dir);
        for segment in &self.sample_subpath {
            path.push(segment);
        }
        path
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub layout: LayoutConfig,
    pub archive_suffix: String,
    pub period_mode: PeriodMode,
    /// Delete an existing output database before merging.
    pub truncate: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            archive_suffix: ARCHIVE_SUFFIX.into(),
            period_mode: PeriodMode::FirstRow,
            truncate: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub sentinel_name: String,
    /// Most ids the directory accepts in one call.
    pub lookup_cap: usize,
    /// Unresolved creators loaded per enrichment step.
    pub step_size: usize,
    pub bucket_strategy: BucketStrategy,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            sentinel_name: SENTINEL_NAME.into(),
            lookup_cap: LOOKUP_CAP,
            step_size: 500_000,
            bucket_strategy: BucketStrategy::RoundRobin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub token_url: String,
    #[serde(skip_serializing)]
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    #[serde(skip_serializing)]
    pub oauth_token: Option<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitch.tv/helix".into(),
            token_url: "https://id.twitch.tv/oauth2/token".into(),
            client_id: None,
            client_secret: None,
            oauth_token: None,
        }
    }
}

impl DirectoryConfig {
    pub const CLIENT_ID_VAR: &'static str = "TWITCH_CLIENT_ID";
    pub const OAUTH_TOKEN_VAR: &'static str = "TWITCH_OAUTH_TOKEN";
    pub const CLIENT_SECRET_VAR: &'static str = "TWITCH_CLIENT_SECRET";

    /// Overlay credentials from the environment. Values already set in the
    /// config file win.
    pub fn with_env_credentials(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        self.client_id = self.client_id.or_else(|| var(Self::CLIENT_ID_VAR));
        self.oauth_token = self.oauth_token.or_else(|| var(Self::OAUTH_TOKEN_VAR));
        self.client_secret = self.client_secret.or_else(|| var(Self::CLIENT_SECRET_VAR));
        self
    }

    /// A client id plus a token or a secret to mint one.
    pub fn ensure_credentials(&self) -> anyhow::Result<()> {
        if self.client_id.is_none() {
            anyhow::bail!("{} is not set", Self::CLIENT_ID_VAR);
        }
        if self.oauth_token.is_none() && self.client_secret.is_none() {
            anyhow::bail!(
                "neither {} nor {} is set",
                Self::OAUTH_TOKEN_VAR,
                Self::CLIENT_SECRET_VAR
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub merge: MergeConfig,
    pub enrichment: EnrichmentConfig,
    pub directory: DirectoryConfig,
}

impl PipelineConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        if config.enrichment.lookup_cap == 0 || config.enrichment.step_size == 0 {
            anyhow::bail!("{path}: lookup_cap and step_size must be positive");
        }
        Ok(config)
    }

    /// Small steps and a tiny lookup cap so batching is observable in tests.
    pub fn default_test() -> Self {
        Self {
            merge: MergeConfig::default(),
            enrichment: EnrichmentConfig {
                sentinel_name: SENTINEL_NAME.into(),
                lookup_cap: 3,
                step_size: 10,
                bucket_strategy: BucketStrategy::RoundRobin,
            },
            directory: DirectoryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "enrichment": { "step_size": 42, "bucket_strategy": "tiled" } }"#)
                .unwrap();
        assert_eq!(config.enrichment.step_size, 42);
        assert_eq!(config.enrichment.lookup_cap, LOOKUP_CAP);
        assert_eq!(config.enrichment.bucket_strategy, BucketStrategy::Tiled);
        assert_eq!(config.merge.layout.year_dir, "2019");
        assert_eq!(config.merge.period_mode, PeriodMode::FirstRow);
    }

    #[test]
    fn credentials_require_id_and_token_or_secret() {
        let mut directory = DirectoryConfig::default();
        assert!(directory.ensure_credentials().is_err());
        directory.client_id = Some("cid".into());
        assert!(directory.ensure_credentials().is_err());
        directory.client_secret = Some("secret".into());
        assert!(directory.ensure_credentials().is_ok());
    }
}
