use crate::jitter::{DEFAULT_JITTER_DEGREES, MAX_JITTER_DEGREES};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{bail, Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub layer: LayerConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub investors: PathBuf,
    pub fsa_overlay: Option<PathBuf>, // socioeconomic FSA clusters
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayerConfig {
    #[serde(default = "default_jitter")]
    pub jitter_degrees: f64,
    pub seed: Option<u64>,
    #[serde(default = "default_true")]
    pub live_counter: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            jitter_degrees: default_jitter(),
            seed: None,
            live_counter: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_priority_cluster")]
    pub priority_cluster: i64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            priority_cluster: default_priority_cluster(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_jitter() -> f64 {
    DEFAULT_JITTER_DEGREES
}

fn default_true() -> bool {
    true
}

fn default_priority_cluster() -> i64 {
    1
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let jitter = self.layer.jitter_degrees;
        if !jitter.is_finite() || !(0.0..=MAX_JITTER_DEGREES).contains(&jitter) {
            bail!(
                "layer.jitter_degrees must be between 0 and {} degrees, got {}",
                MAX_JITTER_DEGREES,
                jitter
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            investors = "data/investors.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.input.investors, PathBuf::from("data/investors.json"));
        assert!(config.input.fsa_overlay.is_none());
        assert_eq!(config.layer.jitter_degrees, DEFAULT_JITTER_DEGREES);
        assert!(config.layer.live_counter);
        assert_eq!(config.overlay.priority_cluster, 1);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn full_config_parses() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            investors = "investors_map.json"
            fsa_overlay = "data/ontario_socioeconomic_clusters_geo.json"

            [layer]
            jitter_degrees = 0.0005
            seed = 7
            live_counter = false

            [overlay]
            priority_cluster = 2

            [server]
            port = 3000
            static_dir = "web"
            "#,
        )
        .unwrap();
        assert_eq!(config.layer.seed, Some(7));
        assert!(!config.layer.live_counter);
        assert_eq!(config.overlay.priority_cluster, 2);
        assert_eq!(config.server.static_dir, PathBuf::from("web"));
    }

    #[test]
    fn rejects_unusable_jitter() {
        for bad in ["inf", "nan", "-0.001", "1e308"] {
            let toml = format!(
                "[input]\ninvestors = \"a.json\"\n[layer]\njitter_degrees = {}\n",
                bad
            );
            let err = AppConfig::from_toml(&toml).unwrap_err();
            assert!(err.to_string().contains("jitter_degrees"), "{}: {}", bad, err);
        }
        let ok = AppConfig::from_toml("[input]\ninvestors = \"a.json\"\n[layer]\njitter_degrees = 0.0\n");
        assert!(ok.is_ok());
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(AppConfig::from_toml("[server]\nport = 1").is_err());
    }
}
