use lectern_agent::{EmbeddingConfig, ModelConfig, RagConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct LecternConfig {
    pub model: ModelConfig,
    /// Collections persist here as JSONL; unset keeps everything in memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub frontend_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_dir: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl LecternConfig {
    /// Read and parse a config file. Relative paths inside it are resolved
    /// against the file's directory.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let mut config = Self::parse(&raw)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut config: Self =
            toml::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid config: {e}"))?;
        config.model = config.model.with_env_api_key();
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for dir in [
            &mut self.data_dir,
            &mut self.server.frontend_dir,
            &mut self.rag.docs_dir,
        ]
        .into_iter()
        .flatten()
        {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}
