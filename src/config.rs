//! Configuração do rollcall carregada a partir de `rollcall.toml`.
//!
//! A struct [`RollcallConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `ANTHROPIC_API_KEY` e `ROLLCALL_WEBHOOK_URL`
//! têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "rollcall.toml";

/// Configuração de nível superior carregada de `rollcall.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RollcallConfig {
    /// Chave da API do serviço de texto. Vazia desativa extração e resumo.
    #[serde(default)]
    pub api_key: String,

    /// Modelo usado para extração de nomes e resumo da sessão.
    #[serde(default = "default_model")]
    pub model: String,

    /// URL do webhook que recebe o relatório final.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Arquivo JSON com os perfis de turma salvos.
    #[serde(default = "default_profiles_path")]
    pub profiles_path: PathBuf,

    /// Timeout em segundos para qualquer chamada externa.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Modelo padrão: o mais rápido, suficiente para extrair nomes.
fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_profiles_path() -> PathBuf {
    PathBuf::from("rollcall-profiles.json")
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for RollcallConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            webhook_url: None,
            profiles_path: default_profiles_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RollcallConfig {
    /// Carrega a configuração do caminho indicado, ou de `rollcall.toml`
    /// no diretório atual. Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("invalid config in {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    // Um webhook em branco no arquivo conta como ausente.
    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(contents)?;
        config.webhook_url = config.webhook_url.filter(|url| !url.trim().is_empty());
        Ok(config)
    }

    // Variáveis de ambiente não vazias substituem os valores do arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|v| !v.is_empty()) {
            self.api_key = key;
        }
        if let Some(url) = lookup("ROLLCALL_WEBHOOK_URL").filter(|v| !v.is_empty()) {
            self.webhook_url = Some(url);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = RollcallConfig::default();
        assert_eq!(config.model, "claude-haiku-4-5-20251001");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.profiles_path, PathBuf::from("rollcall-profiles.json"));
        assert!(config.webhook_url.is_none());
        assert!(!config.has_api_key());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            webhook_url = "https://hooks.example.com/attendance"
            request_timeout_secs = 5
        "#;
        let config: RollcallConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://hooks.example.com/attendance")
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.model, "claude-haiku-4-5-20251001");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: RollcallConfig = toml::from_str(r#"api_key = "from-file""#).unwrap();
        config.apply_env(|key| match key {
            "ANTHROPIC_API_KEY" => Some("from-env".into()),
            "ROLLCALL_WEBHOOK_URL" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api_key, "from-env");
        // Valores vazios são ignorados.
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "profiles_path = \"classes.json\"\n").unwrap();

        let config = RollcallConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.profiles_path, PathBuf::from("classes.json"));
    }

    #[test]
    fn blank_webhook_in_file_is_unset() {
        let config = RollcallConfig::parse("webhook_url = \"  \"\n").unwrap();
        assert!(config.webhook_url.is_none());

        let config = RollcallConfig::parse("webhook_url = \"https://h.test\"\n").unwrap();
        assert_eq!(config.webhook_url.as_deref(), Some("https://h.test"));
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"\n").unwrap();
        assert!(RollcallConfig::load(Some(path.as_path())).is_err());
    }
}
