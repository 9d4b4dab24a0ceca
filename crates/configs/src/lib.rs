use anyhow::{Context, Result};
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4), log_format: default_log_format() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(anyhow!("unknown store backend `{other}` (expected memory or file)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Data file for the `file` backend.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    #[serde(default = "default_max_cas_attempts")]
    pub max_cas_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            op_timeout_ms: default_op_timeout_ms(),
            max_cas_attempts: default_max_cas_attempts(),
        }
    }
}

/// Keys accepted by the capability check on mutating routes; empty disables the check.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_log_format() -> String { "compact".into() }
fn default_op_timeout_ms() -> u64 { 2000 }
fn default_max_cas_attempts() -> u32 { 3 }

pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content).with_context(|| format!("invalid config file {path}"))?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to environment variables
    /// when the file is missing, then normalize and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = Self::load_or_env(&config_path())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// 仅在文件不存在时回退到环境变量；解析或读取失败直接报错
    pub fn load_or_env(path: &str) -> Result<Self> {
        match std::fs::metadata(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::from_env()),
            _ => load_from_file(path),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup; unset or unparsable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(host) = lookup("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            cfg.server.log_format = format;
        }
        if let Some(backend) = lookup("STORE_BACKEND").and_then(|b| b.parse().ok()) {
            cfg.store.backend = backend;
        }
        if let Some(path) = lookup("STORE_PATH") {
            cfg.store.path = Some(path);
        }
        if let Some(ms) = lookup("STORE_OP_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.store.op_timeout_ms = ms;
        }
        if let Some(n) = lookup("STORE_MAX_CAS_ATTEMPTS").and_then(|v| v.parse::<u32>().ok()) {
            cfg.store.max_cas_attempts = n;
        }
        if let Some(keys) = lookup("API_KEYS") {
            cfg.auth.api_keys = keys
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
        cfg
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 归一化 server
        self.server.normalize()?;
        // 校验 store（file 后端必须提供路径）
        self.store.validate()?;
        // 去除空白的 API key
        self.auth.normalize();
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_cas_attempts == 0 {
            return Err(anyhow!("store.max_cas_attempts must be >= 1"));
        }
        if self.op_timeout_ms == 0 {
            return Err(anyhow!("store.op_timeout_ms must be a positive number of milliseconds"));
        }
        if self.backend == StoreBackend::File
            && self.path.as_deref().map(str::trim).unwrap_or_default().is_empty()
        {
            return Err(anyhow!("store.path is required for the file backend (or set STORE_PATH)"));
        }
        Ok(())
    }

    pub fn op_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.op_timeout_ms)
    }
}

impl AuthConfig {
    fn normalize(&mut self) {
        self.api_keys.retain(|k| !k.trim().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_full_toml() -> Result<()> {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            log_format = "json"

            [store]
            backend = "file"
            path = "data/objects.json"
            op_timeout_ms = 500
            max_cas_attempts = 5

            [auth]
            api_keys = ["k1", "k2"]
            "#,
        )?;
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.log_format, "json");
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.store.path.as_deref(), Some("data/objects.json"));
        assert_eq!(cfg.store.max_cas_attempts, 5);
        assert_eq!(cfg.auth.api_keys.len(), 2);
        Ok(())
    }

    #[test]
    fn store_defaults_apply() -> Result<()> {
        let cfg: AppConfig = toml::from_str("[server]\nhost = \"127.0.0.1\"\nport = 8080\n")?;
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.max_cas_attempts, 3);
        assert_eq!(cfg.store.op_timeout_ms, 2000);
        assert!(cfg.auth.api_keys.is_empty());
        Ok(())
    }

    #[test]
    fn from_lookup_reads_env_style_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SERVER_PORT", "8181"),
            ("STORE_BACKEND", "file"),
            ("STORE_PATH", "/tmp/objects.json"),
            ("STORE_MAX_CAS_ATTEMPTS", "7"),
            ("API_KEYS", "a, b,,"),
        ]);
        let cfg = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.server.port, 8181);
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.store.max_cas_attempts, 7);
        assert_eq!(cfg.auth.api_keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn validation_rejects_bad_store_settings() {
        let mut cfg = AppConfig::default();
        cfg.store.max_cas_attempts = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.store.backend = StoreBackend::File;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn normalize_fills_host_and_threads() -> Result<()> {
        let mut cfg = AppConfig::default();
        cfg.server.host = "  ".into();
        cfg.server.worker_threads = Some(0);
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.worker_threads, Some(4));
        Ok(())
    }

    #[test]
    fn load_from_missing_file_errors() {
        let path = std::env::temp_dir().join(format!("missing_{}.toml", uuid::Uuid::new_v4()));
        assert!(load_from_file(path.to_str().unwrap()).is_err());
    }

    fn temp_toml(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("config_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn malformed_file_is_an_error_not_a_fallback() {
        let path = temp_toml("[store]\nbackend = \"file\"\npath = \"data/objects.json\"\nmax_cas_attempts = \"three\"\n");
        let err = AppConfig::load_or_env(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn existing_file_wins_over_env() -> Result<()> {
        let path = temp_toml("[server]\nhost = \"0.0.0.0\"\nport = 9100\n\n[store]\nbackend = \"file\"\npath = \"data/objects.json\"\n");
        let cfg = AppConfig::load_or_env(path.to_str().unwrap())?;
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.store.backend, StoreBackend::File);
        let _ = std::fs::remove_file(&path);
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_env() -> Result<()> {
        let path = std::env::temp_dir().join(format!("missing_{}.toml", uuid::Uuid::new_v4()));
        let cfg = AppConfig::load_or_env(path.to_str().unwrap())?;
        assert!(cfg.server.port > 0);
        Ok(())
    }
}
