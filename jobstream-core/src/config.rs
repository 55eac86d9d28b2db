use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::error::{CoreResult, JobStreamError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerCfg {
    /// Scheme, host and optional prefix of the API, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Name of the environment variable that contains the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "JOBSTREAM_TOKEN".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JobsCfg {
    #[serde(default = "default_training_path")]
    pub training_path: String,
    #[serde(default = "default_download_path")]
    pub download_path: String,
}

impl Default for JobsCfg {
    fn default() -> Self {
        Self {
            training_path: default_training_path(),
            download_path: default_download_path(),
        }
    }
}

fn default_training_path() -> String {
    "/api/training/stream".to_string()
}
fn default_download_path() -> String {
    "/api/datasets/download/stream".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpCfg {
    /// TCP connect timeout in milliseconds (default 5000ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Longest wait for the next body chunk. None = wait forever.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
    /// Optional per-host idle connection pool cap (None = reqwest default)
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: None,
            pool_max_idle_per_host: None,
        }
    }
}

impl HttpCfg {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerCfg,
    #[serde(default)]
    pub jobs: JobsCfg,
    /// HTTP client configuration (timeouts, pooling). Missing → defaults.
    #[serde(default)]
    pub http: HttpCfg,
}

impl Config {
    /// Defaults for everything but the server address.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            server: ServerCfg {
                base_url: base_url.into(),
                token_env: default_token_env(),
            },
            jobs: JobsCfg::default(),
            http: HttpCfg::default(),
        }
    }

    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(JobStreamError::from)?;
        let s = std::str::from_utf8(&bytes).map_err(|e| JobStreamError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str::<Self>(s).map_err(|e| JobStreamError::Other(e.into()))?
            }
            Some("toml") => {
                toml::from_str::<Self>(s).map_err(|e| JobStreamError::Other(e.into()))?
            }
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| JobStreamError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s).map_err(|e| JobStreamError::Other(e.into()))
                })?,
        };
        Ok(cfg)
    }

    /// Read the bearer token from the environment variable named by `server.token_env`.
    pub fn token(&self) -> CoreResult<SecretString> {
        match std::env::var(&self.server.token_env) {
            Ok(v) if !v.trim().is_empty() => Ok(SecretString::new(v.into())),
            _ => Err(JobStreamError::Config(format!(
                "bearer token variable {} is not set",
                self.server.token_env
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_from_json() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("jobs.json");
        let json = r#"{
          "server": {"base_url":"https://api.example.com","token_env":"API_TOKEN"},
          "jobs": {"training_path":"/v2/train/stream"},
          "http": {"read_timeout_ms": 30000}
        }"#;
        fs::write(&file, json).unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg.server.base_url, "https://api.example.com");
        assert_eq!(cfg.server.token_env, "API_TOKEN");
        assert_eq!(cfg.jobs.training_path, "/v2/train/stream");
        assert_eq!(cfg.jobs.download_path, "/api/datasets/download/stream");
        assert_eq!(cfg.http.connect_timeout_ms, 5_000);
        assert_eq!(cfg.http.read_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.http.pool_max_idle_per_host, None);
    }

    #[test]
    fn load_from_toml() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("jobs.toml");
        let toml = r#"
[server]
base_url = "http://localhost:8000"

[http]
connect_timeout_ms = 1000
pool_max_idle_per_host = 2
"#;
        fs::write(&file, toml).unwrap();
        let cfg = Config::from_path(&file).unwrap();
        assert_eq!(cfg.server.token_env, "JOBSTREAM_TOKEN");
        assert_eq!(cfg.jobs, JobsCfg::default());
        assert_eq!(cfg.http.connect_timeout_ms, 1_000);
        assert_eq!(cfg.http.read_timeout(), None);
        assert_eq!(cfg.http.pool_max_idle_per_host, Some(2));
    }

    #[test]
    fn missing_file_returns_io_error() {
        let missing = std::path::PathBuf::from("/definitely/not/here/jobstream-missing.json");
        let err = Config::from_path(&missing).unwrap_err();
        match err {
            JobStreamError::Io(_) => {}
            other => panic!("expected Io error, got: {:?}", other),
        }
    }

    #[test]
    fn bad_utf8_returns_other_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.bin");
        fs::write(&file, vec![0xff, 0xfe, 0xfd, 0x00, 0x80]).unwrap();
        let err = Config::from_path(&file).unwrap_err();
        assert!(matches!(err, JobStreamError::Other(_)));
    }

    #[test]
    fn unknown_extension_falls_back_to_json_then_toml() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("a.conf");
        fs::write(&json_path, r#"{"server":{"base_url":"http://a"}}"#).unwrap();
        assert_eq!(Config::from_path(&json_path).unwrap().server.base_url, "http://a");

        let toml_path = dir.path().join("b.conf");
        fs::write(&toml_path, "[server]\nbase_url = \"http://b\"\n").unwrap();
        assert_eq!(Config::from_path(&toml_path).unwrap().server.base_url, "http://b");
    }

    #[test]
    fn unset_token_variable_is_config_error() {
        let mut cfg = Config::with_base_url("http://a");
        cfg.server.token_env = "JOBSTREAM_TEST_SURELY_UNSET_7f3a".into();
        match cfg.token() {
            Err(JobStreamError::Config(msg)) => assert!(msg.contains("JOBSTREAM_TEST_SURELY_UNSET_7f3a")),
            Err(other) => panic!("expected Config error, got: {:?}", other),
            Ok(_) => panic!("expected Config error, got a token"),
        }
    }
}
