// Application configuration, loaded from a YAML file

use std::io;
use std::net::SocketAddr;
use std::path::Path;

use graphql_validity::ValidityOptions;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file: {0}")]
	IoError(#[from] io::Error),

	#[error("failed to parse config file: {0}")]
	ParseError(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppConfig {
	#[serde(default = "default_listen")]
	pub listen: SocketAddr,
	#[serde(default)]
	pub validity: ValidityOptions,
}

fn default_listen() -> SocketAddr {
	SocketAddr::from(([127, 0, 0, 1], 4000))
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			listen: default_listen(),
			validity: ValidityOptions::default(),
		}
	}
}

impl AppConfig {
	/// Read the config at `path`; a missing file yields the defaults.
	pub async fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = match fs_err::tokio::read_to_string(path).await {
			Ok(content) => content,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				info!(target: "validity", path = %path.display(), "config file not found, using defaults");
				return Ok(Self::default());
			},
			Err(e) => return Err(e.into()),
		};
		Self::parse(&content)
	}

	pub fn parse(content: &str) -> Result<Self, ConfigError> {
		if content.trim().is_empty() {
			return Ok(Self::default());
		}
		Ok(serde_yaml::from_str(content)?)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn test_parse_full_config() {
		let config = AppConfig::parse(
			r#"
listen: 0.0.0.0:8080
validity:
  wrapErrors: true
  enableProfiling: true
  profilingDebounceMs: 50
"#,
		)
		.unwrap();

		assert_eq!(config.listen, "0.0.0.0:8080".parse().unwrap());
		assert!(config.validity.wrap_errors);
		assert!(config.validity.enable_profiling);
		assert_eq!(config.validity.profiling_debounce_ms, 50);
	}

	#[test]
	fn test_defaults_fill_missing_fields() {
		let config = AppConfig::parse("validity:\n  wrapErrors: true\n").unwrap();

		assert_eq!(config.listen, default_listen());
		assert_eq!(config.validity.profiling_debounce_ms, 10);
		assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
	}

	#[test]
	fn test_unknown_fields_rejected() {
		let err = AppConfig::parse("validity:\n  wrapErorrs: true\n").unwrap_err();
		assert!(matches!(err, ConfigError::ParseError(_)));
	}

	#[tokio::test]
	async fn test_load_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "listen: 127.0.0.1:9000").unwrap();

		let config = AppConfig::load(file.path()).await.unwrap();
		assert_eq!(config.listen.port(), 9000);
	}

	#[tokio::test]
	async fn test_missing_file_uses_defaults() {
		let dir = tempfile::tempdir().unwrap();

		let config = AppConfig::load(&dir.path().join("absent.yaml")).await.unwrap();
		assert_eq!(config, AppConfig::default());
	}
}
