use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;

use log::warn;

use crate::common::CameraId;
use crate::error::{Error, Result};
use crate::policy::TemperaturePolicy;



#[derive(Clone)]
#[derive(Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub backend: BackendConfig,
	pub policy: TemperaturePolicy,
	pub telemetry: TelemetryConfig,
	/// Cameras whose capture session starts at launch.
	pub cameras: Vec<CameraId>,
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
	pub base_url: String,
	pub timeout_secs: u64,
	/// Sends `ngrok-skip-browser-warning` so tunnels don't answer with their interstitial page.
	pub skip_browser_warning: bool,
	pub username: Option<String>,
	pub password: Option<String>,
}

impl Default for BackendConfig {
	fn default() -> Self {
		BackendConfig {
			base_url: "http://localhost:5001".to_string(),
			timeout_secs: 10,
			skip_browser_warning: true,
			username: None,
			password: None,
		}
	}
}

impl BackendConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}

	pub fn credentials(&self) -> Option<(&str, &str)> {
		match (&self.username, &self.password) {
			(Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
			_ => None,
		}
	}
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
	pub enabled: bool,
	pub poll_interval_ms: u64,
}

impl Default for TelemetryConfig {
	fn default() -> Self {
		TelemetryConfig {
			enabled: true,
			poll_interval_ms: 5_000,
		}
	}
}

impl TelemetryConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

impl Config {
	pub fn validate(&self) -> Result<()> {
		url::Url::parse(&self.backend.base_url)?;
		if self.backend.timeout_secs == 0 {
			return Err(Error::Config("backend timeout must be non-zero".to_string()));
		}
		if self.telemetry.enabled && self.telemetry.poll_interval_ms == 0 {
			return Err(Error::Config("telemetry poll interval must be non-zero".to_string()));
		}
		self.policy.validate()
	}
}

/// Reads and validates a YAML config file.
///
/// A missing file yields the defaults. Any other open failure, or a file that doesn't
/// parse or validate, is an error.
pub fn read_config_file(path: &Path) -> Result<Config> {
	let config = match File::open(path) {
		Ok(file) => {
			let buf_reader = BufReader::new(file);
			serde_yaml::from_reader(buf_reader)?
		},
		Err(err) if err.kind() == ErrorKind::NotFound => {
			warn!("Config file {} not found; using defaults", path.display());
			Config::default()
		},
		Err(err) => return Err(err.into()),
	};
	config.validate()?;
	Ok(config)
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_yaml_keeps_defaults() {
		let config: Config = serde_yaml::from_str("
backend:
  base_url: http://backend.local:5001
cameras: [1, 3]
policy:
  hot_threshold: 28.0
").unwrap();
		config.validate().unwrap();
		assert_eq!(config.backend.base_url, "http://backend.local:5001");
		assert_eq!(config.backend.timeout_secs, 10);
		assert!(config.backend.skip_browser_warning);
		assert_eq!(config.cameras, vec![1, 3]);
		assert_eq!(config.policy.hot_threshold, 28.0);
		assert_eq!(config.policy.hot_retry_ms, 3_000);
		assert!(config.telemetry.enabled);
	}

	#[test]
	fn invalid_base_url_is_rejected() {
		let config: Config = serde_yaml::from_str("backend:\n  base_url: not a url\n").unwrap();
		assert!(matches!(config.validate(), Err(Error::Url(_))));
	}

	#[test]
	fn credentials_need_both_fields() {
		let mut backend = BackendConfig::default();
		backend.username = Some("admin".to_string());
		assert!(backend.credentials().is_none());
		backend.password = Some("secret".to_string());
		assert_eq!(backend.credentials(), Some(("admin", "secret")));
	}

	#[test]
	fn unreadable_path_is_an_io_error() {
		let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml/capture-poller.yaml"));
		assert!(matches!(read_config_file(path), Err(Error::Io(_))));
	}

	#[test]
	fn missing_file_falls_back_to_defaults() {
		let config = read_config_file(Path::new("/nonexistent/capture-poller.yaml")).unwrap();
		assert_eq!(config.policy, TemperaturePolicy::default());
		assert!(config.cameras.is_empty());
	}
}
