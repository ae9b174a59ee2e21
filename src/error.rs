//! Error types shared by the gateway, configuration and service layers.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Invalid URL: {0}")]
	Url(#[from] url::ParseError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),

	#[error("Config error: {0}")]
	Config(String),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	/// Backend answered, but not with something usable.
	#[error("Backend error: {0}")]
	Backend(String),
}
