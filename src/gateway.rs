//! Read-only access to the dashboard backend.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::access::SessionUser;
use crate::common::{CameraId, CameraRecord, PhotoEntry, SensorReading};
use crate::config::BackendConfig;
use crate::error::{Error, Result};



#[rocket::async_trait]
pub trait BackendGateway: Send + Sync {
	/// Most recent photo for the camera, if the backend has one.
	async fn latest_photo(&self, camera_id: CameraId) -> Result<Option<PhotoEntry>>;

	async fn list_cameras(&self) -> Result<Vec<CameraRecord>>;

	/// Sensor readings for the camera, oldest first.
	async fn sensor_readings(&self, camera_id: CameraId) -> Result<Vec<SensorReading>>;
}

/// Live-stream url for a registered camera address.
pub fn stream_url(address: &str) -> String {
	let address = address.trim();
	let base = if address.contains("://") {
		address.to_string()
	} else {
		format!("http://{}", address)
	};
	format!("{}/stream", base.trim_end_matches('/'))
}

#[derive(Deserialize)]
struct LoginResponse {
	user: SessionUser,
}

pub struct HttpGateway {
	client: Client,
	base_url: Url,
}

impl HttpGateway {
	pub fn new(config: &BackendConfig) -> Result<Self> {
		let mut headers = HeaderMap::new();
		if config.skip_browser_warning {
			headers.insert("ngrok-skip-browser-warning", HeaderValue::from_static("true"));
		}
		let client = Client::builder()
			.cookie_store(true)
			.default_headers(headers)
			.timeout(config.timeout())
			.connect_timeout(Duration::from_secs(5))
			.build()?;
		Ok(HttpGateway {
			client,
			base_url: Url::parse(&config.base_url)?,
		})
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		Ok(self.base_url.join(path)?)
	}

	/// Logs in; the session cookie is kept by the client for later calls.
	pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser> {
		let response = self.client
			.post(self.endpoint("/api/login")?)
			.json(&serde_json::json!({ "username": username, "password": password }))
			.send()
			.await?;
		if response.status() == StatusCode::UNAUTHORIZED {
			return Err(Error::Unauthorized(format!("backend rejected credentials for {}", username)));
		}
		let body: LoginResponse = response.error_for_status()?.json().await?;
		Ok(body.user)
	}
}

#[rocket::async_trait]
impl BackendGateway for HttpGateway {
	async fn latest_photo(&self, camera_id: CameraId) -> Result<Option<PhotoEntry>> {
		let response = self.client
			.get(self.endpoint("/api/photos")?)
			.query(&[("camera_id", camera_id)])
			.send()
			.await?;
		let status = response.status();
		let photos: Vec<PhotoEntry> = if status.is_success() {
			response.json().await?
		} else {
			// Failures still carry a placeholder image whose url names the cause.
			let placeholder = response.json::<Vec<PhotoEntry>>().await.ok()
				.and_then(|photos| photos.into_iter().next())
				.and_then(|photo| photo.url)
				.unwrap_or_default();
			return Err(Error::Backend(format!("photos answered {} {}", status, placeholder)));
		};
		Ok(photos.into_iter().next())
	}

	async fn list_cameras(&self) -> Result<Vec<CameraRecord>> {
		let cameras = self.client
			.get(self.endpoint("/api/cameras")?)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		Ok(cameras)
	}

	async fn sensor_readings(&self, camera_id: CameraId) -> Result<Vec<SensorReading>> {
		let readings = self.client
			.get(self.endpoint("/api/data")?)
			.query(&[("camera_id", camera_id)])
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		Ok(readings)
	}
}
