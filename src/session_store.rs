//! Per-camera capture state and photo history.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::common::{CameraId, CaptureState, PhotoRecord};



/// Temperature before and after a push.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct TempChange {
	pub previous: f64,
	pub current: f64,
}

pub struct SessionStore {
	states: RwLock<HashMap<CameraId, CaptureState>>,
	photos: RwLock<HashMap<CameraId, Vec<PhotoRecord>>>,
	default_temp: f64,
}

impl SessionStore {
	pub fn new(default_temp: f64) -> Self {
		SessionStore {
			states: RwLock::new(HashMap::new()),
			photos: RwLock::new(HashMap::new()),
			default_temp,
		}
	}

	/// Creates empty state and history for the camera. A temperature pushed before
	/// initialization is kept.
	pub async fn ensure_initialized(&self, camera_id: CameraId) {
		self.photos.write().await.entry(camera_id).or_default();
		self.states.write().await.entry(camera_id).or_default();
	}

	pub async fn get_photos(&self, camera_id: CameraId) -> Vec<PhotoRecord> {
		let photos = self.photos.read().await;
		photos.get(&camera_id).cloned().unwrap_or_default()
	}

	pub async fn clear_photos(&self, camera_id: CameraId) {
		if let Some(history) = self.photos.write().await.get_mut(&camera_id) {
			history.clear();
		}
	}

	pub async fn capture_state(&self, camera_id: CameraId) -> Option<CaptureState> {
		self.states.read().await.get(&camera_id).cloned()
	}

	pub async fn current_temp(&self, camera_id: CameraId) -> f64 {
		let states = self.states.read().await;
		states.get(&camera_id)
			.and_then(|state| state.current_temp)
			.unwrap_or(self.default_temp)
	}

	pub async fn set_current_temp(&self, camera_id: CameraId, temp: f64) -> TempChange {
		let mut states = self.states.write().await;
		let state = states.entry(camera_id).or_default();
		let previous = state.current_temp.unwrap_or(self.default_temp);
		state.current_temp = Some(temp);
		TempChange { previous, current: temp }
	}

	/// Records a fetched photo unless its url equals the stored one.
	///
	/// Returns whether a record was appended.
	pub async fn record_photo(&self, camera_id: CameraId, url: &str, timestamp: String) -> bool {
		let mut states = self.states.write().await;
		let state = states.entry(camera_id).or_default();
		if state.url.as_deref() == Some(url) {
			return false;
		}
		state.url = Some(url.to_string());
		state.last_timestamp = Some(timestamp.clone());

		let mut photos = self.photos.write().await;
		photos.entry(camera_id).or_default().push(PhotoRecord {
			url: url.to_string(),
			timestamp,
		});
		true
	}

	/// Stores a live-stream url. Returns whether it changed.
	pub async fn set_stream_url(&self, camera_id: CameraId, url: String) -> bool {
		let mut states = self.states.write().await;
		let state = states.entry(camera_id).or_default();
		if state.url.as_deref() == Some(url.as_str()) {
			return false;
		}
		state.url = Some(url);
		true
	}
}
