//! Adaptive photo-capture polling.
//!
//! Each camera with an active session runs a self-rescheduling tick loop. A tick reads
//! the camera's temperature and either refreshes the live-stream url (hot) or fetches
//! the latest photo, then arms a single pending timer for the next tick.
//!
//! A camera has at most one pending timer and at most one tick in flight. Every timer
//! is claimed under the session lock before its tick runs, so canceling a timer that
//! is still in `pending` always prevents its tick. `in_flight` stays set until the
//! running tick finishes, even across `stop`; a tick that finishes on a stopped session
//! doesn't reschedule, and a restart while it is still running adopts it instead of
//! starting a second one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use crate::common::{local_timestamp, CameraId, CaptureState, PhotoRecord};
use crate::gateway::{stream_url, BackendGateway};
use crate::policy::TemperaturePolicy;
use crate::session_store::SessionStore;



struct PendingTimer {
	id: u64,
	delay: Duration,
	handle: AbortHandle,
}

impl PendingTimer {
	fn cancel(self) {
		self.handle.abort();
	}
}

#[derive(Default)]
struct Session {
	active: bool,
	pending: Option<PendingTimer>,
	in_flight: bool,
	photo_fetch_failing: bool,
	photo_fetch_warnings: u64,
}

#[derive(Clone)]
#[derive(Debug, Default, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct SessionStatus {
	pub active: bool,
	pub scheduled: bool,
	pub in_flight: bool,
	pub pending_delay_ms: Option<u64>,
	pub photo_fetch_warnings: u64,
}

struct Inner {
	store: SessionStore,
	gateway: Arc<dyn BackendGateway>,
	policy: TemperaturePolicy,
	sessions: Mutex<HashMap<CameraId, Session>>,
	next_timer_id: AtomicU64,
}

#[derive(Clone)]
pub struct CaptureService {
	inner: Arc<Inner>,
}

impl CaptureService {
	pub fn new(gateway: Arc<dyn BackendGateway>, policy: TemperaturePolicy) -> Self {
		CaptureService {
			inner: Arc::new(Inner {
				store: SessionStore::new(policy.default_temp),
				gateway,
				policy,
				sessions: Mutex::new(HashMap::new()),
				next_timer_id: AtomicU64::new(1),
			}),
		}
	}

	/// Starts the capture loop for a camera. The first tick runs right away.
	pub async fn start(&self, camera_id: CameraId) {
		self.inner.store.ensure_initialized(camera_id).await;

		{
			let mut sessions = self.inner.sessions.lock().await;
			let session = sessions.entry(camera_id).or_default();
			if session.active {
				debug!("Capture for camera {} already running", camera_id);
				return;
			}
			session.active = true;
			session.photo_fetch_failing = false;
			if session.in_flight {
				info!("Background photo capture resumed for camera {}", camera_id);
				return;
			}
			session.in_flight = true;
		}

		tokio::spawn(Arc::clone(&self.inner).run_tick(camera_id));
		info!("Background photo capture started for camera {}", camera_id);
	}

	/// Stops the capture loop. A tick already waiting on the backend still applies its
	/// result but doesn't schedule another one; it stays reported as in flight until then.
	pub async fn stop(&self, camera_id: CameraId) {
		let mut sessions = self.inner.sessions.lock().await;
		let Some(session) = sessions.get_mut(&camera_id) else {
			return;
		};
		let was_active = session.active;
		session.stop();
		if was_active {
			info!("Background photo capture stopped for camera {}", camera_id);
		}
	}

	pub async fn stop_all(&self) {
		let mut sessions = self.inner.sessions.lock().await;
		for (camera_id, session) in sessions.iter_mut() {
			if session.active || session.pending.is_some() {
				session.stop();
				info!("Background photo capture stopped for camera {}", camera_id);
			}
		}
	}

	pub async fn get_photos(&self, camera_id: CameraId) -> Vec<PhotoRecord> {
		self.inner.store.get_photos(camera_id).await
	}

	pub async fn clear_photos(&self, camera_id: CameraId) {
		self.inner.store.clear_photos(camera_id).await
	}

	pub async fn capture_state(&self, camera_id: CameraId) -> Option<CaptureState> {
		self.inner.store.capture_state(camera_id).await
	}

	/// Records a temperature reading. Entering or leaving the hot regime while a timer
	/// is pending replaces that timer with an immediate tick.
	pub async fn push_temperature(&self, camera_id: CameraId, temp: f64) {
		let change = self.inner.store.set_current_temp(camera_id, temp).await;
		if !self.inner.policy.crosses_hot_threshold(change.previous, change.current) {
			return;
		}

		{
			let mut sessions = self.inner.sessions.lock().await;
			let Some(session) = sessions.get_mut(&camera_id) else {
				return;
			};
			let Some(timer) = session.pending.take() else {
				debug!("Camera {} crossed the hot threshold with no pending tick", camera_id);
				return;
			};
			timer.cancel();
			session.in_flight = true;
		}

		info!("Camera {} temperature {} -> {} crossed the hot threshold; ticking now", camera_id, change.previous, change.current);
		tokio::spawn(Arc::clone(&self.inner).run_tick(camera_id));
	}

	pub async fn status(&self, camera_id: CameraId) -> SessionStatus {
		let sessions = self.inner.sessions.lock().await;
		match sessions.get(&camera_id) {
			Some(session) => SessionStatus {
				active: session.active,
				scheduled: session.pending.is_some(),
				in_flight: session.in_flight,
				pending_delay_ms: session.pending.as_ref().map(|timer| timer.delay.as_millis() as u64),
				photo_fetch_warnings: session.photo_fetch_warnings,
			},
			None => SessionStatus::default(),
		}
	}

	pub async fn active_cameras(&self) -> Vec<CameraId> {
		let sessions = self.inner.sessions.lock().await;
		let mut ids: Vec<CameraId> = sessions.iter()
			.filter(|(_, session)| session.active)
			.map(|(id, _)| *id)
			.collect();
		ids.sort_unstable();
		ids
	}
}

impl Session {
	fn stop(&mut self) {
		if let Some(timer) = self.pending.take() {
			timer.cancel();
		}
		self.active = false;
	}
}

impl Inner {
	async fn run_tick(self: Arc<Self>, camera_id: CameraId) {
		let temp = self.store.current_temp(camera_id).await;

		let delay = if self.policy.is_hot(temp) {
			self.resolve_stream(camera_id).await;
			self.policy.hot_retry()
		} else {
			self.fetch_latest_photo(camera_id).await;
			self.policy.interval_for(temp)
		};

		self.reschedule(camera_id, delay).await;
	}

	async fn reschedule(self: &Arc<Self>, camera_id: CameraId, delay: Duration) {
		let mut sessions = self.sessions.lock().await;
		let Some(session) = sessions.get_mut(&camera_id) else {
			return;
		};
		session.in_flight = false;
		if !session.active {
			debug!("Camera {} was stopped during its tick; not rescheduling", camera_id);
			return;
		}
		if let Some(timer) = session.pending.take() {
			timer.cancel();
		}
		session.pending = Some(self.arm_timer(camera_id, delay));
		debug!("Next tick for camera {} in {:?}", camera_id, delay);
	}

	fn arm_timer(self: &Arc<Self>, camera_id: CameraId, delay: Duration) -> PendingTimer {
		let id = self.next_timer_id.fetch_add(1, Ordering::Relaxed);
		let inner = Arc::clone(self);
		let handle = tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			if inner.claim_timer(camera_id, id).await {
				inner.run_tick(camera_id).await;
			}
		});
		PendingTimer {
			id,
			delay,
			handle: handle.abort_handle(),
		}
	}

	/// Takes the timer out of `pending` if it is still the current one.
	async fn claim_timer(&self, camera_id: CameraId, timer_id: u64) -> bool {
		let mut sessions = self.sessions.lock().await;
		let Some(session) = sessions.get_mut(&camera_id) else {
			return false;
		};
		match &session.pending {
			Some(timer) if timer.id == timer_id => {
				session.pending = None;
				session.in_flight = true;
				true
			},
			_ => false,
		}
	}

	async fn fetch_latest_photo(&self, camera_id: CameraId) {
		match self.gateway.latest_photo(camera_id).await {
			Ok(photo) => {
				if let Some(url) = photo.and_then(|photo| photo.url) {
					if self.store.record_photo(camera_id, &url, local_timestamp()).await {
						debug!("Camera {} captured {}", camera_id, url);
					}
				}
				self.note_photo_fetch(camera_id, true).await;
			},
			Err(err) => {
				if self.note_photo_fetch(camera_id, false).await {
					warn!("Camera {} device not available or no photos: {}", camera_id, err);
				}
			}
		}
	}

	/// Tracks the photo-fetch outcome. Returns true when a failure should be reported,
	/// i.e. on the first failure after a success or after the session started.
	async fn note_photo_fetch(&self, camera_id: CameraId, succeeded: bool) -> bool {
		let mut sessions = self.sessions.lock().await;
		let session = sessions.entry(camera_id).or_default();
		if succeeded {
			session.photo_fetch_failing = false;
			return false;
		}
		if session.photo_fetch_failing {
			return false;
		}
		session.photo_fetch_failing = true;
		session.photo_fetch_warnings += 1;
		true
	}

	async fn resolve_stream(&self, camera_id: CameraId) {
		let cameras = match self.gateway.list_cameras().await {
			Ok(cameras) => cameras,
			Err(err) => {
				error!("Failed to setup stream for camera {}: {}", camera_id, err);
				return;
			}
		};
		match cameras.iter().find(|camera| camera.id == camera_id) {
			Some(camera) => {
				let url = stream_url(&camera.ip_address);
				if self.store.set_stream_url(camera_id, url.clone()).await {
					info!("Camera {} streaming from {}", camera_id, url);
				}
			},
			None => debug!("Camera {} is not in the registry; stream unchanged", camera_id),
		}
	}
}
