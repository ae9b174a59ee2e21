//! Temperature feed
//!
//! Periodically reads the newest sensor reading of every camera with an active capture
//! session and pushes its temperature into the capture service.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};

use crate::capture_service::CaptureService;
use crate::common::CameraId;
use crate::gateway::BackendGateway;



pub struct TemperatureFeed {
	service: CaptureService,
	gateway: Arc<dyn BackendGateway>,
	poll_interval: Duration,
	running: Arc<RwLock<bool>>,
}

impl TemperatureFeed {
	pub fn new(service: CaptureService, gateway: Arc<dyn BackendGateway>, poll_interval: Duration) -> Self {
		TemperatureFeed {
			service,
			gateway,
			poll_interval,
			running: Arc::new(RwLock::new(false)),
		}
	}

	pub async fn start(&self) {
		{
			let mut running = self.running.write().await;
			if *running {
				warn!("Temperature feed already running");
				return;
			}
			*running = true;
		}

		info!("Starting temperature feed every {:?}", self.poll_interval);

		let service = self.service.clone();
		let gateway = self.gateway.clone();
		let running = self.running.clone();
		let poll_interval = self.poll_interval;

		tokio::spawn(async move {
			let mut ticker = interval(poll_interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				ticker.tick().await;

				if !*running.read().await {
					break;
				}

				for camera_id in service.active_cameras().await {
					Self::feed_camera(&service, gateway.as_ref(), camera_id).await;
				}
			}

			info!("Temperature feed stopped");
		});
	}

	/// Ends the loop at its next tick.
	pub async fn stop(&self) {
		*self.running.write().await = false;
	}

	async fn feed_camera(service: &CaptureService, gateway: &dyn BackendGateway, camera_id: CameraId) {
		match gateway.sensor_readings(camera_id).await {
			Ok(readings) => {
				match readings.last().and_then(|reading| reading.temperature) {
					Some(temperature) => service.push_temperature(camera_id, temperature).await,
					None => debug!("No temperature reading yet for camera {}", camera_id),
				}
			},
			Err(err) => {
				warn!("Failed to read sensor data for camera {}: {}", camera_id, err);
			}
		}
	}
}
