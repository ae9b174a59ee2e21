//! Temperature to poll-interval mapping.
//!
//! At or above `hot_threshold` the camera is "hot": photo capture is suspended and the
//! live stream is refreshed every `hot_retry_ms`. Below it, the first band whose
//! `min_temp` the reading reaches decides the interval; colder readings fall back to
//! `default_interval_ms`.

use std::time::Duration;

use crate::error::{Error, Result};



#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct IntervalBand {
	pub min_temp: f64,
	pub interval_ms: u64,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct TemperaturePolicy {
	pub hot_threshold: f64,
	pub hot_retry_ms: u64,
	/// Reading assumed for a camera that never received one. Must not be hot.
	pub default_temp: f64,
	pub default_interval_ms: u64,
	/// Warmest band first.
	pub bands: Vec<IntervalBand>,
}

impl Default for TemperaturePolicy {
	fn default() -> Self {
		TemperaturePolicy {
			hot_threshold: 22.0,
			hot_retry_ms: 3_000,
			default_temp: 18.0,
			default_interval_ms: 40_000,
			bands: vec![
				IntervalBand { min_temp: 20.0, interval_ms: 10_000 },
				IntervalBand { min_temp: 18.0, interval_ms: 20_000 },
				IntervalBand { min_temp: 16.0, interval_ms: 30_000 },
			],
		}
	}
}

impl TemperaturePolicy {
	pub fn is_hot(&self, temp: f64) -> bool {
		temp >= self.hot_threshold
	}

	/// True when going from `old` to `new` enters or leaves the hot regime.
	pub fn crosses_hot_threshold(&self, old: f64, new: f64) -> bool {
		self.is_hot(old) != self.is_hot(new)
	}

	pub fn hot_retry(&self) -> Duration {
		Duration::from_millis(self.hot_retry_ms)
	}

	/// Delay before the next tick for a camera at `temp`.
	pub fn interval_for(&self, temp: f64) -> Duration {
		if self.is_hot(temp) {
			return self.hot_retry();
		}
		let ms = self.bands.iter()
			.find(|band| temp >= band.min_temp)
			.map(|band| band.interval_ms)
			.unwrap_or(self.default_interval_ms);
		Duration::from_millis(ms)
	}

	pub fn validate(&self) -> Result<()> {
		if !self.hot_threshold.is_finite() || !self.default_temp.is_finite() {
			return Err(Error::Config("temperatures must be finite".to_string()));
		}
		if self.hot_retry_ms == 0 || self.default_interval_ms == 0 {
			return Err(Error::Config("intervals must be non-zero".to_string()));
		}
		if self.hot_retry_ms >= self.default_interval_ms {
			return Err(Error::Config(format!(
				"hot retry of {} ms must be shorter than the default interval of {} ms",
				self.hot_retry_ms, self.default_interval_ms
			)));
		}
		if self.is_hot(self.default_temp) {
			return Err(Error::Config(format!(
				"default temperature {} must be below the hot threshold {}",
				self.default_temp, self.hot_threshold
			)));
		}

		let mut previous: Option<&IntervalBand> = None;
		for band in &self.bands {
			if !band.min_temp.is_finite() || band.min_temp >= self.hot_threshold {
				return Err(Error::Config(format!(
					"band at {} must be below the hot threshold {}",
					band.min_temp, self.hot_threshold
				)));
			}
			if band.interval_ms <= self.hot_retry_ms {
				return Err(Error::Config(format!(
					"band at {} polls every {} ms, not slower than the hot retry of {} ms",
					band.min_temp, band.interval_ms, self.hot_retry_ms
				)));
			}
			if band.interval_ms > self.default_interval_ms {
				return Err(Error::Config(format!(
					"band at {} polls slower than the default interval",
					band.min_temp
				)));
			}
			if let Some(prev) = previous {
				if band.min_temp >= prev.min_temp {
					return Err(Error::Config("bands must be listed warmest first".to_string()));
				}
				if band.interval_ms < prev.interval_ms {
					return Err(Error::Config(format!(
						"band at {} polls faster than the warmer band at {}",
						band.min_temp, prev.min_temp
					)));
				}
			}
			previous = Some(band);
		}
		Ok(())
	}
}
