use chrono::Local;



pub type CameraId = u64;

/// Last known capture state of one camera.
#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct CaptureState {
	/// Stream endpoint while hot, photo endpoint otherwise.
	pub url: Option<String>,
	pub last_timestamp: Option<String>,
	pub current_temp: Option<f64>,
}

#[derive(Clone)]
#[derive(Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct PhotoRecord {
	pub url: String,
	pub timestamp: String,
}

/// One entry of `GET /api/photos`. Only the url is consumed.
#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct PhotoEntry {
	#[serde(default)]
	pub url: Option<String>,
}

/// One entry of `GET /api/cameras`.
#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct CameraRecord {
	pub id: CameraId,
	#[serde(default)]
	pub name: Option<String>,
	pub ip_address: String,
	#[serde(default)]
	pub location: Option<String>,
}

/// One entry of `GET /api/data`.
#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct SensorReading {
	#[serde(default)]
	pub id: Option<u64>,
	pub temperature: Option<f64>,
	pub humidity: Option<f64>,
	#[serde(default)]
	pub timestamp: Option<String>,
}

/// Capture time in local time, second precision.
pub fn local_timestamp() -> String {
	Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
