#[macro_use] extern crate rocket;
#[macro_use] extern crate serde_derive;

use std::path::Path;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use log::{info, warn};
use rocket::{Request, Response};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;

use crate::capture_service::CaptureService;
use crate::common::CameraId;
use crate::config::Config;
use crate::gateway::HttpGateway;
use crate::telemetry::TemperatureFeed;

mod access;
mod capture_service;
mod common;
mod config;
mod error;
mod gateway;
mod policy;
mod rest_api;
mod session_store;
mod telemetry;



// The dashboard UI is served by another server, so it needs CORS to call us.
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
	fn info(&self) -> Info {
		Info {
			name: "Add CORS headers to responses",
			kind: Kind::Response
		}
	}

	async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
		response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
		response.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, PUT, DELETE, OPTIONS"));
		response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
		response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
	}
}


#[rocket::main]
async fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let matches = Command::new("capture-poller")
		.version("0.1.0")
		.about("Adaptive photo-capture poller for the camera dashboard.")
		.arg(
			Arg::new("config")
				.action(ArgAction::Append)	// Allow argument to be specified multiple times; the last one wins
				.short('c')
				.long("config")
				.help("YAML file with capture-poller config")
		)
		.arg(
			Arg::new("camera")
				.action(ArgAction::Append)
				.long("camera")
				.value_parser(clap::value_parser!(CameraId))
				.help("Camera id to start capturing at launch")
		)
		.get_matches();

	let mut config = match matches.get_many::<String>("config").and_then(|filenames| filenames.last()) {
		Some(filename) => config::read_config_file(Path::new(filename))?,
		None => Config::default(),
	};
	if let Some(cameras) = matches.get_many::<CameraId>("camera") {
		config.cameras.extend(cameras.copied());
	}
	config.cameras.sort_unstable();
	config.cameras.dedup();

	let gateway = Arc::new(HttpGateway::new(&config.backend)?);
	if let Some((username, password)) = config.backend.credentials() {
		match gateway.login(username, password).await {
			Ok(user) => info!("Logged in to {} as {} (admin: {})", config.backend.base_url, user.username, user.is_admin),
			Err(err) => warn!("Login to {} failed; continuing without a session. Error was {}", config.backend.base_url, err),
		}
	}

	let service = CaptureService::new(gateway.clone(), config.policy.clone());
	for camera_id in &config.cameras {
		service.start(*camera_id).await;
	}

	let feed = TemperatureFeed::new(service.clone(), gateway.clone(), config.telemetry.poll_interval());
	if config.telemetry.enabled {
		feed.start().await;
	}

	rocket::build()
		.attach(rest_api::stage(service.clone()))
		.attach(CORS)
		.launch()
		.await?;

	feed.stop().await;
	service.stop_all().await;

	anyhow::Ok(())
}
