use rocket::http::{CookieJar, Status};
use rocket::serde::json::{json, Json, Value};
use rocket::State;

use crate::access::{navigate, Navigation, SessionUser};
use crate::capture_service::{CaptureService, SessionStatus};
use crate::common::{CameraId, CaptureState, PhotoRecord};



#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct TemperatureUpdate {
	pub temperature: f64,
}

#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct CaptureView {
	pub camera_id: CameraId,
	pub state: Option<CaptureState>,
	pub status: SessionStatus,
}

#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct NavigationView {
	pub path: String,
	pub proceed: bool,
	pub redirect: Option<String>,
}


#[get("/<id>")]
async fn get_capture(id: CameraId, service: &State<CaptureService>) -> Json<CaptureView> {
	Json(CaptureView {
		camera_id: id,
		state: service.capture_state(id).await,
		status: service.status(id).await,
	})
}

#[post("/<id>/start")]
async fn start_capture(id: CameraId, service: &State<CaptureService>) -> Json<SessionStatus> {
	service.start(id).await;
	Json(service.status(id).await)
}

#[post("/<id>/stop")]
async fn stop_capture(id: CameraId, service: &State<CaptureService>) -> Json<SessionStatus> {
	service.stop(id).await;
	Json(service.status(id).await)
}

#[post("/stop-all")]
async fn stop_all_captures(service: &State<CaptureService>) -> Status {
	service.stop_all().await;
	Status::NoContent
}

#[get("/<id>/photos")]
async fn list_photos(id: CameraId, service: &State<CaptureService>) -> Json<Vec<PhotoRecord>> {
	Json(service.get_photos(id).await)
}

#[delete("/<id>/photos")]
async fn clear_photos(id: CameraId, service: &State<CaptureService>) -> Status {
	service.clear_photos(id).await;
	Status::NoContent
}

#[put("/<id>/temperature", data="<update>")]
async fn push_temperature(id: CameraId, update: Json<TemperatureUpdate>, service: &State<CaptureService>) -> Result<Status, (Status, Value)> {
	let temperature = update.into_inner().temperature;
	if !temperature.is_finite() {
		return Err((Status::UnprocessableEntity, json!({
			"status": "error",
			"reason": "Temperature must be a finite number."
		})));
	}
	service.push_temperature(id, temperature).await;
	Ok(Status::NoContent)
}

/// Gates a dashboard path on the persisted `user` cookie.
#[get("/?<path>")]
fn resolve_navigation(path: String, cookies: &CookieJar<'_>) -> Json<NavigationView> {
	let user = SessionUser::from_persisted(cookies.get("user").map(|cookie| cookie.value()));
	let (proceed, redirect) = match navigate(&path, user.as_ref()) {
		Navigation::Proceed => (true, None),
		Navigation::Redirect(target) => (false, Some(target.to_string())),
	};
	Json(NavigationView { path, proceed, redirect })
}

#[catch(404)]
fn not_found() -> Value {
	json!({
		"status": "error",
		"reason": "Resource was not found."
	})
}



pub fn stage(service: CaptureService) -> rocket::fairing::AdHoc {
	rocket::fairing::AdHoc::on_ignite("JSON", |rocket| async {
		rocket
			.manage(service)
			.register("/", catchers![not_found])
			.mount("/v0/captures", routes![
				get_capture,
				start_capture,
				stop_capture,
				stop_all_captures,
				list_photos,
				clear_photos,
				push_temperature,
			])
			.mount("/v0/navigation", routes![resolve_navigation])
	})
}


#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use rocket::http::{ContentType, Cookie};
	use rocket::local::asynchronous::Client;

	use super::*;
	use crate::gateway::testing::FakeGateway;
	use crate::policy::TemperaturePolicy;

	async fn client(gateway: &Arc<FakeGateway>) -> (Client, CaptureService) {
		let service = CaptureService::new(gateway.clone(), TemperaturePolicy::default());
		let rocket = rocket::build().attach(stage(service.clone()));
		let client = Client::tracked(rocket).await.expect("valid rocket instance");
		(client, service)
	}

	#[rocket::async_test]
	async fn start_then_list_photos() {
		let gateway = FakeGateway::with_photo("a.jpg");
		let (client, service) = client(&gateway).await;

		let response = client.post("/v0/captures/7/start").dispatch().await;
		assert_eq!(response.status(), Status::Ok);
		let status: SessionStatus = response.into_json().await.unwrap();
		assert!(status.active);

		tokio::time::sleep(Duration::from_millis(50)).await;

		let photos: Vec<PhotoRecord> = client.get("/v0/captures/7/photos").dispatch().await.into_json().await.unwrap();
		assert_eq!(photos.len(), 1);
		assert_eq!(photos[0].url, "a.jpg");

		let view: CaptureView = client.get("/v0/captures/7").dispatch().await.into_json().await.unwrap();
		assert_eq!(view.state.unwrap().url.as_deref(), Some("a.jpg"));
		assert!(view.status.scheduled);

		let response = client.delete("/v0/captures/7/photos").dispatch().await;
		assert_eq!(response.status(), Status::NoContent);
		assert!(service.get_photos(7).await.is_empty());

		let status: SessionStatus = client.post("/v0/captures/7/stop").dispatch().await.into_json().await.unwrap();
		assert!(!status.active);
		assert!(!status.scheduled);
	}

	#[rocket::async_test]
	async fn temperature_is_stored() {
		let gateway = FakeGateway::with_photo("a.jpg");
		let (client, service) = client(&gateway).await;

		let response = client.put("/v0/captures/3/temperature")
			.header(ContentType::JSON)
			.body(r#"{"temperature": 19.25}"#)
			.dispatch()
			.await;
		assert_eq!(response.status(), Status::NoContent);
		assert_eq!(service.capture_state(3).await.unwrap().current_temp, Some(19.25));

		let response = client.put("/v0/captures/3/temperature")
			.header(ContentType::JSON)
			.body(r#"{"temp": 19.25}"#)
			.dispatch()
			.await;
		assert_eq!(response.status(), Status::UnprocessableEntity);
	}

	#[rocket::async_test]
	async fn stop_all_clears_every_session() {
		let gateway = FakeGateway::with_photo("a.jpg");
		let (client, service) = client(&gateway).await;

		client.post("/v0/captures/1/start").dispatch().await;
		client.post("/v0/captures/2/start").dispatch().await;
		let response = client.post("/v0/captures/stop-all").dispatch().await;
		assert_eq!(response.status(), Status::NoContent);
		assert!(service.active_cameras().await.is_empty());
	}

	#[rocket::async_test]
	async fn navigation_follows_the_persisted_user() {
		let gateway = FakeGateway::with_photo("a.jpg");
		let (client, _service) = client(&gateway).await;

		let view: NavigationView = client.get("/v0/navigation?path=%2Fcamera%2F7").dispatch().await.into_json().await.unwrap();
		assert!(!view.proceed);
		assert_eq!(view.redirect.as_deref(), Some("/login"));

		let operator = Cookie::new("user", r#"{"id": 2, "username": "operator", "is_admin": false}"#);
		let view: NavigationView = client.get("/v0/navigation?path=%2Fcamera%2F7")
			.cookie(operator.clone())
			.dispatch().await.into_json().await.unwrap();
		assert_eq!(view.path, "/camera/7");
		assert!(view.proceed);

		let view: NavigationView = client.get("/v0/navigation?path=%2Fadmin")
			.cookie(operator)
			.dispatch().await.into_json().await.unwrap();
		assert_eq!(view.redirect.as_deref(), Some("/dashboard"));

		let admin = Cookie::new("user", r#"{"id": 1, "username": "admin", "is_admin": true}"#);
		let view: NavigationView = client.get("/v0/navigation?path=%2Fadmin")
			.cookie(admin)
			.dispatch().await.into_json().await.unwrap();
		assert!(view.proceed);
		assert!(view.redirect.is_none());
	}

	#[rocket::async_test]
	async fn unknown_route_is_json_404() {
		let gateway = FakeGateway::with_photo("a.jpg");
		let (client, _service) = client(&gateway).await;

		let response = client.get("/v0/nothing-here").dispatch().await;
		assert_eq!(response.status(), Status::NotFound);
		let body: Value = response.into_json().await.unwrap();
		assert_eq!(body["status"], "error");
	}
}
