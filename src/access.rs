//! Dashboard navigation gating.
//!
//! Views are gated on two booleans derived from the persisted session user:
//! whether someone is logged in, and whether that user is an admin.

#[derive(Clone)]
#[derive(Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct SessionUser {
	pub id: u64,
	pub username: String,
	#[serde(default)]
	pub is_admin: bool,
}

impl SessionUser {
	/// Parses the persisted user blob. Anything unreadable counts as logged out.
	pub fn from_persisted(raw: Option<&str>) -> Option<SessionUser> {
		raw.and_then(|raw| serde_json::from_str(raw).ok())
	}
}

#[derive(Clone, Copy)]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouteRequirements {
	pub requires_auth: bool,
	pub requires_guest: bool,
	pub requires_admin: bool,
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub enum Navigation {
	Proceed,
	Redirect(&'static str),
}

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

const GUEST: RouteRequirements = RouteRequirements { requires_auth: false, requires_guest: true, requires_admin: false };
const AUTH: RouteRequirements = RouteRequirements { requires_auth: true, requires_guest: false, requires_admin: false };
const ADMIN: RouteRequirements = RouteRequirements { requires_auth: true, requires_guest: false, requires_admin: true };

/// Requirements for a dashboard path, or the redirect for paths that only forward.
pub fn route_for(path: &str) -> Result<RouteRequirements, Navigation> {
	match path {
		"/" => Err(Navigation::Redirect(LOGIN_PATH)),
		LOGIN_PATH => Ok(GUEST),
		DASHBOARD_PATH => Ok(AUTH),
		"/admin" => Ok(ADMIN),
		_ if is_camera_path(path) => Ok(AUTH),
		_ => Ok(RouteRequirements::default()),
	}
}

fn is_camera_path(path: &str) -> bool {
	path.strip_prefix("/camera/")
		.map(|id| !id.is_empty() && !id.contains('/'))
		.unwrap_or(false)
}

pub fn guard(route: RouteRequirements, authenticated: bool, is_admin: bool) -> Navigation {
	if route.requires_auth && !authenticated {
		Navigation::Redirect(LOGIN_PATH)
	} else if route.requires_guest && authenticated {
		Navigation::Redirect(DASHBOARD_PATH)
	} else if route.requires_admin && !(authenticated && is_admin) {
		Navigation::Redirect(DASHBOARD_PATH)
	} else {
		Navigation::Proceed
	}
}

/// Decides navigation to `path` for the persisted session user, if any.
pub fn navigate(path: &str, user: Option<&SessionUser>) -> Navigation {
	match route_for(path) {
		Ok(route) => guard(route, user.is_some(), user.map(|u| u.is_admin).unwrap_or(false)),
		Err(redirect) => redirect,
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn user(is_admin: bool) -> SessionUser {
		SessionUser { id: 1, username: "operator".to_string(), is_admin }
	}

	#[test]
	fn logged_out_visitors_go_to_login() {
		assert_eq!(navigate("/dashboard", None), Navigation::Redirect(LOGIN_PATH));
		assert_eq!(navigate("/camera/7", None), Navigation::Redirect(LOGIN_PATH));
		assert_eq!(navigate("/admin", None), Navigation::Redirect(LOGIN_PATH));
		assert_eq!(navigate("/login", None), Navigation::Proceed);
	}

	#[test]
	fn logged_in_users_skip_login() {
		assert_eq!(navigate("/login", Some(&user(false))), Navigation::Redirect(DASHBOARD_PATH));
		assert_eq!(navigate("/camera/7", Some(&user(false))), Navigation::Proceed);
	}

	#[test]
	fn admin_view_needs_admin() {
		assert_eq!(navigate("/admin", Some(&user(false))), Navigation::Redirect(DASHBOARD_PATH));
		assert_eq!(navigate("/admin", Some(&user(true))), Navigation::Proceed);
	}

	#[test]
	fn root_forwards_to_login() {
		assert_eq!(navigate("/", Some(&user(true))), Navigation::Redirect(LOGIN_PATH));
	}

	#[test]
	fn persisted_user_parsing() {
		let parsed = SessionUser::from_persisted(Some(r#"{"id": 3, "username": "ayse", "is_admin": true}"#));
		assert_eq!(parsed, Some(SessionUser { id: 3, username: "ayse".to_string(), is_admin: true }));
		assert!(SessionUser::from_persisted(Some("not json")).is_none());
		assert!(SessionUser::from_persisted(None).is_none());
	}
}
