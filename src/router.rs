//! Path routing with role gating.

use tracing::{debug, info};

use crate::jwt::SessionClaims;
use crate::policy::{self, ViewId};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

/// Route table.
const ROUTES: [(&str, ViewId); 8] = [
    ("/", ViewId::AllCourses),
    ("/login", ViewId::Login),
    ("/register", ViewId::Register),
    ("/my-courses", ViewId::MyCourses),
    ("/instructor", ViewId::InstructorDashboard),
    ("/admin/dashboard", ViewId::AdminDashboard),
    ("/admin/manage-users", ViewId::ManageUsers),
    ("/admin/manage-courses", ViewId::ManageCourses),
];

/// Map a request path to a view. Query strings, fragments and a trailing slash
/// are ignored; unknown paths map to [`ViewId::NotFound`].
pub fn view_for_path(path: &str) -> ViewId {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    let path = if path.is_empty() { HOME_PATH } else { path };

    ROUTES
        .iter()
        .find(|(route, _)| *route == path)
        .map(|(_, view)| *view)
        .unwrap_or(ViewId::NotFound)
}

/// Canonical path of a view, if it has one.
pub fn path_for_view(view: ViewId) -> Option<&'static str> {
    ROUTES
        .iter()
        .find(|(_, v)| *v == view)
        .map(|(route, _)| *route)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteState {
    Resolving,
    Authorized(ViewId),
    Redirected { to: &'static str },
}

impl RouteState {
    pub fn view(&self) -> Option<ViewId> {
        match self {
            RouteState::Authorized(view) => Some(*view),
            _ => None,
        }
    }
}

/// Decide what a path resolves to for the given session.
pub fn resolve(path: &str, claims: Option<&SessionClaims>) -> RouteState {
    let view = view_for_path(path);
    if policy::can_access(claims, view) {
        RouteState::Authorized(view)
    } else if claims.is_none() {
        RouteState::Redirected { to: LOGIN_PATH }
    } else {
        RouteState::Redirected { to: HOME_PATH }
    }
}

/// Tracks the current path and its resolution.
#[derive(Debug)]
pub struct ViewRouter {
    path: String,
    state: RouteState,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRouter {
    pub fn new() -> Self {
        Self {
            path: HOME_PATH.to_string(),
            state: RouteState::Resolving,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }

    /// Navigate to `path` and resolve it against the session.
    pub fn navigate(&mut self, path: &str, claims: Option<&SessionClaims>) -> &RouteState {
        self.path = path.to_string();
        self.state = RouteState::Resolving;
        debug!(path = %self.path, "Resolving route");
        self.settle(claims)
    }

    /// Re-check the current path after the session changed.
    ///
    /// A view that was authorized may now redirect, e.g. on logout.
    pub fn session_changed(&mut self, claims: Option<&SessionClaims>) -> &RouteState {
        if matches!(self.state, RouteState::Redirected { .. }) {
            return &self.state;
        }
        self.settle(claims)
    }

    fn settle(&mut self, claims: Option<&SessionClaims>) -> &RouteState {
        self.state = resolve(&self.path, claims);
        if let RouteState::Redirected { to } = self.state {
            info!(from = %self.path, to = %to, "Redirecting");
        }
        &self.state
    }
}
