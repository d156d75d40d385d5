//! Screen controllers.
//!
//! Each screen loads its data from the backend, keeps it as local state and
//! exposes the actions of the page. Actions never fail outright: every backend
//! error is turned into a [`Notice`] for the user.

mod admin;
mod auth;
mod courses;
mod instructor;
mod my_courses;

pub use admin::{AdminDashboard, ManageCourses, ManageUsers};
pub use auth::{LoginForm, RegisterForm};
pub use courses::AllCourses;
pub use instructor::InstructorDashboard;
pub use my_courses::MyCourses;

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::inflight::{InFlight, LifetimeToken};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Message shown after an action, in place of a browser alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Where the application should go next, if anywhere.
    pub navigate_to: Option<&'static str>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            navigate_to: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            navigate_to: None,
        }
    }

    pub fn then_navigate(mut self, path: &'static str) -> Self {
        self.navigate_to = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            NoticeLevel::Success => write!(f, "{}", self.message),
            NoticeLevel::Error => write!(f, "Error: {}", self.message),
        }
    }
}

/// Outcome of loading a screen's data.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn items(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(items) => Some(items),
            LoadState::Failed(_) => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut T> {
        match self {
            LoadState::Loaded(items) => Some(items),
            LoadState::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            LoadState::Loaded(_) => None,
        }
    }
}

/// What every screen needs: the session, the backend, and its own lifetime.
#[derive(Clone)]
pub struct ViewContext {
    pub session: Arc<SessionStore>,
    pub gateway: Gateway,
    pub in_flight: InFlight,
    pub lifetime: LifetimeToken,
}

impl ViewContext {
    /// Run a backend call tied to this view's lifetime.
    ///
    /// A 401 ends the session only if it is still the one the call started
    /// under; a login made while the request was pending is kept.
    pub async fn call<F, T>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let started_with = self.session.current_credential();
        let result = self.lifetime.run(fut).await;
        if let Err(e) = &result {
            if e.is_unauthorized()
                && started_with.is_some()
                && self.session.current_credential() == started_with
            {
                warn!("Backend rejected the session credential, logging out");
                self.session.logout();
            }
        }
        result
    }

    /// Run an action once at a time per `key`, turning the result into a notice.
    pub async fn action<F>(
        &self,
        key: String,
        fallback: &str,
        success: impl Into<String>,
        fut: F,
    ) -> Notice
    where
        F: Future<Output = Result<(), ClientError>>,
    {
        let Some(_guard) = self.in_flight.try_begin(key) else {
            return Notice::error(ClientError::Busy.to_string());
        };
        match self.call(fut).await {
            Ok(()) => {
                let notice = Notice::success(success);
                info!(message = %notice.message, "Action succeeded");
                notice
            }
            Err(e) => failure_notice(&e, fallback),
        }
    }

    /// The credential for an authenticated call, or a notice asking to log in.
    pub fn credential_or(&self, message: &str) -> Result<String, Notice> {
        self.session
            .current_credential()
            .ok_or_else(|| Notice::error(message))
    }
}

/// Message to show for a failed call: the backend's own message when it sent
/// one, otherwise `fallback`.
pub fn failure_message(error: &ClientError, fallback: &str) -> String {
    match error {
        ClientError::Busy | ClientError::Cancelled => error.to_string(),
        _ => error
            .backend_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string()),
    }
}

fn failure_notice(error: &ClientError, fallback: &str) -> Notice {
    warn!(error = %error, "Action failed");
    Notice::error(failure_message(error, fallback))
}

/// Record a failed load as the screen's error state.
fn load_failed<T>(error: ClientError, fallback: &str) -> LoadState<T> {
    warn!(error = %error, "Failed to load view data");
    LoadState::Failed(failure_message(&error, fallback))
}
