//! The application shell: session, backend, router and the mounted screen.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::gateway::Gateway;
use crate::inflight::{InFlight, ViewLifetime};
use crate::jwt::SessionClaims;
use crate::policy::{self, NavigationEntry, ViewId};
use crate::router::{RouteState, ViewRouter};
use crate::session::SessionStore;
use crate::views::{
    AdminDashboard, AllCourses, InstructorDashboard, LoginForm, ManageCourses, ManageUsers,
    MyCourses, RegisterForm, ViewContext,
};

/// Redirects are followed at most this many times per navigation.
const MAX_REDIRECTS: usize = 3;

/// A mounted screen.
pub enum Screen {
    AllCourses(AllCourses),
    Login(LoginForm),
    Register(RegisterForm),
    MyCourses(MyCourses),
    Instructor(InstructorDashboard),
    AdminDashboard(AdminDashboard),
    ManageUsers(ManageUsers),
    ManageCourses(ManageCourses),
    NotFound(String),
}

impl Screen {
    pub fn view_id(&self) -> ViewId {
        match self {
            Screen::AllCourses(_) => ViewId::AllCourses,
            Screen::Login(_) => ViewId::Login,
            Screen::Register(_) => ViewId::Register,
            Screen::MyCourses(_) => ViewId::MyCourses,
            Screen::Instructor(_) => ViewId::InstructorDashboard,
            Screen::AdminDashboard(_) => ViewId::AdminDashboard,
            Screen::ManageUsers(_) => ViewId::ManageUsers,
            Screen::ManageCourses(_) => ViewId::ManageCourses,
            Screen::NotFound(_) => ViewId::NotFound,
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::AllCourses(v) => v.fmt(f),
            Screen::Login(v) => v.fmt(f),
            Screen::Register(v) => v.fmt(f),
            Screen::MyCourses(v) => v.fmt(f),
            Screen::Instructor(v) => v.fmt(f),
            Screen::AdminDashboard(v) => v.fmt(f),
            Screen::ManageUsers(v) => v.fmt(f),
            Screen::ManageCourses(v) => v.fmt(f),
            Screen::NotFound(path) => writeln!(f, "Nothing here: {}", path),
        }
    }
}

/// Result of opening a path.
pub struct Opened {
    pub screen: Screen,
    /// Redirects followed on the way, in order.
    pub redirects: Vec<&'static str>,
}

pub struct Shell {
    session: Arc<SessionStore>,
    gateway: Gateway,
    in_flight: InFlight,
    router: ViewRouter,
    session_rx: watch::Receiver<Option<SessionClaims>>,
    lifetime: ViewLifetime,
}

impl Shell {
    /// Build the shell and restore any persisted session.
    pub fn new(session: Arc<SessionStore>, gateway: Gateway) -> Self {
        session.initialize();
        let session_rx = session.subscribe();
        Self {
            session,
            gateway,
            in_flight: InFlight::new(),
            router: ViewRouter::new(),
            session_rx,
            lifetime: ViewLifetime::new(),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    pub fn claims(&self) -> Option<SessionClaims> {
        self.session.current_claims()
    }

    pub fn navigation(&self) -> Vec<NavigationEntry> {
        policy::visible_navigation(self.claims().as_ref())
    }

    /// Header line: greeting and role, or nothing when anonymous.
    pub fn header(&self) -> Option<String> {
        self.claims().map(|claims| {
            format!(
                "Hello, {} (Role: {})",
                policy::greeting(&claims),
                claims.role
            )
        })
    }

    /// Context for a screen mounted in the current lifetime.
    pub fn context(&self) -> ViewContext {
        ViewContext {
            session: self.session.clone(),
            gateway: self.gateway.clone(),
            in_flight: self.in_flight.clone(),
            lifetime: self.lifetime.token(),
        }
    }

    /// Apply pending session changes to the router. Returns the redirect target
    /// when the current screen is no longer allowed.
    pub fn sync(&mut self) -> Option<&'static str> {
        if !self.session_rx.has_changed().unwrap_or(false) {
            return None;
        }
        let claims = self.session_rx.borrow_and_update().clone();
        self.apply(claims)
    }

    /// Wait for the next session change, then apply it like [`Shell::sync`].
    pub async fn next_session_change(&mut self) -> Option<&'static str> {
        if self.session_rx.changed().await.is_err() {
            return None;
        }
        let claims = self.session_rx.borrow_and_update().clone();
        self.apply(claims)
    }

    /// Re-check the current route against `claims`, dismissing the screen on redirect.
    fn apply(&mut self, claims: Option<SessionClaims>) -> Option<&'static str> {
        match self.router.session_changed(claims.as_ref()).clone() {
            RouteState::Redirected { to } => {
                self.dismiss();
                Some(to)
            }
            _ => None,
        }
    }

    /// Navigate to `path`, following redirects, and mount the resulting screen.
    pub async fn open(&mut self, path: &str) -> Opened {
        // Changes made before this navigation are already reflected in the claims.
        self.session_rx.mark_unchanged();

        let mut redirects = Vec::new();
        let mut target = path.to_string();
        let view = loop {
            let claims = self.claims();
            match self.router.navigate(&target, claims.as_ref()).clone() {
                RouteState::Authorized(view) => break view,
                RouteState::Redirected { to } if redirects.len() < MAX_REDIRECTS => {
                    redirects.push(to);
                    target = to.to_string();
                }
                RouteState::Redirected { .. } | RouteState::Resolving => break ViewId::NotFound,
            }
        };

        self.dismiss();
        debug!(path = %target, view = ?view, "Mounting view");
        let screen = self.mount(view, &target).await;
        Opened { screen, redirects }
    }

    /// Cancel everything the current screen still has in flight.
    pub fn dismiss(&mut self) {
        self.lifetime.close();
        self.lifetime = ViewLifetime::new();
    }

    /// Log out and re-check the current route.
    pub fn logout(&mut self) -> Option<&'static str> {
        self.session.logout();
        let redirect = self.sync();
        if let Some(to) = redirect {
            info!(to = %to, "Session ended on a protected view");
        }
        redirect
    }

    async fn mount(&self, view: ViewId, path: &str) -> Screen {
        let ctx = self.context();
        match view {
            ViewId::AllCourses => Screen::AllCourses(AllCourses::load(ctx).await),
            ViewId::Login => Screen::Login(LoginForm::new(ctx)),
            ViewId::Register => Screen::Register(RegisterForm::new(ctx)),
            ViewId::MyCourses => Screen::MyCourses(MyCourses::load(ctx).await),
            ViewId::InstructorDashboard => {
                Screen::Instructor(InstructorDashboard::load(ctx).await)
            }
            ViewId::AdminDashboard => match self.claims() {
                Some(claims) => Screen::AdminDashboard(AdminDashboard::new(claims)),
                None => Screen::Login(LoginForm::new(ctx)),
            },
            ViewId::ManageUsers => Screen::ManageUsers(ManageUsers::load(ctx).await),
            ViewId::ManageCourses => Screen::ManageCourses(ManageCourses::load(ctx).await),
            ViewId::NotFound => Screen::NotFound(path.to_string()),
        }
    }
}
