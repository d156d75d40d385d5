//! Role-based access policy.
//!
//! Every role check in the client goes through this module. All functions are
//! pure: they only look at the claims they are given.

use crate::jwt::SessionClaims;
use crate::models::Role;

/// Identifies a screen of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    AllCourses,
    Login,
    Register,
    MyCourses,
    InstructorDashboard,
    AdminDashboard,
    ManageUsers,
    ManageCourses,
    NotFound,
}

impl ViewId {
    /// Role a session must hold to open the view, if any.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            ViewId::AdminDashboard | ViewId::ManageUsers | ViewId::ManageCourses => {
                Some(Role::Admin)
            }
            ViewId::InstructorDashboard => Some(Role::Instructor),
            ViewId::AllCourses
            | ViewId::Login
            | ViewId::Register
            | ViewId::MyCourses
            | ViewId::NotFound => None,
        }
    }
}

/// Who a navigation entry is shown to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Anonymous,
    Role(Role),
}

impl Audience {
    pub fn admits(&self, claims: Option<&SessionClaims>) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Anonymous => claims.is_none(),
            Audience::Role(role) => claims.is_some_and(|c| c.has_role(*role)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationEntry {
    pub label: &'static str,
    pub path: &'static str,
    pub audience: Audience,
}

/// Navigation bar, in display order.
pub const NAVIGATION: [NavigationEntry; 5] = [
    NavigationEntry {
        label: "Admin Dashboard",
        path: "/admin/dashboard",
        audience: Audience::Role(Role::Admin),
    },
    NavigationEntry {
        label: "All Courses",
        path: "/",
        audience: Audience::Everyone,
    },
    NavigationEntry {
        label: "Instructor",
        path: "/instructor",
        audience: Audience::Role(Role::Instructor),
    },
    NavigationEntry {
        label: "Login",
        path: "/login",
        audience: Audience::Anonymous,
    },
    NavigationEntry {
        label: "Register",
        path: "/register",
        audience: Audience::Anonymous,
    },
];

/// Navigation entries the session may see.
pub fn visible_navigation(claims: Option<&SessionClaims>) -> Vec<NavigationEntry> {
    NAVIGATION
        .iter()
        .filter(|entry| entry.audience.admits(claims))
        .copied()
        .collect()
}

pub fn can_access(claims: Option<&SessionClaims>, view: ViewId) -> bool {
    match view.required_role() {
        None => true,
        Some(role) => claims.is_some_and(|c| c.has_role(role)),
    }
}

/// Only students enroll; instructors and admins do not.
pub fn can_enroll(claims: Option<&SessionClaims>) -> bool {
    claims.is_some_and(|c| c.has_role(Role::User))
}

/// Name shown in the header: display name, else email.
pub fn greeting(claims: &SessionClaims) -> &str {
    match claims.display_name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => &claims.email,
    }
}
