//! Records exchanged with the course backend.
//!
//! The backend owns these shapes. Fields the client does not use are kept in
//! `extra` so a record can be passed back unmodified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Instructor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Instructor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            other => Err(format!(
                "unknown role '{}', expected one of: user, instructor, admin",
                other
            )),
        }
    }
}

/// A user as embedded in course records (instructor, enrolled students).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRef {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersonRef {
    /// Name if present, otherwise email.
    pub fn label(&self) -> Option<&str> {
        non_empty(self.name.as_deref()).or_else(|| non_empty(self.email.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<PersonRef>,
    #[serde(rename = "studentsEnrolled", default)]
    pub students_enrolled: Vec<PersonRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    /// Instructor name, then email, then "Unknown".
    pub fn instructor_label(&self) -> &str {
        self.instructor
            .as_ref()
            .and_then(PersonRef::label)
            .unwrap_or("Unknown")
    }

    /// First 80 characters of the description followed by an ellipsis.
    pub fn preview(&self) -> String {
        let description = self.description.as_deref().unwrap_or("");
        let short: String = description.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", short)
    }
}

const PREVIEW_CHARS: usize = 80;

/// A user account as listed by the admin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Body of `POST /courses/create`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
