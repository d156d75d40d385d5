//! HTTP client for the course backend.
//!
//! One method per backend endpoint. Authenticated calls take the raw credential
//! and send it as a bearer token.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::error::ClientError;
use crate::models::{Course, NewCourse, Registration, Role, UserRecord};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct CoursesEnvelope {
    #[serde(default)]
    courses: Vec<Course>,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// Client for the backend REST API.
#[derive(Clone)]
pub struct Gateway {
    http: Client,
    base: Url,
}

impl Gateway {
    pub fn new(base: Url) -> Result<Self, ClientError> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base: Url, timeout: Duration) -> Result<Self, ClientError> {
        if base.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "API URL cannot be used as a base: {}",
                base
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL below the base. Each segment is percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // --- auth ---

    /// `POST /auth/login`, returns the issued credential.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let request = self
            .request(Method::POST, &["auth", "login"], None)
            .json(&json!({ "email": email, "password": password }));
        let response: TokenResponse = self.fetch(request).await?;
        Ok(response.token)
    }

    /// `POST /auth/register`
    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &["auth", "register"], None)
            .json(registration);
        self.execute(request).await
    }

    // --- courses ---

    /// `GET /courses`
    pub async fn list_courses(&self) -> Result<Vec<Course>, ClientError> {
        let request = self.request(Method::GET, &["courses"], None);
        self.fetch(request).await
    }

    /// `POST /courses/{id}/enroll`
    pub async fn enroll(&self, credential: &str, course_id: &str) -> Result<(), ClientError> {
        let request = self
            .request(
                Method::POST,
                &["courses", course_id, "enroll"],
                Some(credential),
            )
            .json(&json!({}));
        self.execute(request).await
    }

    /// `POST /courses/unenroll/{id}`
    pub async fn unenroll(&self, credential: &str, course_id: &str) -> Result<(), ClientError> {
        let request = self
            .request(
                Method::POST,
                &["courses", "unenroll", course_id],
                Some(credential),
            )
            .json(&json!({}));
        self.execute(request).await
    }

    /// `POST /courses/create`
    pub async fn create_course(
        &self,
        credential: &str,
        course: &NewCourse,
    ) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &["courses", "create"], Some(credential))
            .json(course);
        self.execute(request).await
    }

    /// `GET /courses/my-created-courses`
    pub async fn my_created_courses(&self, credential: &str) -> Result<Vec<Course>, ClientError> {
        let request = self.request(
            Method::GET,
            &["courses", "my-created-courses"],
            Some(credential),
        );
        let envelope: CoursesEnvelope = self.fetch(request).await?;
        Ok(envelope.courses)
    }

    /// `GET /courses/my-courses`
    pub async fn my_courses(&self, credential: &str) -> Result<Vec<Course>, ClientError> {
        let request = self.request(Method::GET, &["courses", "my-courses"], Some(credential));
        let envelope: CoursesEnvelope = self.fetch(request).await?;
        Ok(envelope.courses)
    }

    /// `DELETE /courses/{id}`
    pub async fn delete_course(
        &self,
        credential: &str,
        course_id: &str,
    ) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &["courses", course_id], Some(credential));
        self.execute(request).await
    }

    /// `POST /courses/{id}/remove/{studentId}`
    pub async fn remove_student(
        &self,
        credential: &str,
        course_id: &str,
        student_id: &str,
    ) -> Result<(), ClientError> {
        let request = self
            .request(
                Method::POST,
                &["courses", course_id, "remove", student_id],
                Some(credential),
            )
            .json(&json!({}));
        self.execute(request).await
    }

    /// `GET /courses/admin/all-courses`
    pub async fn all_courses(&self, credential: &str) -> Result<Vec<Course>, ClientError> {
        let request = self.request(
            Method::GET,
            &["courses", "admin", "all-courses"],
            Some(credential),
        );
        let envelope: CoursesEnvelope = self.fetch(request).await?;
        Ok(envelope.courses)
    }

    // --- admin ---

    /// `GET /admin/users`
    pub async fn list_users(&self, credential: &str) -> Result<Vec<UserRecord>, ClientError> {
        let request = self.request(Method::GET, &["admin", "users"], Some(credential));
        let envelope: UsersEnvelope = self.fetch(request).await?;
        Ok(envelope.users)
    }

    /// `DELETE /admin/users/{id}`
    pub async fn delete_user(&self, credential: &str, user_id: &str) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &["admin", "users", user_id], Some(credential));
        self.execute(request).await
    }

    /// `PUT /admin/users/{id}/role`
    pub async fn set_user_role(
        &self,
        credential: &str,
        user_id: &str,
        role: Role,
    ) -> Result<(), ClientError> {
        let request = self
            .request(
                Method::PUT,
                &["admin", "users", user_id, "role"],
                Some(credential),
            )
            .json(&json!({ "role": role }));
        self.execute(request).await
    }

    // --- plumbing ---

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        credential: Option<&str>,
    ) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(method = %method, url = %url, "Backend request");
        let request = self.http.request(method, url);
        match credential {
            Some(credential) => request.bearer_auth(credential),
            None => request,
        }
    }

    /// Send and discard the response body.
    async fn execute(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(request).await?;
        // Mutation responses carry nothing the client uses.
        let _ = response.bytes().await;
        Ok(())
    }

    /// Send and decode a JSON response body.
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        let url = response.url().clone();
        response.json().await.map_err(|e| {
            warn!(url = %url, error = %e, "Unreadable backend response");
            ClientError::InvalidResponse(e.to_string())
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Backend request failed");
            ClientError::NetworkFailure(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        debug!(status = status.as_u16(), message = %message, "Backend returned an error");
        Err(ClientError::from_status(status.as_u16(), message))
    }
}

/// Pull the human-readable message out of an error body.
///
/// The backend answers `{"message": ...}`; `{"error": ...}` and plain text are
/// accepted as well.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
        return String::new();
    }
    body.trim().chars().take(200).collect()
}
