#![allow(dead_code)]

//! In-process mock of the course backend.
//!
//! Serves the REST contract under `/api` on a random local port, issues HS256
//! credentials signed with [`JWT_SECRET`], and records every request it sees.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Value, json};
use skillshare::session::MemoryStorage;
use skillshare::{Gateway, SessionStore, Shell, TokenCodec};
use url::Url;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret";

pub const ADMIN: (&str, &str) = ("admin@example.com", "adminpass");
pub const INSTRUCTOR: (&str, &str) = ("ivan@example.com", "teachpass");
pub const STUDENT: (&str, &str) = ("sam@example.com", "studentpass");

#[derive(Clone, Debug)]
pub struct MockUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Clone, Debug)]
pub struct MockCourse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub instructor_id: String,
    pub students: Vec<String>,
}

/// A request as seen by the backend.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct Backend {
    pub users: Vec<MockUser>,
    pub courses: Vec<MockCourse>,
    pub requests: Vec<Recorded>,
    /// Delay applied to every response
    pub delay: Option<Duration>,
    next_id: u32,
}

pub type Shared = Arc<Mutex<Backend>>;

impl Backend {
    pub fn seeded() -> Self {
        let user = |id: &str, name: &str, (email, password): (&str, &str), role: &str| MockUser {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        };
        let course = |id: &str, title: &str, description: &str, students: &[&str]| MockCourse {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            instructor_id: "i1".to_string(),
            students: students.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            users: vec![
                user("a1", "Ada Admin", ADMIN, "admin"),
                user("i1", "Ivan Teach", INSTRUCTOR, "instructor"),
                user("s1", "Sam Student", STUDENT, "user"),
                user("s2", "Sue Learner", ("sue@example.com", "suepass"), "user"),
            ],
            courses: vec![
                course("c1", "Rust Basics", "Ownership, borrowing and lifetimes", &["s2"]),
                course("c2", "Advanced Rust", "Traits and async", &[]),
                course("c3", "Python Intro", "Getting started", &["s1", "s2"]),
            ],
            ..Default::default()
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, 100 + self.next_id)
    }

    fn user(&self, id: &str) -> Option<&MockUser> {
        self.users.iter().find(|u| u.id == id)
    }

    fn person(&self, id: &str) -> Value {
        match self.user(id) {
            Some(u) => json!({"_id": u.id, "name": u.name, "email": u.email}),
            None => json!({"_id": id}),
        }
    }

    fn course_json(&self, course: &MockCourse) -> Value {
        json!({
            "_id": course.id,
            "title": course.title,
            "description": course.description,
            "instructor": self.person(&course.instructor_id),
            "studentsEnrolled": course.students.iter().map(|s| self.person(s)).collect::<Vec<_>>(),
        })
    }

    pub fn enrolled(&self, course_id: &str, student_id: &str) -> bool {
        self.courses
            .iter()
            .any(|c| c.id == course_id && c.students.iter().any(|s| s == student_id))
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

/// Issue a credential the way the backend does.
pub fn issue_credential(user: &MockUser) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "role": user.role,
        "iat": now,
        "exp": now + 3600,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET),
    )
    .unwrap()
}

pub struct MockServer {
    pub url: Url,
    pub backend: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub fn backend(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    pub fn gateway(&self) -> Gateway {
        Gateway::new(self.url.clone()).expect("Failed to build gateway")
    }

    /// Fresh shell with in-memory credential storage.
    pub fn shell(&self) -> Shell {
        let session = Arc::new(SessionStore::new(
            MemoryStorage::default(),
            TokenCodec::Unverified,
        ));
        Shell::new(session, self.gateway())
    }

    /// A backend-issued credential for the given account.
    pub fn credential_for(&self, (email, _): (&str, &str)) -> String {
        let backend = self.backend();
        let user = backend
            .users
            .iter()
            .find(|u| u.email == email)
            .expect("unknown test user");
        issue_credential(user)
    }

    /// Shell already holding a credential for the given account.
    pub fn shell_as(&self, account: (&str, &str)) -> Shell {
        let credential = self.credential_for(account);
        let session = Arc::new(SessionStore::new(
            MemoryStorage::with_credential(credential),
            TokenCodec::Unverified,
        ));
        Shell::new(session, self.gateway())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start() -> MockServer {
    let backend: Shared = Arc::new(Mutex::new(Backend::seeded()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");

    let app = Router::new()
        .nest("/api", router(backend.clone()))
        .layer(middleware::from_fn_with_state(backend.clone(), record));
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    MockServer {
        url: Url::parse(&format!("http://{}/api", addr)).expect("Invalid URL"),
        backend,
        handle,
    }
}

fn router(backend: Shared) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/courses", get(list_courses))
        .route("/courses/create", post(create_course))
        .route("/courses/my-created-courses", get(my_created_courses))
        .route("/courses/my-courses", get(my_courses))
        .route("/courses/admin/all-courses", get(all_courses))
        .route("/courses/unenroll/{id}", post(unenroll))
        .route("/courses/{id}", delete(delete_course))
        .route("/courses/{id}/enroll", post(enroll))
        .route("/courses/{id}/remove/{student_id}", post(remove_student))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/users/{id}/role", put(set_role))
        .with_state(backend)
}

async fn record(State(backend): State<Shared>, request: Request, next: Next) -> Response {
    let delay = {
        let mut backend = backend.lock().unwrap();
        backend.requests.push(Recorded {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            authorization: request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
        backend.delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    next.run(request).await
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Resolve the bearer credential to a user.
fn authenticate(headers: &HeaderMap, backend: &Backend) -> Result<MockUser, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "No token provided"))?;

    let data = jsonwebtoken::decode::<Value>(
        token,
        &DecodingKey::from_secret(JWT_SECRET),
        &Validation::default(),
    )
    .map_err(|_| fail(StatusCode::UNAUTHORIZED, "Invalid token"))?;

    let id = data.claims["id"].as_str().unwrap_or_default();
    backend
        .user(id)
        .cloned()
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "User no longer exists"))
}

fn require_role(user: &MockUser, roles: &[&str]) -> Result<(), Response> {
    if roles.contains(&user.role.as_str()) {
        Ok(())
    } else {
        Err(fail(StatusCode::FORBIDDEN, "Access denied"))
    }
}

async fn login(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let backend = backend.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match backend
        .users
        .iter()
        .find(|u| u.email == email && u.password == password)
    {
        Some(user) => Json(json!({ "token": issue_credential(user) })).into_response(),
        None => fail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn register(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut backend = backend.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if backend.users.iter().any(|u| u.email == email) {
        return fail(StatusCode::BAD_REQUEST, "User already exists");
    }
    let id = backend.next_id("u");
    backend.users.push(MockUser {
        id,
        name: body["name"].as_str().unwrap_or_default().to_string(),
        email,
        password: body["password"].as_str().unwrap_or_default().to_string(),
        role: body["role"].as_str().unwrap_or("user").to_string(),
    });
    (StatusCode::CREATED, Json(json!({ "message": "User registered" }))).into_response()
}

async fn list_courses(State(backend): State<Shared>) -> Response {
    let backend = backend.lock().unwrap();
    let courses: Vec<Value> = backend.courses.iter().map(|c| backend.course_json(c)).collect();
    Json(courses).into_response()
}

async fn enroll(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&user, &["user"]) {
        return response;
    }
    let Some(course) = backend.courses.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Course not found");
    };
    if course.students.contains(&user.id) {
        return fail(StatusCode::BAD_REQUEST, "Already enrolled");
    }
    course.students.push(user.id);
    Json(json!({ "message": "Enrolled" })).into_response()
}

async fn unenroll(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Some(course) = backend.courses.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Course not found");
    };
    if !course.students.contains(&user.id) {
        return fail(StatusCode::BAD_REQUEST, "Not enrolled in this course");
    }
    course.students.retain(|s| *s != user.id);
    Json(json!({ "message": "Unenrolled" })).into_response()
}

async fn create_course(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&user, &["instructor"]) {
        return response;
    }
    let id = backend.next_id("c");
    backend.courses.push(MockCourse {
        id,
        title: body["title"].as_str().unwrap_or_default().to_string(),
        description: body["description"].as_str().unwrap_or_default().to_string(),
        instructor_id: user.id,
        students: Vec::new(),
    });
    (StatusCode::CREATED, Json(json!({ "message": "Course created" }))).into_response()
}

async fn my_created_courses(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&user, &["instructor"]) {
        return response;
    }
    let courses: Vec<Value> = backend
        .courses
        .iter()
        .filter(|c| c.instructor_id == user.id)
        .map(|c| backend.course_json(c))
        .collect();
    Json(json!({ "courses": courses })).into_response()
}

async fn my_courses(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let courses: Vec<Value> = backend
        .courses
        .iter()
        .filter(|c| c.students.contains(&user.id))
        .map(|c| backend.course_json(c))
        .collect();
    Json(json!({ "courses": courses })).into_response()
}

async fn all_courses(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&user, &["admin"]) {
        return response;
    }
    let courses: Vec<Value> = backend.courses.iter().map(|c| backend.course_json(c)).collect();
    Json(json!({ "courses": courses })).into_response()
}

async fn delete_course(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Some(course) = backend.courses.iter().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Course not found");
    };
    if user.role != "admin" && course.instructor_id != user.id {
        return fail(StatusCode::FORBIDDEN, "Not your course");
    }
    backend.courses.retain(|c| c.id != id);
    Json(json!({ "message": "Course deleted" })).into_response()
}

async fn remove_student(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path((id, student_id)): Path<(String, String)>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let Some(course) = backend.courses.iter_mut().find(|c| c.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Course not found");
    };
    if user.role != "admin" && course.instructor_id != user.id {
        return fail(StatusCode::FORBIDDEN, "Not your course");
    }
    course.students.retain(|s| *s != student_id);
    Json(json!({ "message": "Student removed" })).into_response()
}

async fn list_users(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    let backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&user, &["admin"]) {
        return response;
    }
    let users: Vec<Value> = backend
        .users
        .iter()
        .map(|u| json!({"_id": u.id, "name": u.name, "email": u.email, "role": u.role}))
        .collect();
    Json(json!({ "users": users })).into_response()
}

async fn delete_user(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&user, &["admin"]) {
        return response;
    }
    if backend.user(&id).is_none() {
        return fail(StatusCode::NOT_FOUND, "User not found");
    }
    backend.users.retain(|u| u.id != id);
    Json(json!({ "message": "User deleted" })).into_response()
}

async fn set_role(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    let user = match authenticate(&headers, &backend) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&user, &["admin"]) {
        return response;
    }
    let Some(role) = body["role"].as_str().map(str::to_string) else {
        return fail(StatusCode::BAD_REQUEST, "Role is required");
    };
    let Some(target) = backend.users.iter_mut().find(|u| u.id == id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    target.role = role;
    Json(json!({ "message": "Role updated" })).into_response()
}
