//! Login and registration forms.

use std::fmt;

use tracing::warn;

use super::{Notice, ViewContext, failure_message};
use crate::error::ClientError;
use crate::models::{Registration, Role};
use crate::router::{HOME_PATH, LOGIN_PATH};

pub struct LoginForm {
    ctx: ViewContext,
}

impl LoginForm {
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx }
    }

    /// Exchange email and password for a credential and start the session.
    /// On failure any stale credential is dropped.
    pub async fn submit(&self, email: &str, password: &str) -> Notice {
        let Some(_guard) = self.ctx.in_flight.try_begin("login") else {
            return Notice::error(ClientError::Busy.to_string());
        };

        let result = match self.ctx.call(self.ctx.gateway.login(email, password)).await {
            Ok(credential) => self.ctx.session.login(&credential),
            Err(e) => Err(e),
        };

        match result {
            Ok(claims) => Notice::success(format!("Logged in as {}", claims.role))
                .then_navigate(HOME_PATH),
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.ctx.session.logout();
                Notice::error(failure_message(&e, "Login failed"))
            }
        }
    }
}

impl fmt::Display for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Login")?;
        writeln!(f, "  login --email <EMAIL> --password <PASSWORD>")
    }
}

pub struct RegisterForm {
    ctx: ViewContext,
}

impl RegisterForm {
    pub const DEFAULT_ROLE: Role = Role::User;

    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx }
    }

    pub async fn submit(&self, name: &str, email: &str, password: &str, role: Role) -> Notice {
        let registration = Registration {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        };

        let notice = self
            .ctx
            .action(
                format!("register:{}", email),
                "Registration failed",
                "Registration successful! Now login.",
                self.ctx.gateway.register(&registration),
            )
            .await;

        if notice.is_error() {
            notice
        } else {
            notice.then_navigate(LOGIN_PATH)
        }
    }
}

impl fmt::Display for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Register")?;
        writeln!(
            f,
            "  register --name <NAME> --email <EMAIL> --password <PASSWORD> [--role user|instructor|admin]"
        )
    }
}
