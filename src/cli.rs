//! CLI argument parsing, validation, and command dispatch.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use url::Url;

use crate::ClientConfig;
use crate::models::Role;
use crate::shell::{Opened, Screen, Shell};
use crate::views::{Notice, RegisterForm};

/// Default backend location.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "skillshare",
    about = "Browse, teach and administer courses on a SkillShare backend"
)]
pub struct Args {
    /// Base URL of the backend API
    #[arg(long, env = "SKILLSHARE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory holding the stored credential (defaults to ~/.config/skillshare)
    #[arg(long, env = "SKILLSHARE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// File containing the backend's JWT secret. When set (or SKILLSHARE_JWT_SECRET
    /// is), credentials are verified instead of trusted
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in and store the issued credential
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SKILLSHARE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SKILLSHARE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = RegisterForm::DEFAULT_ROLE.as_str())]
        role: Role,
    },
    /// Forget the stored credential
    Logout,
    /// Show the current session
    Whoami,
    /// List the navigation entries available to the current session
    Nav,
    /// Open a page by path, e.g. /admin/dashboard
    Open { path: String },
    /// List all courses
    Courses {
        /// Only show courses whose title contains this text
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Enroll in a course (students only)
    Enroll { course_id: String },
    /// List the courses you are enrolled in
    MyCourses,
    /// Leave a course
    Unenroll { course_id: String },
    /// Instructor dashboard actions
    #[command(subcommand)]
    Instructor(InstructorCommand),
    /// Administration actions
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum InstructorCommand {
    /// List your courses and their students
    List,
    /// Create a course
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Delete one of your courses
    Delete { course_id: String },
    /// Remove a student from one of your courses
    RemoveStudent {
        course_id: String,
        student_id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Show the admin dashboard
    Dashboard,
    /// List users
    Users,
    /// Delete a user
    DeleteUser { user_id: String },
    /// Change a user's role
    SetRole { user_id: String, role: Role },
    /// List all courses
    Courses {
        /// Only show enrolled students whose name contains this text
        #[arg(long, default_value = "")]
        student_search: String,
    },
    /// Delete a course
    DeleteCourse { course_id: String },
    /// Remove a student from a course
    RemoveStudent {
        course_id: String,
        student_id: String,
    },
}

/// Initialize logging based on the specified format. Logs go to stderr so
/// command output on stdout stays clean.
pub fn init_logging(format: &LogFormat, verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Parse and validate the API URL.
/// Returns None and logs an error if validation fails.
pub fn validate_api_url(api_url: &str) -> Option<Url> {
    let url = match Url::parse(api_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %api_url, error = %e, "Invalid API URL");
            return None;
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        error!(url = %api_url, "API URL must use http or https");
        return None;
    }

    let is_localhost = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
    if url.scheme() == "http" && !is_localhost {
        warn!(url = %api_url, "Credentials will be sent over plain HTTP");
    }

    Some(url)
}

/// Load the JWT secret from the environment or a file.
///
/// `Some(None)` means no secret is configured and credentials are trusted
/// unverified. Returns None and logs an error if a secret was requested but
/// could not be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<Option<Vec<u8>>> {
    let secret = if let Ok(secret) = std::env::var("SKILLSHARE_JWT_SECRET") {
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        return Some(None);
    };

    if secret.is_empty() {
        error!("JWT secret is empty");
        return None;
    }

    Some(Some(secret.into_bytes()))
}

/// `$XDG_CONFIG_HOME/skillshare`, else `$HOME/.config/skillshare`, else `./.skillshare`.
pub fn default_state_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join("skillshare");
    }
    if let Some(home) = std::env::var_os("HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(home).join(".config").join("skillshare");
    }
    PathBuf::from(".skillshare")
}

/// Build ClientConfig from validated arguments.
pub fn build_config(
    api_url: Url,
    state_dir: Option<PathBuf>,
    jwt_secret: Option<Vec<u8>>,
    timeout_secs: u64,
) -> ClientConfig {
    let state_dir = state_dir.unwrap_or_else(default_state_dir);
    info!(api_url = %api_url, state_dir = %state_dir.display(), "Configured");
    ClientConfig {
        api_url,
        state_dir,
        jwt_secret,
        timeout: Duration::from_secs(timeout_secs.max(1)),
    }
}

/// Text to print and whether the command succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }

    fn notice(notice: Notice) -> Self {
        let mut text = notice.to_string();
        if let Some(path) = notice.navigate_to {
            let _ = write!(text, "\n(next: {})", path);
        }
        Self {
            text,
            success: !notice.is_error(),
        }
    }
}

/// Run one command against the shell.
pub async fn execute(shell: &mut Shell, command: Command) -> CommandOutput {
    match command {
        Command::Login { email, password } => match shell.open("/login").await.screen {
            Screen::Login(form) => {
                let notice = form.submit(&email, &password).await;
                let mut output = CommandOutput::notice(notice);
                if output.success {
                    if let Some(header) = shell.header() {
                        output.text = format!("{}\n{}", header, output.text);
                    }
                }
                output
            }
            other => unexpected(other),
        },
        Command::Register {
            name,
            email,
            password,
            role,
        } => match shell.open("/register").await.screen {
            Screen::Register(form) => {
                CommandOutput::notice(form.submit(&name, &email, &password, role).await)
            }
            other => unexpected(other),
        },
        Command::Logout => {
            let was_logged_in = shell.session().is_logged_in();
            shell.logout();
            if was_logged_in {
                CommandOutput::ok("Logged out")
            } else {
                CommandOutput::ok("Not logged in")
            }
        }
        Command::Whoami => match shell.claims() {
            None => CommandOutput::ok("anonymous"),
            Some(claims) => {
                let mut text = shell.header().unwrap_or_default();
                let _ = write!(text, "\nid: {}\nemail: {}", claims.subject_id, claims.email);
                if !shell.session().codec().is_verified() {
                    text.push_str("\n(credential not verified)");
                }
                CommandOutput::ok(text)
            }
        },
        Command::Nav => {
            let mut text = String::new();
            for entry in shell.navigation() {
                let _ = writeln!(text, "{:<16} {}", entry.label, entry.path);
            }
            CommandOutput::ok(text.trim_end())
        }
        Command::Open { path } => {
            let opened = shell.open(&path).await;
            render(&opened)
        }
        Command::Courses { search } => match shell.open("/").await.screen {
            Screen::AllCourses(view) => {
                let view = view.with_search(search);
                let loaded = view.courses.error().is_none();
                output_view(view.to_string(), loaded)
            }
            other => unexpected(other),
        },
        Command::Enroll { course_id } => match shell.open("/").await.screen {
            Screen::AllCourses(view) => CommandOutput::notice(view.enroll(&course_id).await),
            other => unexpected(other),
        },
        Command::MyCourses => match shell.open("/my-courses").await.screen {
            Screen::MyCourses(view) => {
                let loaded = view.courses.error().is_none();
                output_view(view.to_string(), loaded)
            }
            other => unexpected(other),
        },
        Command::Unenroll { course_id } => match shell.open("/my-courses").await.screen {
            Screen::MyCourses(mut view) => CommandOutput::notice(view.unenroll(&course_id).await),
            other => unexpected(other),
        },
        Command::Instructor(command) => execute_instructor(shell, command).await,
        Command::Admin(command) => execute_admin(shell, command).await,
    }
}

async fn execute_instructor(shell: &mut Shell, command: InstructorCommand) -> CommandOutput {
    let opened = shell.open("/instructor").await;
    let mut view = match opened.screen {
        Screen::Instructor(view) => view,
        _ => return denied(&opened.redirects),
    };

    match command {
        InstructorCommand::List => {
            let loaded = view.courses.error().is_none();
            output_view(view.to_string(), loaded)
        }
        InstructorCommand::Create { title, description } => {
            CommandOutput::notice(view.create_course(&title, &description).await)
        }
        InstructorCommand::Delete { course_id } => {
            CommandOutput::notice(view.delete_course(&course_id).await)
        }
        InstructorCommand::RemoveStudent {
            course_id,
            student_id,
        } => CommandOutput::notice(view.remove_student(&course_id, &student_id).await),
    }
}

async fn execute_admin(shell: &mut Shell, command: AdminCommand) -> CommandOutput {
    let path = match command {
        AdminCommand::Dashboard => "/admin/dashboard",
        AdminCommand::Users | AdminCommand::DeleteUser { .. } | AdminCommand::SetRole { .. } => {
            "/admin/manage-users"
        }
        AdminCommand::Courses { .. }
        | AdminCommand::DeleteCourse { .. }
        | AdminCommand::RemoveStudent { .. } => "/admin/manage-courses",
    };
    let opened = shell.open(path).await;
    if !opened.redirects.is_empty() {
        return denied(&opened.redirects);
    }

    match (opened.screen, command) {
        (Screen::AdminDashboard(view), AdminCommand::Dashboard) => {
            CommandOutput::ok(view.to_string())
        }
        (Screen::ManageUsers(view), AdminCommand::Users) => {
            let loaded = view.users.error().is_none();
            output_view(view.to_string(), loaded)
        }
        (Screen::ManageUsers(mut view), AdminCommand::DeleteUser { user_id }) => {
            CommandOutput::notice(view.delete_user(&user_id).await)
        }
        (Screen::ManageUsers(mut view), AdminCommand::SetRole { user_id, role }) => {
            CommandOutput::notice(view.set_role(&user_id, role).await)
        }
        (Screen::ManageCourses(view), AdminCommand::Courses { student_search }) => {
            let view = view.with_student_search(student_search);
            let loaded = view.courses.error().is_none();
            output_view(view.to_string(), loaded)
        }
        (Screen::ManageCourses(mut view), AdminCommand::DeleteCourse { course_id }) => {
            CommandOutput::notice(view.delete_course(&course_id).await)
        }
        (
            Screen::ManageCourses(mut view),
            AdminCommand::RemoveStudent {
                course_id,
                student_id,
            },
        ) => CommandOutput::notice(view.remove_student(&course_id, &student_id).await),
        (other, _) => unexpected(other),
    }
}

fn render(opened: &Opened) -> CommandOutput {
    let mut text = String::new();
    for to in &opened.redirects {
        let _ = writeln!(text, "Redirected to {}", to);
    }
    let _ = write!(text, "{}", opened.screen);
    CommandOutput {
        text: text.trim_end().to_string(),
        success: opened.redirects.is_empty(),
    }
}

fn output_view(text: String, loaded: bool) -> CommandOutput {
    let text = text.trim_end().to_string();
    if loaded {
        CommandOutput::ok(text)
    } else {
        CommandOutput::failed(text)
    }
}

fn denied(redirects: &[&'static str]) -> CommandOutput {
    match redirects.first() {
        Some(&"/login") => CommandOutput::failed("Please log in first (redirected to /login)"),
        Some(to) => CommandOutput::failed(format!("Access denied (redirected to {})", to)),
        None => CommandOutput::failed("Access denied"),
    }
}

fn unexpected(screen: Screen) -> CommandOutput {
    let view = screen.view_id();
    warn!(view = ?view, "Command landed on an unexpected view");
    CommandOutput::failed(format!("Unexpected page:\n{}", screen.to_string().trim_end()))
}
