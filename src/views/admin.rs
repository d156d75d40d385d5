//! Administration screens.

use std::fmt;

use super::{LoadState, Notice, ViewContext, load_failed};
use crate::jwt::SessionClaims;
use crate::models::{Course, PersonRef, Role, UserRecord};

/// Landing page for admins: greeting plus links to the management screens.
pub struct AdminDashboard {
    pub admin: SessionClaims,
}

impl AdminDashboard {
    pub const LINKS: [(&'static str, &'static str); 2] = [
        ("Manage Users", "/admin/manage-users"),
        ("Manage Courses", "/admin/manage-courses"),
    ];

    pub fn new(admin: SessionClaims) -> Self {
        Self { admin }
    }
}

impl fmt::Display for AdminDashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.admin.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Admin",
        };
        writeln!(f, "Welcome, {}", name)?;
        writeln!(f, "Role: {}", self.admin.role)?;
        writeln!(f)?;
        for (label, path) in Self::LINKS {
            writeln!(f, "  {:<16} {}", label, path)?;
        }
        Ok(())
    }
}

pub struct ManageUsers {
    ctx: ViewContext,
    pub users: LoadState<Vec<UserRecord>>,
}

impl ManageUsers {
    pub async fn load(ctx: ViewContext) -> Self {
        let users = match ctx.credential_or("Please log in first") {
            Err(notice) => LoadState::Failed(notice.message),
            Ok(credential) => match ctx.call(ctx.gateway.list_users(&credential)).await {
                Ok(users) => LoadState::Loaded(users),
                Err(e) => load_failed(e, "Failed to fetch users"),
            },
        };
        Self { ctx, users }
    }

    pub async fn delete_user(&mut self, user_id: &str) -> Notice {
        let credential = match self.ctx.credential_or("Please log in first") {
            Ok(credential) => credential,
            Err(notice) => return notice,
        };

        let notice = self
            .ctx
            .action(
                format!("delete-user:{}", user_id),
                "Failed to delete user",
                "User deleted successfully",
                self.ctx.gateway.delete_user(&credential, user_id),
            )
            .await;

        if !notice.is_error() {
            if let Some(users) = self.users.items_mut() {
                users.retain(|u| u.id != user_id);
            }
        }
        notice
    }

    pub async fn set_role(&mut self, user_id: &str, role: Role) -> Notice {
        let credential = match self.ctx.credential_or("Please log in first") {
            Ok(credential) => credential,
            Err(notice) => return notice,
        };

        let notice = self
            .ctx
            .action(
                format!("set-role:{}", user_id),
                "Failed to update role",
                "Role updated successfully",
                self.ctx.gateway.set_user_role(&credential, user_id, role),
            )
            .await;

        if !notice.is_error() {
            if let Some(users) = self.users.items_mut() {
                for user in users.iter_mut().filter(|u| u.id == user_id) {
                    user.role = role;
                }
            }
        }
        notice
    }
}

impl fmt::Display for ManageUsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manage Users")?;
        let users = match &self.users {
            LoadState::Failed(error) => return writeln!(f, "Error: {}", error),
            LoadState::Loaded(users) => users,
        };
        if users.is_empty() {
            return writeln!(f, "No users found.");
        }
        for user in users {
            writeln!(f)?;
            writeln!(
                f,
                "  {}  [{}]",
                user.name.as_deref().unwrap_or(""),
                user.id
            )?;
            writeln!(f, "    {}", user.email.as_deref().unwrap_or(""))?;
            writeln!(f, "    Role: {}", user.role)?;
        }
        Ok(())
    }
}

pub struct ManageCourses {
    ctx: ViewContext,
    pub courses: LoadState<Vec<Course>>,
    /// Filters enrolled students by name.
    pub student_search: String,
}

impl ManageCourses {
    pub async fn load(ctx: ViewContext) -> Self {
        let mut view = Self {
            ctx,
            courses: LoadState::Loaded(Vec::new()),
            student_search: String::new(),
        };
        view.refresh().await;
        view
    }

    pub fn with_student_search(mut self, search: impl Into<String>) -> Self {
        self.student_search = search.into();
        self
    }

    pub async fn refresh(&mut self) {
        self.courses = match self.ctx.credential_or("Please log in first") {
            Err(notice) => LoadState::Failed(notice.message),
            Ok(credential) => match self.ctx.call(self.ctx.gateway.all_courses(&credential)).await {
                Ok(courses) => LoadState::Loaded(courses),
                Err(e) => load_failed(e, "Failed to load courses"),
            },
        };
    }

    /// Enrolled students of `course` whose name contains the search term.
    /// Students without a name never match.
    pub fn matching_students<'a>(&self, course: &'a Course) -> Vec<&'a PersonRef> {
        let needle = self.student_search.to_lowercase();
        course
            .students_enrolled
            .iter()
            .filter(|s| {
                s.name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub async fn remove_student(&mut self, course_id: &str, student_id: &str) -> Notice {
        let credential = match self.ctx.credential_or("Please log in first") {
            Ok(credential) => credential,
            Err(notice) => return notice,
        };

        let notice = self
            .ctx
            .action(
                format!("remove:{}:{}", course_id, student_id),
                "Failed to unenroll student",
                "Student unenrolled successfully",
                self.ctx
                    .gateway
                    .remove_student(&credential, course_id, student_id),
            )
            .await;

        if !notice.is_error() {
            self.refresh().await;
        }
        notice
    }

    pub async fn delete_course(&mut self, course_id: &str) -> Notice {
        let credential = match self.ctx.credential_or("Please log in first") {
            Ok(credential) => credential,
            Err(notice) => return notice,
        };

        let notice = self
            .ctx
            .action(
                format!("delete-course:{}", course_id),
                "Failed to delete course",
                "Course deleted successfully",
                self.ctx.gateway.delete_course(&credential, course_id),
            )
            .await;

        if !notice.is_error() {
            if let Some(courses) = self.courses.items_mut() {
                courses.retain(|c| c.id != course_id);
            }
        }
        notice
    }
}

impl fmt::Display for ManageCourses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manage Courses")?;
        let courses = match &self.courses {
            LoadState::Failed(error) => return writeln!(f, "Error: {}", error),
            LoadState::Loaded(courses) => courses,
        };
        if courses.is_empty() {
            return writeln!(f, "No courses found.");
        }
        for course in courses {
            writeln!(f)?;
            writeln!(f, "  {}  [{}]", course.title, course.id)?;
            if let Some(description) = &course.description {
                writeln!(f, "    {}", description)?;
            }
            let instructor = course
                .instructor
                .as_ref()
                .and_then(|i| i.name.as_deref())
                .unwrap_or("Unknown");
            writeln!(f, "    Instructor: {}", instructor)?;
            writeln!(f, "    Enrolled: {}", course.students_enrolled.len())?;

            let students = self.matching_students(course);
            if students.is_empty() {
                writeln!(f, "      No matching students.")?;
            }
            for student in students {
                writeln!(
                    f,
                    "      - {}  [{}]",
                    student.name.as_deref().unwrap_or("Unknown Student"),
                    student.id
                )?;
            }
        }
        Ok(())
    }
}
