//! Courses the student is enrolled in.

use std::fmt;

use super::{LoadState, Notice, ViewContext, load_failed};
use crate::models::Course;

pub struct MyCourses {
    ctx: ViewContext,
    pub courses: LoadState<Vec<Course>>,
}

impl MyCourses {
    pub async fn load(ctx: ViewContext) -> Self {
        let courses = match ctx.credential_or("Please log in to view your courses.") {
            Err(notice) => LoadState::Failed(notice.message),
            Ok(credential) => match ctx.call(ctx.gateway.my_courses(&credential)).await {
                Ok(courses) => LoadState::Loaded(courses),
                Err(e) => load_failed(e, "Failed to load courses"),
            },
        };
        Self { ctx, courses }
    }

    /// Leave a course; it disappears from the list on success.
    pub async fn unenroll(&mut self, course_id: &str) -> Notice {
        let credential = match self.ctx.credential_or("Please log in first") {
            Ok(credential) => credential,
            Err(notice) => return notice,
        };

        let notice = self
            .ctx
            .action(
                format!("unenroll:{}", course_id),
                "Failed to unenroll",
                "You have been unenrolled successfully!",
                self.ctx.gateway.unenroll(&credential, course_id),
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

impl fmt::Display for MyCourses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "My Enrolled Courses")?;
        let courses = match &self.courses {
            LoadState::Failed(error) => return writeln!(f, "Error: {}", error),
            LoadState::Loaded(courses) => courses,
        };
        if courses.is_empty() {
            return writeln!(f, "You are not enrolled in any courses yet.");
        }
        for course in courses {
            writeln!(f)?;
            writeln!(f, "  {}  [{}]", course.title, course.id)?;
            writeln!(f, "    {}", course.preview())?;
            writeln!(f, "    Instructor: {}", course.instructor_label())?;
        }
        Ok(())
    }
}
