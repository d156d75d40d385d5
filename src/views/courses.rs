//! Course catalogue.

use std::fmt;

use super::{LoadState, Notice, ViewContext, load_failed};
use crate::models::Course;
use crate::policy;

pub struct AllCourses {
    ctx: ViewContext,
    pub courses: LoadState<Vec<Course>>,
    pub search: String,
}

impl AllCourses {
    pub async fn load(ctx: ViewContext) -> Self {
        let courses = match ctx.call(ctx.gateway.list_courses()).await {
            Ok(courses) => LoadState::Loaded(courses),
            Err(e) => load_failed(e, "Failed to load courses"),
        };
        Self {
            ctx,
            courses,
            search: String::new(),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Courses whose title contains the search term, ignoring case.
    pub fn filtered(&self) -> Vec<&Course> {
        let needle = self.search.to_lowercase();
        self.courses
            .items()
            .map(|courses| {
                courses
                    .iter()
                    .filter(|c| c.title.to_lowercase().contains(&needle))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the Enroll action is offered to this session.
    pub fn can_enroll(&self) -> bool {
        policy::can_enroll(self.ctx.session.current_claims().as_ref())
    }

    pub async fn enroll(&self, course_id: &str) -> Notice {
        let credential = match self.ctx.credential_or("Please log in first") {
            Ok(credential) => credential,
            Err(notice) => return notice,
        };
        if !self.can_enroll() {
            return Notice::error("Only students can enroll in courses");
        }

        self.ctx
            .action(
                format!("enroll:{}", course_id),
                "Failed to enroll",
                "Successfully enrolled!",
                self.ctx.gateway.enroll(&credential, course_id),
            )
            .await
    }
}

impl fmt::Display for AllCourses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "All Courses")?;
        if let Some(error) = self.courses.error() {
            return writeln!(f, "Error: {}", error);
        }

        let courses = self.filtered();
        if courses.is_empty() {
            return writeln!(f, "No courses found.");
        }

        let enroll = self.can_enroll();
        for course in courses {
            writeln!(f)?;
            writeln!(f, "  {}  [{}]", course.title, course.id)?;
            writeln!(f, "    {}", course.preview())?;
            writeln!(f, "    Instructor: {}", course.instructor_label())?;
            if enroll {
                writeln!(f, "    (enroll with: enroll {})", course.id)?;
            }
        }
        Ok(())
    }
}
