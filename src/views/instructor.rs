//! Instructor dashboard: own courses and their students.

use std::fmt;

use super::{LoadState, Notice, ViewContext, load_failed};
use crate::models::{Course, NewCourse};

pub struct InstructorDashboard {
    ctx: ViewContext,
    pub courses: LoadState<Vec<Course>>,
}

impl InstructorDashboard {
    pub async fn load(ctx: ViewContext) -> Self {
        let mut view = Self {
            ctx,
            courses: LoadState::Loaded(Vec::new()),
        };
        view.refresh().await;
        view
    }

    pub async fn refresh(&mut self) {
        self.courses = match self.ctx.credential_or("Please log in first") {
            Err(notice) => LoadState::Failed(notice.message),
            Ok(credential) => match self
                .ctx
                .call(self.ctx.gateway.my_created_courses(&credential))
                .await
            {
                Ok(courses) => LoadState::Loaded(courses),
                Err(e) => load_failed(e, "Failed to fetch courses"),
            },
        };
    }

    pub async fn create_course(&mut self, title: &str, description: &str) -> Notice {
        if title.trim().is_empty() || description.trim().is_empty() {
            return Notice::error("Title and description are required");
        }
        let credential = match self.ctx.credential_or("Please log in first") {
            Ok(credential) => credential,
            Err(notice) => return notice,
        };

        let course = NewCourse {
            title: title.to_string(),
            description: description.to_string(),
        };
        let notice = self
            .ctx
            .action(
                format!("create:{}", title),
                "Failed to create course",
                "Course created successfully!",
                self.ctx.gateway.create_course(&credential, &course),
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
                "Course deleted successfully!",
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

    /// Force-unenroll a student from one of the instructor's courses.
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
                "Student unenrolled successfully!",
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
}

impl fmt::Display for InstructorDashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instructor Dashboard")?;
        let courses = match &self.courses {
            LoadState::Failed(error) => return writeln!(f, "Error: {}", error),
            LoadState::Loaded(courses) => courses,
        };
        if courses.is_empty() {
            return writeln!(f, "No courses created yet.");
        }
        for course in courses {
            writeln!(f)?;
            writeln!(f, "  {}  [{}]", course.title, course.id)?;
            if let Some(description) = &course.description {
                writeln!(f, "    {}", description)?;
            }
            writeln!(f, "    Enrolled Students:")?;
            if course.students_enrolled.is_empty() {
                writeln!(f, "      No students enrolled.")?;
            }
            for student in &course.students_enrolled {
                writeln!(
                    f,
                    "      - {}  [{}]",
                    student.label().unwrap_or("Unknown Student"),
                    student.id
                )?;
            }
        }
        Ok(())
    }
}
