use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use super::views::{instructor_course_model, instructor_dashboard_model, Screen, Surface, ViewSlot};
use super::{signed_in, Gate, SharedStore};
use crate::error::{AppError, AppResult};
use crate::model::{ClassSession, Course, CoursePatch, NewCourse, Profile, Role, User};
use crate::store::{AttendanceSaveReport, NewUser, ProfilePatch};

/// Dashboard for teachers and assistants.
pub struct InstructorDashboardController {
    store: SharedStore,
    surface: Surface,
    views: ViewSlot,
}

impl InstructorDashboardController {
    pub fn new(store: SharedStore, surface: Surface) -> Self {
        InstructorDashboardController {
            store,
            surface,
            views: ViewSlot::default(),
        }
    }

    pub fn init(&mut self) -> Gate {
        match self.actor() {
            Ok(user) => {
                self.render_dashboard(&user);
                Gate::Ready
            }
            Err(e) => {
                warn!(error = %e, "instructor dashboard refused");
                Gate::Redirect
            }
        }
    }

    pub fn close(&mut self) {
        self.views.clear();
    }

    fn actor(&self) -> AppResult<User> {
        let user = signed_in(&self.store)?;
        if !user.role().is_instructor() {
            return Err(AppError::Forbidden(
                "instructor dashboard requires a teacher or assistant".into(),
            ));
        }
        Ok(user)
    }

    /// The course, if the actor may manage it.
    fn managed(&self, user: &User, course_id: &str) -> AppResult<Course> {
        let store = self.store.borrow();
        let course = store
            .get_course_by_id(course_id)
            .ok_or_else(|| AppError::not_found("course", course_id))?;
        if !user.can_manage_course(course) {
            return Err(AppError::Forbidden(format!(
                "{} does not manage course {}",
                user.id, course_id
            )));
        }
        Ok(course.clone())
    }

    fn structural(&self, user: &User, course_id: &str) -> AppResult<Course> {
        let course = self.managed(user, course_id)?;
        if !user.can_edit_course_structure(&course) {
            return Err(AppError::Forbidden(
                "only the course teacher can change or delete it".into(),
            ));
        }
        Ok(course)
    }

    fn render_dashboard(&mut self, user: &User) {
        let model = {
            let store = self.store.borrow();
            let courses = match user.role() {
                Role::Teacher => store.get_courses_by_teacher_id(&user.id),
                _ => store.get_courses_by_assistant_id(&user.id),
            };
            instructor_dashboard_model(user, &courses)
        };
        self.views.show(Box::new(Screen::new(
            &self.surface,
            "instructor.dashboard",
            model,
        )));
    }

    fn render_course(&mut self, user: &User, course_id: &str) -> AppResult<()> {
        let model = {
            let store = self.store.borrow();
            let course = store
                .get_course_by_id(course_id)
                .ok_or_else(|| AppError::not_found("course", course_id))?;
            let students: Vec<&User> = course
                .student_ids
                .iter()
                .filter_map(|sid| store.get_user_by_id(sid))
                .collect();
            let teacher = course
                .teacher_id
                .as_deref()
                .and_then(|tid| store.get_user_by_id(tid));
            instructor_course_model(user, course, &students, teacher)
        };
        self.views.show(Box::new(Screen::new(
            &self.surface,
            "instructor.course",
            model,
        )));
        Ok(())
    }

    pub fn show_dashboard(&mut self) -> AppResult<()> {
        let user = self.actor()?;
        self.render_dashboard(&user);
        Ok(())
    }

    pub fn open_course(&mut self, course_id: &str) -> AppResult<Course> {
        let user = self.actor()?;
        let course = self.managed(&user, course_id)?;
        self.render_course(&user, course_id)?;
        Ok(course)
    }

    /// Teachers only. The course is assigned to the caller when no teacher is given.
    pub fn create_course(&mut self, mut new: NewCourse) -> AppResult<Course> {
        let user = self.actor()?;
        if user.role() != Role::Teacher {
            return Err(AppError::Forbidden("only teachers can create courses".into()));
        }
        match new.teacher_id.as_deref() {
            None => new.teacher_id = Some(user.id.clone()),
            Some(tid) if tid == user.id => {}
            Some(_) => {
                return Err(AppError::Forbidden(
                    "courses can only be created for yourself".into(),
                ))
            }
        }
        let course = self.store.borrow_mut().add_course(new)?;
        self.render_dashboard(&user);
        Ok(course)
    }

    /// Teachers register assistants and students; teacher accounts are not
    /// created from the dashboard.
    pub fn register_user(&mut self, new: NewUser) -> AppResult<User> {
        let user = self.actor()?;
        if user.role() != Role::Teacher {
            return Err(AppError::Forbidden("only teachers can register users".into()));
        }
        if matches!(new.profile, Profile::Teacher { .. }) {
            return Err(AppError::Forbidden("teacher accounts cannot be registered here".into()));
        }
        let created = self.store.borrow_mut().add_user(new)?;
        self.render_dashboard(&user);
        Ok(created)
    }

    pub fn update_course(&mut self, course_id: &str, patch: &CoursePatch) -> AppResult<Course> {
        let user = self.actor()?;
        self.structural(&user, course_id)?;
        let course = self.store.borrow_mut().update_course(course_id, patch)?;
        if user.can_manage_course(&course) {
            self.render_course(&user, course_id)?;
        } else {
            // Handed the course to another teacher; it is no longer ours to show.
            self.render_dashboard(&user);
        }
        Ok(course)
    }

    pub fn delete_course(&mut self, course_id: &str) -> AppResult<Course> {
        let user = self.actor()?;
        self.structural(&user, course_id)?;
        let removed = self.store.borrow_mut().delete_course(course_id)?;
        self.render_dashboard(&user);
        Ok(removed)
    }

    pub fn enroll_student(&mut self, course_id: &str, student_id: &str) -> AppResult<bool> {
        let user = self.actor()?;
        self.managed(&user, course_id)?;
        let added = self
            .store
            .borrow_mut()
            .enroll_student(course_id, student_id)?;
        self.render_course(&user, course_id)?;
        Ok(added)
    }

    pub fn unenroll_student(&mut self, course_id: &str, student_id: &str) -> AppResult<bool> {
        let user = self.actor()?;
        self.managed(&user, course_id)?;
        let removed = self
            .store
            .borrow_mut()
            .unenroll_student(course_id, student_id)?;
        self.render_course(&user, course_id)?;
        Ok(removed)
    }

    pub fn add_class(
        &mut self,
        course_id: &str,
        date: NaiveDate,
        topic: &str,
    ) -> AppResult<ClassSession> {
        let user = self.actor()?;
        self.managed(&user, course_id)?;
        let session = self
            .store
            .borrow_mut()
            .add_class_to_calendar(course_id, date, topic)?;
        self.render_course(&user, course_id)?;
        Ok(session)
    }

    pub fn mark_attendance(
        &mut self,
        course_id: &str,
        date: NaiveDate,
        student_id: &str,
        present: bool,
    ) -> AppResult<()> {
        let user = self.actor()?;
        self.managed(&user, course_id)?;
        self.store
            .borrow_mut()
            .mark_attendance(course_id, date, student_id, present)?;
        self.render_course(&user, course_id)
    }

    pub fn save_all_attendance(
        &mut self,
        course_id: &str,
        date: NaiveDate,
        marks: &BTreeMap<String, bool>,
    ) -> AppResult<AttendanceSaveReport> {
        let user = self.actor()?;
        self.managed(&user, course_id)?;
        let report = self
            .store
            .borrow_mut()
            .save_attendance(course_id, date, marks)?;
        self.render_course(&user, course_id)?;
        Ok(report)
    }

    pub fn update_profile(&mut self, patch: &ProfilePatch) -> AppResult<User> {
        self.actor()?;
        let user = super::update_profile(&self.store, patch)?;
        self.render_dashboard(&user);
        Ok(user)
    }

    pub fn change_password(&mut self, current: &str, new: &str) -> AppResult<()> {
        self.actor()?;
        super::change_password(&self.store, current, new)
    }
}
