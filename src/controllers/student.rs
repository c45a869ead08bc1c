use tracing::warn;

use super::views::{student_course_model, student_dashboard_model, Screen, Surface, ViewSlot};
use super::{signed_in, Gate, SharedStore};
use crate::error::{AppError, AppResult};
use crate::model::{AttendanceSummary, Course, Role, User};
use crate::store::ProfilePatch;

pub struct StudentDashboardController {
    store: SharedStore,
    surface: Surface,
    views: ViewSlot,
}

impl StudentDashboardController {
    pub fn new(store: SharedStore, surface: Surface) -> Self {
        StudentDashboardController {
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
                warn!(error = %e, "student dashboard refused");
                Gate::Redirect
            }
        }
    }

    pub fn close(&mut self) {
        self.views.clear();
    }

    fn actor(&self) -> AppResult<User> {
        let user = signed_in(&self.store)?;
        if user.role() != Role::Student {
            return Err(AppError::Forbidden(
                "student dashboard requires a student".into(),
            ));
        }
        Ok(user)
    }

    fn render_dashboard(&mut self, user: &User) {
        let model = {
            let store = self.store.borrow();
            let courses = store.get_courses_by_student_id(&user.id);
            student_dashboard_model(user, &courses)
        };
        self.views.show(Box::new(Screen::new(
            &self.surface,
            "student.dashboard",
            model,
        )));
    }

    pub fn show_dashboard(&mut self) -> AppResult<()> {
        let user = self.actor()?;
        self.render_dashboard(&user);
        Ok(())
    }

    fn enrolled(&self, user: &User, course_id: &str) -> AppResult<Course> {
        let store = self.store.borrow();
        let course = store
            .get_course_by_id(course_id)
            .ok_or_else(|| AppError::not_found("course", course_id))?;
        if !course.has_student(&user.id) {
            return Err(AppError::Forbidden(format!(
                "not enrolled in course {course_id}"
            )));
        }
        Ok(course.clone())
    }

    pub fn open_course(&mut self, course_id: &str) -> AppResult<AttendanceSummary> {
        let user = self.actor()?;
        let course = self.enrolled(&user, course_id)?;
        let summary = user.calculate_attendance(&course);
        self.views.show(Box::new(Screen::new(
            &self.surface,
            "student.course",
            student_course_model(&user, &course),
        )));
        Ok(summary)
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
