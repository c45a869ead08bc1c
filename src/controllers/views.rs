//! Headless views. A screen projects a read-only view-model and mounts it on
//! the shared render surface; whoever drives the daemon reads the surface.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::model::{Course, User};

/// The only contract controllers rely on.
pub trait View {
    /// Full mount. Calling it again leaves the same content mounted.
    fn render(&mut self);
    /// Full unmount. A no-op when not mounted.
    fn hide(&mut self);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mounted {
    pub screen: &'static str,
    pub model: Value,
}

#[derive(Debug, Default)]
struct SurfaceState {
    mounted: Option<(u64, Mounted)>,
    next_token: u64,
}

/// Where screens mount. Clones share one surface.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    state: Rc<RefCell<SurfaceState>>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Mounted> {
        self.state.borrow().mounted.as_ref().map(|(_, m)| m.clone())
    }

    pub fn current_json(&self) -> Value {
        match self.current() {
            Some(m) => json!(m),
            None => Value::Null,
        }
    }

    fn mount(&self, token: Option<u64>, content: Mounted) -> u64 {
        let mut state = self.state.borrow_mut();
        let token = match token {
            Some(t) => t,
            None => {
                state.next_token += 1;
                state.next_token
            }
        };
        state.mounted = Some((token, content));
        token
    }

    // Only clears what the caller mounted; another screen may have replaced it.
    fn unmount(&self, token: u64) {
        let mut state = self.state.borrow_mut();
        if matches!(state.mounted, Some((t, _)) if t == token) {
            state.mounted = None;
        }
    }
}

pub struct Screen {
    name: &'static str,
    model: Value,
    surface: Surface,
    token: Option<u64>,
    mounted: bool,
}

impl Screen {
    pub fn new(surface: &Surface, name: &'static str, model: Value) -> Self {
        Screen {
            name,
            model,
            surface: surface.clone(),
            token: None,
            mounted: false,
        }
    }
}

impl View for Screen {
    fn render(&mut self) {
        let token = self.surface.mount(
            self.token,
            Mounted {
                screen: self.name,
                model: self.model.clone(),
            },
        );
        self.token = Some(token);
        self.mounted = true;
    }

    fn hide(&mut self) {
        if !self.mounted {
            return;
        }
        if let Some(token) = self.token {
            self.surface.unmount(token);
        }
        self.mounted = false;
    }
}

/// The controller's current view. Showing a new view hides the previous one
/// first, then renders the new one.
#[derive(Default)]
pub struct ViewSlot {
    current: Option<Box<dyn View>>,
}

impl ViewSlot {
    pub fn show(&mut self, mut next: Box<dyn View>) {
        if let Some(prev) = self.current.as_mut() {
            prev.hide();
        }
        next.render();
        self.current = Some(next);
    }

    pub fn clear(&mut self) {
        if let Some(mut prev) = self.current.take() {
            prev.hide();
        }
    }

    #[cfg(test)]
    pub fn is_showing(&self) -> bool {
        self.current.is_some()
    }
}

// --- view-models ---------------------------------------------------------

pub fn login_model(message: Option<&str>) -> Value {
    json!({ "message": message })
}

pub fn course_card(course: &Course) -> Value {
    json!({
        "id": course.id,
        "name": course.name,
        "description": course.description,
        "startDate": course.start_date,
        "endDate": course.end_date,
        "studentCount": course.student_ids.len(),
        "sessionCount": course.calendar.len(),
        "progress": course.calculate_progress(),
    })
}

pub fn instructor_dashboard_model(user: &User, courses: &[&Course]) -> Value {
    json!({
        "user": user.public_json(),
        "courses": courses.iter().map(|c| course_card(c)).collect::<Vec<_>>(),
    })
}

pub fn instructor_course_model(
    user: &User,
    course: &Course,
    students: &[&User],
    teacher: Option<&User>,
) -> Value {
    let roster: Vec<Value> = students
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "email": s.email,
                "attendance": s.calculate_attendance(course),
            })
        })
        .collect();
    json!({
        "course": course,
        "progress": course.calculate_progress(),
        "plannedSessions": course.planned_sessions(),
        "teacher": teacher.map(|t| json!({ "id": t.id, "name": t.name })),
        "students": roster,
        "canEditStructure": user.can_edit_course_structure(course),
    })
}

pub fn student_dashboard_model(user: &User, courses: &[&Course]) -> Value {
    let cards: Vec<Value> = courses
        .iter()
        .map(|c| {
            let mut card = course_card(c);
            card["attendance"] = json!(user.calculate_attendance(c));
            card
        })
        .collect();
    json!({
        "user": user.public_json(),
        "courses": cards,
    })
}

pub fn student_course_model(user: &User, course: &Course) -> Value {
    let sessions: Vec<Value> = course
        .calendar
        .iter()
        .map(|s| {
            json!({
                "date": s.date,
                "topic": s.topic,
                "present": s.attendance.get(&user.id).copied().unwrap_or(false),
            })
        })
        .collect();
    json!({
        "course": course_card(course),
        "schedule": course.schedule,
        "sessions": sessions,
        "attendance": user.calculate_attendance(course),
    })
}
