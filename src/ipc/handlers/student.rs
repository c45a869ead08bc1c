use crate::controllers::{App, Gate};
use crate::error::AppResult;
use crate::ipc::helpers::{get_required_str, with_app};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn student_init(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let (route, redirected) = match app.student.init() {
        Gate::Ready => (json!("studentDashboard"), false),
        Gate::Redirect => (json!(app.redirect()), true),
    };
    Ok(json!({
        "route": route,
        "redirected": redirected,
        "view": app.surface().current_json(),
    }))
}

fn show_dashboard(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    app.student.show_dashboard()?;
    Ok(json!({ "view": app.surface().current_json() }))
}

fn open_course(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let attendance = app.student.open_course(&course_id)?;
    Ok(json!({
        "courseId": course_id,
        "attendance": attendance,
        "view": app.surface().current_json(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "student.init" => Some(with_app(state, req, student_init)),
        "student.showDashboard" => Some(with_app(state, req, show_dashboard)),
        "student.openCourse" => Some(with_app(state, req, open_course)),
        _ => None,
    }
}
