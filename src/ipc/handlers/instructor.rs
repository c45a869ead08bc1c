use std::collections::BTreeMap;

use crate::controllers::{App, Gate};
use crate::error::AppResult;
use crate::ipc::helpers::{get_required, get_required_bool, get_required_date, get_required_str, with_app};
use crate::ipc::types::{AppState, Request};
use crate::model::{CoursePatch, NewCourse};
use crate::store::NewUser;
use serde_json::json;

fn with_view(app: &App, mut result: serde_json::Value) -> serde_json::Value {
    if let Some(obj) = result.as_object_mut() {
        obj.insert("view".into(), app.surface().current_json());
    }
    result
}

fn instructor_init(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let result = match app.instructor.init() {
        Gate::Ready => json!({ "route": "instructorDashboard", "redirected": false }),
        Gate::Redirect => {
            let route = app.redirect();
            json!({ "route": route, "redirected": true })
        }
    };
    Ok(with_view(app, result))
}

fn show_dashboard(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    app.instructor.show_dashboard()?;
    Ok(with_view(app, json!({})))
}

fn register_user(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let new: NewUser = get_required(params, "user")?;
    let user = app.instructor.register_user(new)?;
    Ok(with_view(app, json!({ "user": user.public_json() })))
}

fn open_course(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let course = app.instructor.open_course(&course_id)?;
    Ok(with_view(app, json!({ "course": course })))
}

fn create_course(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let new: NewCourse = get_required(params, "course")?;
    let course = app.instructor.create_course(new)?;
    Ok(with_view(app, json!({ "course": course })))
}

fn update_course(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let patch: CoursePatch = get_required(params, "updates")?;
    let course = app.instructor.update_course(&course_id, &patch)?;
    Ok(with_view(app, json!({ "course": course })))
}

fn delete_course(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let removed = app.instructor.delete_course(&course_id)?;
    Ok(with_view(app, json!({ "deleted": removed.id })))
}

fn enroll_student(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let student_id = get_required_str(params, "studentId")?;
    let added = app.instructor.enroll_student(&course_id, &student_id)?;
    Ok(with_view(app, json!({ "enrolled": added })))
}

fn unenroll_student(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let student_id = get_required_str(params, "studentId")?;
    let removed = app.instructor.unenroll_student(&course_id, &student_id)?;
    Ok(with_view(app, json!({ "unenrolled": removed })))
}

fn add_class(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let date = get_required_date(params, "date")?;
    let topic = get_required_str(params, "topic")?;
    let session = app.instructor.add_class(&course_id, date, &topic)?;
    Ok(with_view(app, json!({ "session": session })))
}

fn mark_attendance(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let date = get_required_date(params, "date")?;
    let student_id = get_required_str(params, "studentId")?;
    let present = get_required_bool(params, "present")?;
    app.instructor
        .mark_attendance(&course_id, date, &student_id, present)?;
    Ok(with_view(app, json!({ "ok": true })))
}

fn save_all_attendance(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let date = get_required_date(params, "date")?;
    let marks: BTreeMap<String, bool> = get_required(params, "marks")?;
    let report = app
        .instructor
        .save_all_attendance(&course_id, date, &marks)?;
    Ok(with_view(
        app,
        json!({ "updated": report.updated, "skipped": report.skipped }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "instructor.init" => Some(with_app(state, req, instructor_init)),
        "instructor.showDashboard" => Some(with_app(state, req, show_dashboard)),
        "instructor.registerUser" => Some(with_app(state, req, register_user)),
        "instructor.openCourse" => Some(with_app(state, req, open_course)),
        "instructor.createCourse" => Some(with_app(state, req, create_course)),
        "instructor.updateCourse" => Some(with_app(state, req, update_course)),
        "instructor.deleteCourse" => Some(with_app(state, req, delete_course)),
        "instructor.enrollStudent" => Some(with_app(state, req, enroll_student)),
        "instructor.unenrollStudent" => Some(with_app(state, req, unenroll_student)),
        "instructor.addClass" => Some(with_app(state, req, add_class)),
        "instructor.markAttendance" => Some(with_app(state, req, mark_attendance)),
        "instructor.saveAllAttendance" => Some(with_app(state, req, save_all_attendance)),
        _ => None,
    }
}
