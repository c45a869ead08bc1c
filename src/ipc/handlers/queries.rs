//! Read-only lookups. Nothing here writes to storage.

use crate::controllers::App;
use crate::error::{AppError, AppResult};
use crate::ipc::helpers::{get_required_str, with_app};
use crate::ipc::types::{AppState, Request};
use crate::model::{Course, User};
use serde_json::json;

fn users_json(users: &[&User]) -> serde_json::Value {
    json!(users.iter().map(|u| u.public_json()).collect::<Vec<_>>())
}

fn courses_json(courses: &[&Course]) -> serde_json::Value {
    json!(courses)
}

fn courses_get(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let store = app.store();
    let course = store
        .get_course_by_id(&course_id)
        .ok_or_else(|| AppError::not_found("course", &course_id))?;
    Ok(json!({ "course": course }))
}

fn courses_by_teacher(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let teacher_id = get_required_str(params, "teacherId")?;
    let store = app.store();
    let courses = courses_json(&store.get_courses_by_teacher_id(&teacher_id));
    Ok(json!({ "courses": courses }))
}

fn courses_by_assistant(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let assistant_id = get_required_str(params, "assistantId")?;
    let store = app.store();
    let courses = courses_json(&store.get_courses_by_assistant_id(&assistant_id));
    Ok(json!({ "courses": courses }))
}

fn courses_by_student(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let student_id = get_required_str(params, "studentId")?;
    let store = app.store();
    let courses = courses_json(&store.get_courses_by_student_id(&student_id));
    Ok(json!({ "courses": courses }))
}

fn courses_progress(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let store = app.store();
    let course = store
        .get_course_by_id(&course_id)
        .ok_or_else(|| AppError::not_found("course", &course_id))?;
    Ok(json!({
        "courseId": course.id,
        "progress": course.calculate_progress(),
        "heldSessions": course.calendar.len(),
        "plannedSessions": course.planned_sessions(),
    }))
}

fn users_get(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let user_id = get_required_str(params, "userId")?;
    let store = app.store();
    let user = store
        .get_user_by_id(&user_id)
        .ok_or_else(|| AppError::not_found("user", &user_id))?;
    Ok(json!({ "user": user.public_json() }))
}

fn users_teachers(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    Ok(json!({ "users": users_json(&app.store().get_teachers()) }))
}

fn users_assistants(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    Ok(json!({ "users": users_json(&app.store().get_assistants()) }))
}

fn users_students(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    Ok(json!({ "users": users_json(&app.store().get_students()) }))
}

fn attendance_summary(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let course_id = get_required_str(params, "courseId")?;
    let student_id = get_required_str(params, "studentId")?;
    let store = app.store();
    let course = store
        .get_course_by_id(&course_id)
        .ok_or_else(|| AppError::not_found("course", &course_id))?;
    let student = store
        .get_user_by_id(&student_id)
        .ok_or_else(|| AppError::not_found("user", &student_id))?;
    Ok(json!({
        "courseId": course.id,
        "studentId": student.id,
        "attendance": student.calculate_attendance(course),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.get" => Some(with_app(state, req, courses_get)),
        "courses.byTeacher" => Some(with_app(state, req, courses_by_teacher)),
        "courses.byAssistant" => Some(with_app(state, req, courses_by_assistant)),
        "courses.byStudent" => Some(with_app(state, req, courses_by_student)),
        "courses.progress" => Some(with_app(state, req, courses_progress)),
        "users.get" => Some(with_app(state, req, users_get)),
        "users.teachers" => Some(with_app(state, req, users_teachers)),
        "users.assistants" => Some(with_app(state, req, users_assistants)),
        "users.students" => Some(with_app(state, req, users_students)),
        "attendance.summary" => Some(with_app(state, req, attendance_summary)),
        _ => None,
    }
}
