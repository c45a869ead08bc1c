//! The authoritative in-memory collections and their write-through mirror in
//! durable key-value storage.
//!
//! Every mutation builds the next value, swaps it into its slot, and writes the
//! full users + courses snapshot before returning. A failed write restores the
//! previous value so memory and storage never disagree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::model::{ClassSession, Course, CoursePatch, NewCourse, Profile, Role, User};
use crate::password::{hash_password, verify_password};
use crate::seed;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key_prefix: String,
    pub seed_fixtures: bool,
    pub persist_session: bool,
    pub min_password_length: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for StoreOptions {
    fn from(cfg: &AppConfig) -> Self {
        StoreOptions {
            key_prefix: cfg.store.key_prefix.clone(),
            seed_fixtures: cfg.store.seed_fixtures,
            persist_session: cfg.auth.persist_session,
            min_password_length: cfg.auth.min_password_length,
        }
    }
}

struct StorageKeys {
    users: String,
    courses: String,
    session: String,
    meta: String,
}

impl StorageKeys {
    fn new(prefix: &str) -> Self {
        StorageKeys {
            users: format!("{prefix}.users"),
            courses: format!("{prefix}.courses"),
            session: format!("{prefix}.session"),
            meta: format!("{prefix}.meta"),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct UsersBlob {
    users: Vec<User>,
}

#[derive(Serialize, Deserialize)]
struct CoursesBlob {
    courses: Vec<Course>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotMeta {
    revision: u64,
    saved_at: String,
}

/// What survives a restart of the signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPointer {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub experience: Option<u32>,
    pub age: Option<u32>,
    pub college: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSaveReport {
    pub updated: usize,
    pub skipped: Vec<String>,
}

/// Serialized users and courses blobs, as written to storage.
#[derive(Debug, Clone)]
pub struct SnapshotBlobs {
    pub users: String,
    pub courses: String,
}

pub struct DataStore {
    kv: Box<dyn KeyValueStore>,
    keys: StorageKeys,
    options: StoreOptions,
    users: Vec<User>,
    courses: Vec<Course>,
    current_user_id: Option<String>,
    revision: u64,
}

fn short_id(prefix: char) -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &raw[..10])
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    require_text("email", email)?;
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AppError::Validation("email must contain @".into()));
    };
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!("invalid email: {email}")));
    }
    Ok(())
}

impl DataStore {
    pub fn new(kv: Box<dyn KeyValueStore>, options: StoreOptions) -> Self {
        DataStore {
            kv,
            keys: StorageKeys::new(&options.key_prefix),
            options,
            users: Vec::new(),
            courses: Vec::new(),
            current_user_id: None,
            revision: 0,
        }
    }

    /// Loads the snapshot, or seeds and persists one when storage is empty.
    /// Never fails past this point: problems are logged and reported as `false`.
    pub fn initialize(&mut self) -> bool {
        match self.load() {
            Ok(true) => {
                info!(
                    users = self.users.len(),
                    courses = self.courses.len(),
                    revision = self.revision,
                    "snapshot loaded"
                );
                true
            }
            Ok(false) => {
                if self.options.seed_fixtures {
                    match seed::fixture_users() {
                        Ok(users) => self.users = users,
                        Err(e) => {
                            warn!(error = %e, "failed to build seed users");
                            return false;
                        }
                    }
                    self.courses = seed::fixture_courses();
                }
                match self.persist() {
                    Ok(()) => {
                        info!(
                            users = self.users.len(),
                            courses = self.courses.len(),
                            "storage empty, seeded"
                        );
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to persist seeded snapshot");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to load snapshot");
                self.users.clear();
                self.courses.clear();
                false
            }
        }
    }

    /// `Ok(false)` when storage holds no snapshot at all.
    fn load(&mut self) -> AppResult<bool> {
        // Recorded before parsing so a corrupt blob can still be replaced.
        self.revision = self.stored_revision()?;
        let users_raw = self.kv.get(&self.keys.users)?;
        let courses_raw = self.kv.get(&self.keys.courses)?;
        if users_raw.is_none() && courses_raw.is_none() {
            return Ok(false);
        }
        let users = match users_raw {
            Some(raw) => serde_json::from_str::<UsersBlob>(&raw)?.users,
            None => Vec::new(),
        };
        let courses = match courses_raw {
            Some(raw) => serde_json::from_str::<CoursesBlob>(&raw)?.courses,
            None => Vec::new(),
        };
        self.users = users;
        self.courses = courses;
        Ok(true)
    }

    fn stored_revision(&self) -> AppResult<u64> {
        match self.kv.get(&self.keys.meta)? {
            Some(raw) => Ok(serde_json::from_str::<SnapshotMeta>(&raw)?.revision),
            None => Ok(0),
        }
    }

    /// Full snapshot overwrite. Refuses to write when another writer has moved
    /// the stored revision since this store last loaded or wrote it.
    fn persist(&mut self) -> AppResult<()> {
        let stored = self.stored_revision()?;
        if stored != self.revision {
            return Err(AppError::Conflict(format!(
                "snapshot changed in storage (expected revision {}, found {})",
                self.revision, stored
            )));
        }
        let next = self.revision + 1;
        let blobs = self.snapshot_blobs()?;
        let meta = SnapshotMeta {
            revision: next,
            saved_at: chrono::Utc::now().to_rfc3339(),
        };
        let entries = vec![
            (self.keys.users.clone(), blobs.users),
            (self.keys.courses.clone(), blobs.courses),
            (self.keys.meta.clone(), serde_json::to_string(&meta)?),
        ];
        self.kv.set_many(&entries)?;
        self.revision = next;
        debug!(revision = next, "snapshot written");
        Ok(())
    }

    pub fn snapshot_blobs(&self) -> AppResult<SnapshotBlobs> {
        Ok(SnapshotBlobs {
            users: serde_json::to_string(&UsersBlob {
                users: self.users.clone(),
            })?,
            courses: serde_json::to_string(&CoursesBlob {
                courses: self.courses.clone(),
            })?,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    // --- session -------------------------------------------------------

    /// The user whose email and password both match, or `None`.
    pub fn authenticate_user(&mut self, email: &str, password: &str) -> Option<User> {
        let user = self
            .users
            .iter()
            .find(|u| u.email == email && verify_password(password, &u.password_hash))?
            .clone();
        self.current_user_id = Some(user.id.clone());
        self.write_session_pointer(&user);
        info!(user_id = %user.id, role = user.role().as_str(), "signed in");
        Some(user)
    }

    fn write_session_pointer(&mut self, user: &User) {
        if !self.options.persist_session {
            return;
        }
        let pointer = SessionPointer {
            id: user.id.clone(),
            email: user.email.clone(),
        };
        let result = serde_json::to_string(&pointer)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.kv.set(&self.keys.session, raw));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session pointer");
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        let id = self.current_user_id.as_deref()?;
        self.get_user_by_id(id)
    }

    /// The signed-in user, restoring it from the persisted pointer if needed.
    pub fn check_authentication(&mut self) -> Option<User> {
        if let Some(user) = self.current_user() {
            return Some(user.clone());
        }
        self.current_user_id = None;
        if !self.options.persist_session {
            return None;
        }
        let pointer = match self.kv.get(&self.keys.session) {
            Ok(Some(raw)) => match serde_json::from_str::<SessionPointer>(&raw) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable session pointer");
                    return None;
                }
            },
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read session pointer");
                return None;
            }
        };
        let user = self
            .users
            .iter()
            .find(|u| u.id == pointer.id && u.email == pointer.email)?
            .clone();
        self.current_user_id = Some(user.id.clone());
        debug!(user_id = %user.id, "session restored");
        Some(user)
    }

    pub fn logout(&mut self) {
        if let Some(id) = self.current_user_id.take() {
            info!(user_id = %id, "signed out");
        }
        if let Err(e) = self.kv.remove(&self.keys.session) {
            warn!(error = %e, "failed to clear session pointer");
        }
    }

    // --- users ---------------------------------------------------------

    pub fn add_user(&mut self, new: NewUser) -> AppResult<User> {
        require_text("name", &new.name)?;
        validate_email(&new.email)?;
        self.check_password_rules(&new.password)?;
        if self.get_user_by_email(&new.email).is_some() {
            return Err(AppError::Conflict(format!(
                "email already registered: {}",
                new.email
            )));
        }
        let prefix = match new.profile {
            Profile::Teacher { .. } => 't',
            Profile::Assistant { .. } => 'a',
            Profile::Student { .. } => 's',
        };
        let user = User {
            id: short_id(prefix),
            name: new.name.trim().to_string(),
            email: new.email,
            password_hash: hash_password(&new.password)?,
            join_date: new
                .join_date
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
            profile: new.profile,
        };
        self.users.push(user.clone());
        if let Err(e) = self.persist() {
            self.users.pop();
            return Err(e);
        }
        info!(user_id = %user.id, role = user.role().as_str(), "user added");
        Ok(user)
    }

    fn check_password_rules(&self, password: &str) -> AppResult<()> {
        if password.chars().count() < self.options.min_password_length {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                self.options.min_password_length
            )));
        }
        Ok(())
    }

    fn user_index(&self, user_id: &str) -> AppResult<usize> {
        self.users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("user", user_id))
    }

    fn commit_user(&mut self, idx: usize, next: User) -> AppResult<()> {
        let prev = std::mem::replace(&mut self.users[idx], next);
        if let Err(e) = self.persist() {
            self.users[idx] = prev;
            return Err(e);
        }
        Ok(())
    }

    pub fn update_profile(&mut self, user_id: &str, patch: &ProfilePatch) -> AppResult<User> {
        let idx = self.user_index(user_id)?;
        let mut next = self.users[idx].clone();
        if let Some(name) = &patch.name {
            require_text("name", name)?;
            next.name = name.trim().to_string();
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
            if self
                .users
                .iter()
                .any(|u| u.id != user_id && u.email.eq_ignore_ascii_case(email))
            {
                return Err(AppError::Conflict(format!(
                    "email already registered: {email}"
                )));
            }
            next.email = email.clone();
        }
        match &mut next.profile {
            Profile::Teacher {
                specialization,
                experience,
            }
            | Profile::Assistant {
                specialization,
                experience,
            } => {
                if patch.age.is_some() || patch.college.is_some() {
                    return Err(AppError::Validation(
                        "age and college apply to students only".into(),
                    ));
                }
                if let Some(v) = &patch.specialization {
                    *specialization = v.clone();
                }
                if let Some(v) = patch.experience {
                    *experience = v;
                }
            }
            Profile::Student { age, college } => {
                if patch.specialization.is_some() || patch.experience.is_some() {
                    return Err(AppError::Validation(
                        "specialization and experience apply to instructors only".into(),
                    ));
                }
                if let Some(v) = patch.age {
                    *age = v;
                }
                if let Some(v) = &patch.college {
                    *college = v.clone();
                }
            }
        }
        let email_changed = next.email != self.users[idx].email;
        self.commit_user(idx, next.clone())?;
        if email_changed && self.current_user_id.as_deref() == Some(user_id) {
            self.write_session_pointer(&next);
        }
        info!(user_id, "profile updated");
        Ok(next)
    }

    pub fn change_password(
        &mut self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let idx = self.user_index(user_id)?;
        if !verify_password(current_password, &self.users[idx].password_hash) {
            return Err(AppError::Validation("current password is incorrect".into()));
        }
        self.check_password_rules(new_password)?;
        let mut next = self.users[idx].clone();
        next.password_hash = hash_password(new_password)?;
        self.commit_user(idx, next)?;
        info!(user_id, "password changed");
        Ok(())
    }

    pub fn get_user_by_id(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    fn users_with_role(&self, role: Role) -> Vec<&User> {
        self.users.iter().filter(|u| u.role() == role).collect()
    }

    pub fn get_teachers(&self) -> Vec<&User> {
        self.users_with_role(Role::Teacher)
    }

    pub fn get_assistants(&self) -> Vec<&User> {
        self.users_with_role(Role::Assistant)
    }

    pub fn get_students(&self) -> Vec<&User> {
        self.users_with_role(Role::Student)
    }

    // --- courses -------------------------------------------------------

    fn check_user_role(&self, user_id: &str, role: Role) -> AppResult<()> {
        match self.get_user_by_id(user_id) {
            Some(u) if u.role() == role => Ok(()),
            Some(_) => Err(AppError::Validation(format!(
                "{user_id} is not a {}",
                role.as_str()
            ))),
            None => Err(AppError::not_found("user", user_id)),
        }
    }

    fn check_course_refs(&self, course: &Course) -> AppResult<()> {
        require_text("name", &course.name)?;
        if let Some(tid) = &course.teacher_id {
            self.check_user_role(tid, Role::Teacher)?;
        }
        for aid in &course.assistant_ids {
            self.check_user_role(aid, Role::Assistant)?;
        }
        for sid in &course.student_ids {
            self.check_user_role(sid, Role::Student)?;
        }
        Ok(())
    }

    pub fn add_course(&mut self, new: NewCourse) -> AppResult<Course> {
        let mut course = Course::from_new(short_id('c'), new);
        course.name = course.name.trim().to_string();
        self.check_course_refs(&course)?;
        self.courses.push(course.clone());
        if let Err(e) = self.persist() {
            self.courses.pop();
            return Err(e);
        }
        info!(course_id = %course.id, "course added");
        Ok(course)
    }

    fn course_index(&self, course_id: &str) -> AppResult<usize> {
        self.courses
            .iter()
            .position(|c| c.id == course_id)
            .ok_or_else(|| AppError::not_found("course", course_id))
    }

    fn commit_course(&mut self, idx: usize, next: Course) -> AppResult<()> {
        let prev = std::mem::replace(&mut self.courses[idx], next);
        if let Err(e) = self.persist() {
            self.courses[idx] = prev;
            return Err(e);
        }
        Ok(())
    }

    pub fn update_course(&mut self, course_id: &str, patch: &CoursePatch) -> AppResult<Course> {
        let idx = self.course_index(course_id)?;
        let next = self.courses[idx].patched(patch);
        self.check_course_refs(&next)?;
        self.commit_course(idx, next.clone())?;
        info!(course_id, "course updated");
        Ok(next)
    }

    pub fn delete_course(&mut self, course_id: &str) -> AppResult<Course> {
        let idx = self.course_index(course_id)?;
        let removed = self.courses.remove(idx);
        if let Err(e) = self.persist() {
            self.courses.insert(idx, removed);
            return Err(e);
        }
        info!(course_id, "course deleted");
        Ok(removed)
    }

    pub fn get_course_by_id(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    pub fn get_courses_by_teacher_id(&self, teacher_id: &str) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|c| c.teacher_id.as_deref() == Some(teacher_id))
            .collect()
    }

    pub fn get_courses_by_assistant_id(&self, assistant_id: &str) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|c| c.assistant_ids.iter().any(|a| a == assistant_id))
            .collect()
    }

    pub fn get_courses_by_student_id(&self, student_id: &str) -> Vec<&Course> {
        self.courses
            .iter()
            .filter(|c| c.has_student(student_id))
            .collect()
    }

    // --- calendar and attendance --------------------------------------

    pub fn add_class_to_calendar(
        &mut self,
        course_id: &str,
        date: NaiveDate,
        topic: &str,
    ) -> AppResult<ClassSession> {
        require_text("topic", topic)?;
        let idx = self.course_index(course_id)?;
        let mut next = self.courses[idx].clone();
        let session = next.add_class(date, topic.trim()).clone();
        self.commit_course(idx, next)?;
        info!(course_id, %date, "class added to calendar");
        Ok(session)
    }

    pub fn mark_attendance(
        &mut self,
        course_id: &str,
        date: NaiveDate,
        student_id: &str,
        present: bool,
    ) -> AppResult<()> {
        let idx = self.course_index(course_id)?;
        let mut next = self.courses[idx].clone();
        if !next.has_student(student_id) {
            return Err(AppError::not_found("enrollment", student_id));
        }
        if !next.mark_attendance(date, student_id, present) {
            return Err(AppError::not_found("session", date.to_string()));
        }
        self.commit_course(idx, next)?;
        debug!(course_id, %date, student_id, present, "attendance marked");
        Ok(())
    }

    /// Sets several flags on one session with a single write. Students not
    /// enrolled in the course are skipped and reported.
    pub fn save_attendance(
        &mut self,
        course_id: &str,
        date: NaiveDate,
        marks: &BTreeMap<String, bool>,
    ) -> AppResult<AttendanceSaveReport> {
        let idx = self.course_index(course_id)?;
        let mut next = self.courses[idx].clone();
        if next.session(date).is_none() {
            return Err(AppError::not_found("session", date.to_string()));
        }
        let mut report = AttendanceSaveReport::default();
        for (student_id, present) in marks {
            if next.mark_attendance(date, student_id, *present) {
                report.updated += 1;
            } else {
                report.skipped.push(student_id.clone());
            }
        }
        self.commit_course(idx, next)?;
        info!(
            course_id,
            %date,
            updated = report.updated,
            skipped = report.skipped.len(),
            "attendance saved"
        );
        Ok(report)
    }

    // --- enrollment ----------------------------------------------------

    /// `Ok(false)` when the student is already enrolled; nothing is written.
    pub fn enroll_student(&mut self, course_id: &str, student_id: &str) -> AppResult<bool> {
        let idx = self.course_index(course_id)?;
        self.check_user_role(student_id, Role::Student)?;
        let mut next = self.courses[idx].clone();
        if !next.add_student(student_id) {
            return Ok(false);
        }
        self.commit_course(idx, next)?;
        info!(course_id, student_id, "student enrolled");
        Ok(true)
    }

    /// `Ok(false)` when the student was not enrolled; nothing is written.
    pub fn unenroll_student(&mut self, course_id: &str, student_id: &str) -> AppResult<bool> {
        let idx = self.course_index(course_id)?;
        let mut next = self.courses[idx].clone();
        if !next.remove_student(student_id) {
            return Ok(false);
        }
        self.commit_course(idx, next)?;
        info!(course_id, student_id, "student unenrolled");
        Ok(true)
    }

    // --- snapshot replacement -----------------------------------------

    /// Swaps in whole collections (snapshot import) and signs everyone out.
    pub fn replace_snapshot(&mut self, users: Vec<User>, courses: Vec<Course>) -> AppResult<()> {
        let mut seen = std::collections::HashSet::new();
        for u in &users {
            if !seen.insert(u.id.as_str()) {
                return Err(AppError::Validation(format!("duplicate user id {}", u.id)));
            }
        }
        let mut emails = std::collections::HashSet::new();
        for u in &users {
            if !emails.insert(u.email.to_ascii_lowercase()) {
                return Err(AppError::Validation(format!(
                    "duplicate user email {}",
                    u.email
                )));
            }
        }
        let mut course_ids = std::collections::HashSet::new();
        for c in &courses {
            if !course_ids.insert(c.id.as_str()) {
                return Err(AppError::Validation(format!("duplicate course id {}", c.id)));
            }
        }
        let prev_users = std::mem::replace(&mut self.users, users);
        let prev_courses = std::mem::replace(&mut self.courses, courses);
        if let Err(e) = self.persist() {
            self.users = prev_users;
            self.courses = prev_courses;
            return Err(e);
        }
        self.logout();
        info!(
            users = self.users.len(),
            courses = self.courses.len(),
            "snapshot replaced"
        );
        Ok(())
    }

    pub fn parse_snapshot(users_raw: &str, courses_raw: &str) -> AppResult<(Vec<User>, Vec<Course>)> {
        let users = serde_json::from_str::<UsersBlob>(users_raw)?.users;
        let courses = serde_json::from_str::<CoursesBlob>(courses_raw)?.courses;
        Ok((users, courses))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::ScheduleSlot;
    use crate::storage::MemoryKv;

    pub(crate) fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn empty_options() -> StoreOptions {
        StoreOptions {
            seed_fixtures: false,
            ..StoreOptions::default()
        }
    }

    pub(crate) fn teacher_fixture() -> NewUser {
        NewUser {
            name: "Arjun Mehta".into(),
            email: "t1@example.com".into(),
            password: "teachpass".into(),
            join_date: Some(d("2023-01-01")),
            profile: Profile::Teacher {
                specialization: "Web".into(),
                experience: 5,
            },
        }
    }

    pub(crate) fn student_fixture(email: &str) -> NewUser {
        NewUser {
            name: "Kabir Singh".into(),
            email: email.into(),
            password: "studpass".into(),
            join_date: Some(d("2023-06-01")),
            profile: Profile::Student {
                age: 20,
                college: "DTU".into(),
            },
        }
    }

    pub(crate) fn new_course(teacher_id: &str) -> NewCourse {
        NewCourse {
            name: "Web Development".into(),
            description: "Intro".into(),
            teacher_id: Some(teacher_id.into()),
            assistant_ids: Vec::new(),
            student_ids: Vec::new(),
            start_date: d("2024-01-01"),
            end_date: d("2024-03-01"),
            schedule: vec![ScheduleSlot {
                day: "Monday".into(),
                time: "10:00".into(),
            }],
        }
    }

    fn empty_store(kv: &MemoryKv) -> DataStore {
        let mut store = DataStore::new(Box::new(kv.clone()), empty_options());
        assert!(store.initialize());
        store
    }

    #[test]
    fn initialize_seeds_and_persists_when_empty() {
        let kv = MemoryKv::new();
        let mut store = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(store.initialize());
        assert_eq!(store.get_teachers().len(), 2);
        assert_eq!(store.revision(), 1);
        assert!(kv.get("coursebook.users").expect("get").is_some());
        assert!(kv.get("coursebook.courses").expect("get").is_some());

        let mut reloaded = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(reloaded.initialize());
        assert_eq!(reloaded.revision(), 1);
        assert_eq!(reloaded.users(), store.users());
        assert_eq!(reloaded.courses(), store.courses());
    }

    #[test]
    fn initialize_reports_unreadable_storage() {
        let mut kv = MemoryKv::new();
        kv.set("coursebook.users", "{not json".into()).expect("set");
        let mut store = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(!store.initialize());
        assert!(store.users().is_empty());
        // The unreadable blob is left for inspection, not overwritten.
        assert_eq!(
            kv.get("coursebook.users").expect("get").as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn corrupt_users_blob_can_be_replaced() {
        let mut kv = MemoryKv::new();
        {
            let mut seeded = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
            assert!(seeded.initialize());
            assert!(seeded.revision() > 0);
        }
        kv.set("coursebook.users", "{not json".into()).expect("set");

        let mut store = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(!store.initialize());
        assert!(store.users().is_empty());

        let users = seed::fixture_users().expect("fixtures");
        store
            .replace_snapshot(users, seed::fixture_courses())
            .expect("replace over corrupt blob");
        let mut reloaded = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(reloaded.initialize());
        assert_eq!(reloaded.users().len(), 8);
        assert_eq!(reloaded.revision(), store.revision());
    }

    #[test]
    fn authenticate_requires_both_fields() {
        let kv = MemoryKv::new();
        let mut store = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(store.initialize());
        assert!(store
            .authenticate_user("arjun@codingblocks.com", "wrong")
            .is_none());
        assert!(store
            .authenticate_user("nobody@codingblocks.com", seed::TEACHER_PASSWORD)
            .is_none());
        assert!(store.current_user().is_none());
        let user = store
            .authenticate_user("arjun@codingblocks.com", seed::TEACHER_PASSWORD)
            .expect("match");
        assert_eq!(user.id, "t1");
        assert_eq!(store.current_user().map(|u| u.id.as_str()), Some("t1"));
    }

    #[test]
    fn session_survives_reload_and_logout_clears_it() {
        let kv = MemoryKv::new();
        let mut store = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(store.initialize());
        store
            .authenticate_user("kabir@student.com", seed::STUDENT_PASSWORD)
            .expect("login");

        let mut reloaded = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(reloaded.initialize());
        assert_eq!(
            reloaded.check_authentication().map(|u| u.id),
            Some("s1".to_string())
        );
        reloaded.logout();
        reloaded.logout();
        assert!(reloaded.check_authentication().is_none());

        let mut third = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(third.initialize());
        assert!(third.check_authentication().is_none());
    }

    #[test]
    fn session_not_persisted_when_disabled() {
        let kv = MemoryKv::new();
        let options = StoreOptions {
            persist_session: false,
            ..StoreOptions::default()
        };
        let mut store = DataStore::new(Box::new(kv.clone()), options.clone());
        assert!(store.initialize());
        store
            .authenticate_user("kabir@student.com", seed::STUDENT_PASSWORD)
            .expect("login");
        assert!(kv.get("coursebook.session").expect("get").is_none());
        let mut reloaded = DataStore::new(Box::new(kv.clone()), options);
        assert!(reloaded.initialize());
        assert!(reloaded.check_authentication().is_none());
    }

    #[test]
    fn enrollment_calendar_attendance_scenario() {
        let kv = MemoryKv::new();
        let mut store = empty_store(&kv);
        let t1 = store.add_user(teacher_fixture()).expect("teacher");
        let s1 = store
            .add_user(student_fixture("s1@example.com"))
            .expect("student");

        let course = store.add_course(new_course(&t1.id)).expect("course");
        let by_teacher = store.get_courses_by_teacher_id(&t1.id);
        assert_eq!(by_teacher.len(), 1);
        assert_eq!(by_teacher[0].id, course.id);

        assert!(store.enroll_student(&course.id, &s1.id).expect("enroll"));
        assert!(!store.enroll_student(&course.id, &s1.id).expect("enroll again"));
        assert!(store
            .get_course_by_id(&course.id)
            .expect("course")
            .has_student(&s1.id));

        let session = store
            .add_class_to_calendar(&course.id, d("2024-01-01"), "Intro")
            .expect("class");
        assert_eq!(session.attendance.get(&s1.id), Some(&false));
        assert_eq!(session.attendance.len(), 1);

        store
            .mark_attendance(&course.id, d("2024-01-01"), &s1.id, true)
            .expect("mark");
        let c = store.get_course_by_id(&course.id).expect("course");
        let summary = store
            .get_user_by_id(&s1.id)
            .expect("student")
            .calculate_attendance(c);
        assert_eq!(summary.percentage, 100);
        assert_eq!(summary.attended, 1);
        assert_eq!(summary.total, 1);

        assert!(store.unenroll_student(&course.id, &s1.id).expect("unenroll"));
        let c = store.get_course_by_id(&course.id).expect("course");
        assert!(!c.has_student(&s1.id));
        assert!(c.calendar.iter().all(|s| !s.attendance.contains_key(&s1.id)));
        assert!(!store.unenroll_student(&course.id, &s1.id).expect("again"));
    }

    #[test]
    fn mutations_report_missing_targets() {
        let kv = MemoryKv::new();
        let mut store = empty_store(&kv);
        let t1 = store.add_user(teacher_fixture()).expect("teacher");
        let s1 = store
            .add_user(student_fixture("s1@example.com"))
            .expect("student");
        let course = store.add_course(new_course(&t1.id)).expect("course");

        assert!(matches!(
            store.update_course("nope", &CoursePatch::default()),
            Err(AppError::NotFound { entity: "course", .. })
        ));
        assert!(matches!(
            store.delete_course("nope"),
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            store.mark_attendance(&course.id, d("2024-01-01"), &s1.id, true),
            Err(AppError::NotFound {
                entity: "enrollment",
                ..
            })
        ));
        store.enroll_student(&course.id, &s1.id).expect("enroll");
        assert!(matches!(
            store.mark_attendance(&course.id, d("2024-01-01"), &s1.id, true),
            Err(AppError::NotFound {
                entity: "session",
                ..
            })
        ));
        assert!(matches!(
            store.enroll_student(&course.id, &t1.id),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.add_class_to_calendar(&course.id, d("2024-01-01"), "  "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn update_course_is_copy_on_write() {
        let kv = MemoryKv::new();
        let mut store = empty_store(&kv);
        let t1 = store.add_user(teacher_fixture()).expect("teacher");
        let course = store.add_course(new_course(&t1.id)).expect("course");
        let before = store.get_course_by_id(&course.id).expect("course").clone();
        let patch = CoursePatch {
            name: Some("Advanced Web".into()),
            schedule: Some(Vec::new()),
            ..CoursePatch::default()
        };
        let updated = store.update_course(&course.id, &patch).expect("update");
        assert_eq!(updated.name, "Advanced Web");
        assert_eq!(before.name, "Web Development");
        assert_eq!(updated.id, course.id);
        assert_eq!(updated.calculate_progress(), 0);

        let bad = CoursePatch {
            teacher_id: Some(Some("ghost".into())),
            ..CoursePatch::default()
        };
        assert!(store.update_course(&course.id, &bad).is_err());
        assert_eq!(
            store.get_course_by_id(&course.id).expect("course").name,
            "Advanced Web"
        );

        let removed = store.delete_course(&course.id).expect("delete");
        assert_eq!(removed.id, course.id);
        assert!(store.get_course_by_id(&course.id).is_none());
    }

    #[test]
    fn round_trip_reproduces_collections() {
        let kv = MemoryKv::new();
        let mut store = empty_store(&kv);
        let t1 = store.add_user(teacher_fixture()).expect("teacher");
        let s1 = store
            .add_user(student_fixture("s1@example.com"))
            .expect("student");
        let course = store.add_course(new_course(&t1.id)).expect("course");
        store.enroll_student(&course.id, &s1.id).expect("enroll");
        store
            .add_class_to_calendar(&course.id, d("2024-01-08"), "Intro")
            .expect("class");

        let mut reloaded = DataStore::new(Box::new(kv.clone()), empty_options());
        assert!(reloaded.initialize());
        assert_eq!(reloaded.users(), store.users());
        assert_eq!(reloaded.courses(), store.courses());
        assert_eq!(reloaded.revision(), store.revision());

        let raw = kv.get("coursebook.courses").expect("get").expect("blob");
        let v: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(v["courses"][0]["startDate"], "2024-01-01");
        assert_eq!(v["courses"][0]["calendar"][0]["date"], "2024-01-08");
    }

    #[test]
    fn stale_writer_gets_conflict() {
        let kv = MemoryKv::new();
        let mut a = empty_store(&kv);
        let mut b = DataStore::new(Box::new(kv.clone()), empty_options());
        assert!(b.initialize());
        a.add_user(teacher_fixture()).expect("first writer");
        let res = b.add_user(student_fixture("late@example.com"));
        assert!(matches!(res, Err(AppError::Conflict(_))));
        // The losing write left memory untouched.
        assert!(b.users().is_empty());
    }

    #[test]
    fn profile_and_password_updates() {
        let kv = MemoryKv::new();
        let mut store = empty_store(&kv);
        let s1 = store
            .add_user(student_fixture("s1@example.com"))
            .expect("student");
        store
            .add_user(student_fixture("taken@example.com"))
            .expect("student");
        assert!(matches!(
            store.add_user(student_fixture("TAKEN@example.com")),
            Err(AppError::Conflict(_))
        ));

        let patch = ProfilePatch {
            college: Some("NSUT".into()),
            age: Some(21),
            ..ProfilePatch::default()
        };
        let updated = store.update_profile(&s1.id, &patch).expect("update");
        assert_eq!(
            updated.profile,
            Profile::Student {
                age: 21,
                college: "NSUT".into()
            }
        );
        let wrong_role = ProfilePatch {
            experience: Some(3),
            ..ProfilePatch::default()
        };
        assert!(matches!(
            store.update_profile(&s1.id, &wrong_role),
            Err(AppError::Validation(_))
        ));
        let dup = ProfilePatch {
            email: Some("taken@example.com".into()),
            ..ProfilePatch::default()
        };
        assert!(matches!(
            store.update_profile(&s1.id, &dup),
            Err(AppError::Conflict(_))
        ));

        assert!(store.change_password(&s1.id, "bad", "newpass1").is_err());
        assert!(store.change_password(&s1.id, "studpass", "short").is_err());
        store
            .change_password(&s1.id, "studpass", "newpass1")
            .expect("change");
        assert!(store.authenticate_user("s1@example.com", "studpass").is_none());
        assert!(store.authenticate_user("s1@example.com", "newpass1").is_some());
    }

    #[test]
    fn email_change_keeps_session_resolvable() {
        let kv = MemoryKv::new();
        let mut store = empty_store(&kv);
        let s1 = store
            .add_user(student_fixture("s1@example.com"))
            .expect("student");
        store
            .authenticate_user("s1@example.com", "studpass")
            .expect("login");
        let patch = ProfilePatch {
            email: Some("kabir@example.com".into()),
            ..ProfilePatch::default()
        };
        store.update_profile(&s1.id, &patch).expect("update");

        let mut reloaded = DataStore::new(Box::new(kv.clone()), empty_options());
        assert!(reloaded.initialize());
        assert_eq!(reloaded.check_authentication().map(|u| u.id), Some(s1.id));
    }

    #[test]
    fn save_attendance_skips_unenrolled() {
        let kv = MemoryKv::new();
        let mut store = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(store.initialize());
        let rev = store.revision();
        let marks: BTreeMap<String, bool> = [
            ("s1".to_string(), false),
            ("s2".to_string(), true),
            ("s4".to_string(), true),
        ]
        .into_iter()
        .collect();
        let report = store
            .save_attendance("c101", d("2024-01-08"), &marks)
            .expect("save");
        assert_eq!(report.updated, 2);
        assert_eq!(report.skipped, vec!["s4".to_string()]);
        assert_eq!(store.revision(), rev + 1);
        let session = store
            .get_course_by_id("c101")
            .and_then(|c| c.session(d("2024-01-08")))
            .expect("session");
        assert_eq!(session.attendance["s1"], false);
        assert!(store
            .save_attendance("c101", d("1999-01-01"), &marks)
            .is_err());
    }

    #[test]
    fn replace_snapshot_rejects_duplicates_and_signs_out() {
        let kv = MemoryKv::new();
        let mut store = DataStore::new(Box::new(kv.clone()), StoreOptions::default());
        assert!(store.initialize());
        store
            .authenticate_user("kabir@student.com", seed::STUDENT_PASSWORD)
            .expect("login");
        let mut users = store.users().to_vec();
        users.push(users[0].clone());
        assert!(store
            .replace_snapshot(users, store.courses().to_vec())
            .is_err());

        let users = store.users()[..4].to_vec();
        store.replace_snapshot(users, Vec::new()).expect("replace");
        assert!(store.current_user().is_none());
        assert!(store.get_students().is_empty());
        assert!(store.courses().is_empty());
    }
}
