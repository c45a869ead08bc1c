use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub day: String,
    pub time: String,
}

/// One held class: its date, topic and a present/absent flag per student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSession {
    pub date: NaiveDate,
    pub topic: String,
    pub attendance: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub assistant_ids: Vec<String>,
    #[serde(default)]
    pub student_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
    #[serde(default)]
    pub calendar: Vec<ClassSession>,
}

/// Fields a caller may replace on an existing course. `None` leaves the
/// current value in place; `id`, enrollment and calendar have their own
/// operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "double_option")]
    pub teacher_id: Option<Option<String>>,
    pub assistant_ids: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub schedule: Option<Vec<ScheduleSlot>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub assistant_ids: Vec<String>,
    #[serde(default)]
    pub student_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

// Distinguishes an absent `teacherId` from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(de).map(Some)
    }
}

/// Drops repeated ids, keeping the first occurrence.
fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

impl Course {
    pub fn from_new(id: String, new: NewCourse) -> Self {
        Course {
            id,
            assistant_ids: unique_ids(&new.assistant_ids),
            student_ids: unique_ids(&new.student_ids),
            name: new.name,
            description: new.description,
            teacher_id: new.teacher_id,
            start_date: new.start_date,
            end_date: new.end_date,
            schedule: new.schedule,
            calendar: Vec::new(),
        }
    }

    /// Copy with the patch applied; `self` is left untouched.
    pub fn patched(&self, patch: &CoursePatch) -> Course {
        let mut next = self.clone();
        if let Some(v) = &patch.name {
            next.name = v.clone();
        }
        if let Some(v) = &patch.description {
            next.description = v.clone();
        }
        if let Some(v) = &patch.teacher_id {
            next.teacher_id = v.clone();
        }
        if let Some(v) = &patch.assistant_ids {
            next.assistant_ids = unique_ids(v);
        }
        if let Some(v) = patch.start_date {
            next.start_date = v;
        }
        if let Some(v) = patch.end_date {
            next.end_date = v;
        }
        if let Some(v) = &patch.schedule {
            next.schedule = v.clone();
        }
        next
    }

    pub fn has_student(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|s| s == student_id)
    }

    pub fn planned_sessions(&self) -> usize {
        calc::planned_sessions(self.start_date, self.end_date, self.schedule.len())
    }

    /// Held sessions over planned sessions, clamped to [0, 100]. A course with
    /// no schedule or no calendar reports 0.
    pub fn calculate_progress(&self) -> u32 {
        if self.calendar.is_empty() {
            return 0;
        }
        calc::progress(self.calendar.len(), self.planned_sessions())
    }

    /// Appends a session with every enrolled student marked absent. Sessions on
    /// an existing date are kept side by side.
    pub fn add_class(&mut self, date: NaiveDate, topic: &str) -> &ClassSession {
        let attendance = self
            .student_ids
            .iter()
            .map(|sid| (sid.clone(), false))
            .collect();
        self.calendar.push(ClassSession {
            date,
            topic: topic.to_string(),
            attendance,
        });
        &self.calendar[self.calendar.len() - 1]
    }

    pub fn session(&self, date: NaiveDate) -> Option<&ClassSession> {
        self.calendar.iter().find(|s| s.date == date)
    }

    /// Sets one flag on the first session held on `date`. False when there is
    /// no such session or the student is not enrolled.
    pub fn mark_attendance(&mut self, date: NaiveDate, student_id: &str, present: bool) -> bool {
        if !self.has_student(student_id) {
            return false;
        }
        match self.calendar.iter_mut().find(|s| s.date == date) {
            Some(session) => {
                session.attendance.insert(student_id.to_string(), present);
                true
            }
            None => false,
        }
    }

    pub fn add_student(&mut self, student_id: &str) -> bool {
        if self.has_student(student_id) {
            return false;
        }
        self.student_ids.push(student_id.to_string());
        for session in &mut self.calendar {
            session.attendance.insert(student_id.to_string(), false);
        }
        true
    }

    pub fn remove_student(&mut self, student_id: &str) -> bool {
        let before = self.student_ids.len();
        self.student_ids.retain(|s| s != student_id);
        if self.student_ids.len() == before {
            return false;
        }
        for session in &mut self.calendar {
            session.attendance.remove(student_id);
        }
        true
    }
}
