use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::course::Course;
use crate::calc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Assistant,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Assistant => "assistant",
            Role::Student => "student",
        }
    }

    pub fn is_instructor(&self) -> bool {
        matches!(self, Role::Teacher | Role::Assistant)
    }
}

/// Role-specific fields. The variant is fixed when the user is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
    Teacher {
        specialization: String,
        experience: u32,
    },
    Assistant {
        specialization: String,
        experience: u32,
    },
    Student {
        age: u32,
        college: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub join_date: NaiveDate,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub percentage: u32,
    pub attended: usize,
    pub total: usize,
}

impl User {
    pub fn role(&self) -> Role {
        match self.profile {
            Profile::Teacher { .. } => Role::Teacher,
            Profile::Assistant { .. } => Role::Assistant,
            Profile::Student { .. } => Role::Student,
        }
    }

    /// Teacher of record or a listed assistant.
    pub fn can_manage_course(&self, course: &Course) -> bool {
        match self.profile {
            Profile::Teacher { .. } => course.teacher_id.as_deref() == Some(self.id.as_str()),
            Profile::Assistant { .. } => course.assistant_ids.iter().any(|a| a == &self.id),
            Profile::Student { .. } => false,
        }
    }

    /// Only the teacher of record may change a course's structure or delete it.
    pub fn can_edit_course_structure(&self, course: &Course) -> bool {
        matches!(self.profile, Profile::Teacher { .. })
            && course.teacher_id.as_deref() == Some(self.id.as_str())
    }

    /// Sessions this student was marked present for, over every session in the
    /// course calendar. Non-students and students outside the course get zeros.
    pub fn calculate_attendance(&self, course: &Course) -> AttendanceSummary {
        if !matches!(self.profile, Profile::Student { .. }) || !course.has_student(&self.id) {
            return AttendanceSummary::default();
        }
        let total = course.calendar.len();
        let attended = course
            .calendar
            .iter()
            .filter(|s| s.attendance.get(&self.id).copied().unwrap_or(false))
            .count();
        AttendanceSummary {
            percentage: calc::percent(attended, total),
            attended,
            total,
        }
    }

    /// Read-only projection without the credential hash.
    pub fn public_json(&self) -> serde_json::Value {
        let mut v = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = v.as_object_mut() {
            obj.remove("passwordHash");
        }
        v
    }
}
