//! Demo data loaded into an empty workspace.

use chrono::NaiveDate;

use crate::error::AppResult;
use crate::model::{ClassSession, Course, Profile, ScheduleSlot, User};
use crate::password::hash_password;

pub const TEACHER_PASSWORD: &str = "teacher123";
pub const ASSISTANT_PASSWORD: &str = "assistant123";
pub const STUDENT_PASSWORD: &str = "student123";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn user(
    id: &str,
    name: &str,
    email: &str,
    password: &str,
    joined: NaiveDate,
    profile: Profile,
) -> AppResult<User> {
    Ok(User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        join_date: joined,
        profile,
    })
}

fn slot(day: &str, time: &str) -> ScheduleSlot {
    ScheduleSlot {
        day: day.to_string(),
        time: time.to_string(),
    }
}

fn session(date: NaiveDate, topic: &str, present: &[(&str, bool)]) -> ClassSession {
    ClassSession {
        date,
        topic: topic.to_string(),
        attendance: present.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
    }
}

pub fn fixture_users() -> AppResult<Vec<User>> {
    vec![
        user(
            "t1",
            "Arjun Mehta",
            "arjun@codingblocks.com",
            TEACHER_PASSWORD,
            date(2020, 6, 1),
            Profile::Teacher {
                specialization: "Web Development".into(),
                experience: 8,
            },
        ),
        user(
            "t2",
            "Neha Kapoor",
            "neha@codingblocks.com",
            TEACHER_PASSWORD,
            date(2021, 1, 15),
            Profile::Teacher {
                specialization: "Data Structures".into(),
                experience: 5,
            },
        ),
        user(
            "a1",
            "Rohan Gupta",
            "rohan@codingblocks.com",
            ASSISTANT_PASSWORD,
            date(2022, 7, 10),
            Profile::Assistant {
                specialization: "JavaScript".into(),
                experience: 2,
            },
        ),
        user(
            "a2",
            "Isha Verma",
            "isha@codingblocks.com",
            ASSISTANT_PASSWORD,
            date(2023, 2, 1),
            Profile::Assistant {
                specialization: "Algorithms".into(),
                experience: 1,
            },
        ),
        user(
            "s1",
            "Kabir Singh",
            "kabir@student.com",
            STUDENT_PASSWORD,
            date(2023, 8, 1),
            Profile::Student {
                age: 20,
                college: "Delhi Technological University".into(),
            },
        ),
        user(
            "s2",
            "Ananya Rao",
            "ananya@student.com",
            STUDENT_PASSWORD,
            date(2023, 8, 3),
            Profile::Student {
                age: 21,
                college: "NSUT".into(),
            },
        ),
        user(
            "s3",
            "Vikram Joshi",
            "vikram@student.com",
            STUDENT_PASSWORD,
            date(2023, 9, 12),
            Profile::Student {
                age: 19,
                college: "IIIT Delhi".into(),
            },
        ),
        user(
            "s4",
            "Meera Nair",
            "meera@student.com",
            STUDENT_PASSWORD,
            date(2023, 9, 20),
            Profile::Student {
                age: 22,
                college: "Jamia Millia Islamia".into(),
            },
        ),
    ]
    .into_iter()
    .collect()
}

pub fn fixture_courses() -> Vec<Course> {
    vec![
        Course {
            id: "c101".into(),
            name: "Full Stack Web Development".into(),
            description: "HTML, CSS, JavaScript, Node.js and databases.".into(),
            teacher_id: Some("t1".into()),
            assistant_ids: vec!["a1".into()],
            student_ids: vec!["s1".into(), "s2".into(), "s3".into()],
            start_date: date(2024, 1, 8),
            end_date: date(2024, 4, 29),
            schedule: vec![slot("Monday", "18:00"), slot("Thursday", "18:00")],
            calendar: vec![
                session(
                    date(2024, 1, 8),
                    "Introduction to the Web",
                    &[("s1", true), ("s2", true), ("s3", false)],
                ),
                session(
                    date(2024, 1, 11),
                    "HTML Fundamentals",
                    &[("s1", true), ("s2", false), ("s3", true)],
                ),
                session(
                    date(2024, 1, 15),
                    "CSS Layout",
                    &[("s1", false), ("s2", true), ("s3", true)],
                ),
            ],
        },
        Course {
            id: "c102".into(),
            name: "Data Structures and Algorithms".into(),
            description: "Arrays, linked lists, trees, graphs and dynamic programming.".into(),
            teacher_id: Some("t2".into()),
            assistant_ids: vec!["a2".into()],
            student_ids: vec!["s2".into(), "s4".into()],
            start_date: date(2024, 2, 5),
            end_date: date(2024, 5, 27),
            schedule: vec![
                slot("Tuesday", "19:00"),
                slot("Friday", "19:00"),
                slot("Saturday", "11:00"),
            ],
            calendar: vec![session(
                date(2024, 2, 6),
                "Complexity Analysis",
                &[("s2", true), ("s4", true)],
            )],
        },
    ]
}
