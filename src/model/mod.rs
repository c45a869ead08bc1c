pub mod course;
pub mod user;

pub use course::{ClassSession, Course, CoursePatch, NewCourse, ScheduleSlot};
pub use user::{AttendanceSummary, Profile, Role, User};
