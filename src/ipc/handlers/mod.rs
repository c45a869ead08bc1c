pub mod auth;
pub mod core;
pub mod instructor;
pub mod profile;
pub mod queries;
pub mod snapshot;
pub mod student;
