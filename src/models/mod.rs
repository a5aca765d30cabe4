pub mod announcement;
pub mod auth;
pub mod booking;
pub mod user;
