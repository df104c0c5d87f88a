//! Tournament attendance: entrants, their backers and stake collection.

pub mod manager;
pub mod models;

pub use manager::AttendanceManager;
pub use models::{Attendance, JoinReceipt, JoinRequest};
