pub mod core;
pub mod grid;
pub mod reports;
pub mod session;
pub mod students;
