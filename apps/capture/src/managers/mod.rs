pub mod capture_manager;
pub mod session;
