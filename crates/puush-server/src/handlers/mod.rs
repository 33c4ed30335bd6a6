pub mod file;
pub mod list;
pub mod session;
pub mod upload;
