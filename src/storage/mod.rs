pub mod backend;
pub mod file;
