//! Built-in output targets

pub mod console;
pub mod file;
pub mod file_backend;

pub use console::ConsoleTarget;
pub use file::FileTarget;
pub use file_backend::FileSinkBackend;
