// File-backed adapters for the collaborator ports

pub mod json_output;
pub mod json_source;

pub use json_output::JsonFileOutput;
pub use json_source::JsonFileSource;
