pub mod project;
pub mod screen;
pub mod upload;
pub mod workflow;
