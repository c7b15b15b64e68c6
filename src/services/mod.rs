pub mod agent;
pub mod ai;
pub mod appointments;
pub mod classifier;
pub mod datetime;
pub mod directory;
pub mod extractor;
pub mod resolver;
pub mod scheduling;
