pub mod cv;
pub mod job;
pub mod preferences;
pub mod tier;
