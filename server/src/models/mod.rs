pub mod dataset;
pub mod ids;
pub mod job;
