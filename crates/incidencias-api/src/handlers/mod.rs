pub mod report;
pub mod root;
pub mod status;
