pub mod classifier;
pub mod commitments;
pub mod models;
pub mod timeline;
