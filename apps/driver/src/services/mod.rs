pub mod docker;
pub mod license;
pub mod runner;
pub mod version;
