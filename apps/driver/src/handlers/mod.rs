pub mod images;
pub mod lint;
pub mod pipeline;
pub mod setup;
pub mod testing;
