pub mod ease;
pub mod stat;
pub mod timeline;
