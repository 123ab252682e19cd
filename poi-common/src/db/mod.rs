//! Database models and queries

pub mod init;
pub mod models;
pub mod pois;

pub use init::*;
pub use models::*;
pub use pois::*;
