pub mod api;
pub mod cache;
pub mod config;
pub mod events;
pub mod expander;
pub mod logging;
pub mod navigation;
pub mod reference;
pub mod sanitize;
pub mod session;
pub mod table;
pub mod types;

pub use types::*;
