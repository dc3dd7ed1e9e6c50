pub mod api;
pub mod config;
pub mod design;
pub mod error;
pub mod forms;
pub mod jobserver;
pub mod server;
pub mod shutdown;
