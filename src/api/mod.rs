pub mod error;
pub mod proxy;
pub mod remove_bg;
pub mod server;
pub mod session;
