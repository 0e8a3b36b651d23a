pub mod config;
pub mod gui;
pub mod lifecycle;
pub mod log;
pub mod transport;
