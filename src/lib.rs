pub mod capture;
pub mod config;
pub mod detect;
pub mod monitor;
pub mod notify;
