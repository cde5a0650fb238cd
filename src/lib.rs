pub mod ai_gateway;
pub mod cli;
pub mod config;
pub mod logging;
pub mod secrets;
pub mod tutor;
