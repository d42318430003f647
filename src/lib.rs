pub mod configuration;
pub use configuration::{CliArgs, Config};

pub mod error_handling;

pub mod logging;

pub mod report;

pub mod storage;

pub mod task_management;

pub mod validation;

pub mod web_interface;
pub use web_interface::WebServer;
