//! Built-in health checks for core systems

pub mod build_info;
pub mod config;
pub mod handlers;
pub mod input;

pub use build_info::BuildInfoCheck;
pub use config::ConfigCheck;
pub use handlers::HandlerLifecycleCheck;
pub use input::InputPipelineCheck;
