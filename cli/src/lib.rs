//! Command-line support for prodshot.
//!
//! Contexts live in `~/.prodshot/<app>/config.yaml`, kubectl style.

pub mod config;
pub mod output;
pub mod paths;

pub use config::{load_config, mask_token, Config, Context, DEFAULT_CONTEXT};
pub use output::{print_error, print_info, print_success, Output, OutputFormat};
pub use paths::Paths;
