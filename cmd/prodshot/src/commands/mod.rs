//! CLI commands module.

mod account;
mod auth;
mod config;
mod credits;
mod device;
mod generate;
mod proxy;
mod util;

pub use account::{HistoryCommand, MeCommand};
pub use auth::{LoginCommand, LogoutCommand, SignupCommand, VerifyCommand};
pub use config::ConfigCommand;
pub use credits::CreditsCommand;
pub use device::DeviceCommand;
pub use generate::GenerateCommand;
pub use proxy::ProxyCommand;

pub(crate) use util::*;
