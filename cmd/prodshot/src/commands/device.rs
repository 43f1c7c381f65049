//! Device id command.

use clap::Args;

use prodshot_cli::Paths;

use super::{device_id, print_verbose, APP_NAME};
use crate::Cli;

/// Show the anonymous device id the free tier is counted against.
///
/// The id is created on first use and kept in ~/.prodshot/prodshot/data/device_id.
#[derive(Args)]
pub struct DeviceCommand {}

impl DeviceCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let id = device_id()?;
        print_verbose(
            cli,
            &format!("Stored in {}", Paths::new(APP_NAME)?.device_id_file().display()),
        );
        println!("{}", id);
        Ok(())
    }
}
