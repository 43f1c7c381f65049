//! Utility functions for CLI commands.

use std::io::{self, BufRead, Write};

use prodshot_cli::{load_config, Config, Context, Output, OutputFormat, Paths};
use prodshot_client::{Client, DeviceId, DeviceIdentity, FileDeviceStore};

use crate::Cli;

pub const APP_NAME: &str = "prodshot";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Gets the context to use.
///
/// With no context requested and none current, an anonymous context against
/// the default backend is used.
pub fn get_context(cli: &Cli) -> anyhow::Result<Context> {
    let cfg = get_config(cli)?;

    if let Some(ctx) = cfg.resolve_context(cli.context.as_deref()) {
        return Ok(ctx.clone());
    }
    match cli.context.as_deref() {
        Some(name) if !name.is_empty() => anyhow::bail!("context '{}' not found", name),
        _ => Ok(Context {
            name: "(default)".to_string(),
            ..Default::default()
        }),
    }
}

/// Loads or creates the persisted device id.
pub fn device_id() -> anyhow::Result<DeviceId> {
    let paths = Paths::new(APP_NAME)?;
    let identity = DeviceIdentity::new(FileDeviceStore::new(paths.device_id_file()));
    Ok(identity.get_or_create())
}

/// Creates a prodshot client from context configuration.
pub fn create_client(ctx: &Context) -> anyhow::Result<Client> {
    Ok(ctx.client_builder().device_id(device_id()?).build()?)
}

/// Returns the output writer selected by the global flags.
pub fn output(cli: &Cli) -> Output {
    Output::new(OutputFormat::from_json_flag(cli.json), cli.output.clone())
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Prompts on stderr and reads one line from stdin.
pub fn read_secret(prompt: &str) -> anyhow::Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        anyhow::bail!("no input given");
    }
    Ok(secret)
}
