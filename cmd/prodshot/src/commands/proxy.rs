//! Image proxy command.

use clap::Args;

use super::{get_context, print_verbose};
use crate::Cli;

/// Serve generated images from a local origin.
///
/// GET /images/generated/<path> is fetched from <backend>/storage/<path>.
#[derive(Args)]
pub struct ProxyCommand {
    /// Listen address, e.g. :3000 or 127.0.0.1:3000
    #[arg(long, default_value = ":3000")]
    addr: String,

    /// Backend base URL (defaults to the context's)
    #[arg(long)]
    backend: Option<String>,
}

impl ProxyCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let backend = match &self.backend {
            Some(url) => url.clone(),
            None => get_context(cli)?.effective_base_url().to_string(),
        };
        print_verbose(cli, &format!("Proxying to {}", backend));

        eprintln!("Image proxy started at {}", self.addr);
        eprintln!("  - GET /images/generated/<path>  -> {}/storage/<path>", backend.trim_end_matches('/'));
        prodshot_proxy::serve(&self.addr, &backend).await
    }
}
