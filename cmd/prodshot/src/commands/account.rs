//! Account commands.

use clap::Args;

use prodshot_client::DEFAULT_PAGE_SIZE;

use super::{create_client, get_context, output, print_verbose};
use crate::Cli;

/// Show the signed-in account.
#[derive(Args)]
pub struct MeCommand {}

impl MeCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        print_verbose(cli, &format!("Using context: {}", ctx.name));

        let client = create_client(&ctx)?;
        let me = client.user().me().await?;
        output(cli).write(&me)
    }
}

/// List past generations, newest first.
#[derive(Args)]
pub struct HistoryCommand {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Items per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

impl HistoryCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        print_verbose(cli, &format!("Using context: {}", ctx.name));

        let client = create_client(&ctx)?;
        let history = client.user().generations(self.page, self.page_size).await?;
        print_verbose(
            cli,
            &format!("{} of {} generations", history.items.len(), history.total),
        );
        output(cli).write(&history)
    }
}
