//! Credit commands.

use clap::{Args, Subcommand};

use prodshot_cli::{print_info, print_success};

use super::{create_client, get_context, output};
use crate::Cli;

/// Browse and buy credit packs for the paid tier.
#[derive(Args)]
pub struct CreditsCommand {
    #[command(subcommand)]
    command: CreditsSubcommand,
}

#[derive(Subcommand)]
enum CreditsSubcommand {
    /// List the available packs
    Packs,
    /// Buy a pack
    Buy {
        /// Pack id (see 'prodshot credits packs')
        pack: String,
        /// Where the payment page returns after success (default: <base_url>/pricing?success=1)
        #[arg(long)]
        success_url: Option<String>,
        /// Where the payment page returns after cancelling (default: <base_url>/pricing)
        #[arg(long)]
        cancel_url: Option<String>,
    },
}

impl CreditsCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(&ctx)?;

        match &self.command {
            CreditsSubcommand::Packs => {
                let packs = client.credits().packs().await?;
                output(cli).write(&packs)
            }
            CreditsSubcommand::Buy {
                pack,
                success_url,
                cancel_url,
            } => {
                let pricing = format!("{}/pricing", client.base_url());
                let success_url = success_url
                    .clone()
                    .unwrap_or_else(|| format!("{}?success=1", pricing));
                let cancel_url = cancel_url.clone().unwrap_or(pricing);

                let result = client
                    .credits()
                    .purchase(pack, &success_url, &cancel_url)
                    .await?;
                if let Some(url) = &result.checkout_url {
                    print_info(&format!("Complete the payment at {}", url));
                } else if let Some(added) = result.credits_added {
                    print_success(&format!("Added {} credits", added));
                }
                output(cli).write(&result)
            }
        }
    }
}
