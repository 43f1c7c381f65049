//! Configuration management commands.

use clap::{Args, Subcommand};

use prodshot_cli::{mask_token, print_success, Context as CliContext};

use super::get_config;
use crate::Cli;

/// Manage CLI configuration.
///
/// Contexts allow you to manage multiple backends and accounts,
/// similar to kubectl's context management.
///
/// Configuration is stored in ~/.prodshot/prodshot/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a new context
    #[command(name = "add-context")]
    AddContext {
        /// Context name
        name: String,
        /// Bearer token; omit for anonymous free-tier use
        #[arg(long)]
        auth_token: Option<String>,
        /// Backend base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Origin of the image proxy for absolute result URLs
        #[arg(long)]
        proxy_origin: Option<String>,
        /// Link result images straight to backend storage
        #[arg(long)]
        direct_images: bool,
        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        /// Give up polling after this many seconds
        #[arg(long)]
        max_poll_secs: Option<u64>,
    },
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext {
        /// Context name
        name: String,
    },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext {
        /// Context name
        name: String,
    },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "list-contexts", alias = "get-contexts")]
    ListContexts,
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddContext {
                name,
                auth_token,
                base_url,
                proxy_origin,
                direct_images,
                timeout,
                poll_interval_ms,
                max_poll_secs,
            } => {
                let mut cfg = get_config(cli)?;

                let ctx = CliContext {
                    auth_token: auth_token.clone().unwrap_or_default(),
                    base_url: base_url.clone().unwrap_or_default(),
                    proxy_origin: proxy_origin.clone().unwrap_or_default(),
                    direct_images: *direct_images,
                    timeout: timeout.unwrap_or(0),
                    poll_interval_ms: poll_interval_ms.unwrap_or(0),
                    max_poll_secs: max_poll_secs.unwrap_or(0),
                    ..Default::default()
                };
                // Reject unusable settings before they are saved.
                ctx.client_builder().build()?;

                cfg.add_context(name, ctx)?;
                print_success(&format!("Context \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetContext => {
                let cfg = get_config(cli)?;
                if cfg.current_context.is_empty() {
                    println!("No current context set");
                } else {
                    println!("{}", cfg.current_context);
                }
                Ok(())
            }

            ConfigSubcommand::ListContexts => {
                let cfg = get_config(cli)?;

                if cfg.contexts.is_empty() {
                    println!("No contexts configured");
                    return Ok(());
                }

                println!("{:<8} {:<20} {:<35} {}", "CURRENT", "NAME", "BASE_URL", "TIER");
                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.get_context(name) else {
                        continue;
                    };
                    let current = if name == cfg.current_context { "*" } else { "" };
                    let tier = if ctx.auth_token.is_empty() { "free" } else { "paid" };
                    println!(
                        "{:<8} {:<20} {:<35} {}",
                        current,
                        name,
                        ctx.effective_base_url(),
                        tier
                    );
                }

                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;

                println!("Config file: {}", cfg.path().display());
                println!("Current context: {}", cfg.current_context);
                println!("Contexts: {}", cfg.contexts.len());

                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.get_context(name) else {
                        continue;
                    };
                    println!("\n  {}:", name);
                    println!("    Base URL: {}", ctx.effective_base_url());
                    if ctx.auth_token.is_empty() {
                        println!("    Auth: anonymous (free tier)");
                    } else {
                        println!("    Auth Token: {}", mask_token(&ctx.auth_token));
                    }
                    if ctx.direct_images {
                        println!("    Images: direct");
                    } else if !ctx.proxy_origin.is_empty() {
                        println!("    Images: proxy via {}", ctx.proxy_origin);
                    }
                    if ctx.timeout > 0 {
                        println!("    Timeout: {}s", ctx.timeout);
                    }
                    if ctx.poll_interval_ms > 0 {
                        println!("    Poll Interval: {}ms", ctx.poll_interval_ms);
                    }
                    if ctx.max_poll_secs > 0 {
                        println!("    Max Poll: {}s", ctx.max_poll_secs);
                    }
                }

                Ok(())
            }
        }
    }
}
