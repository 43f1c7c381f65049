//! prodshot CLI - generate product photos from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    ConfigCommand, CreditsCommand, DeviceCommand, GenerateCommand, HistoryCommand, LoginCommand,
    LogoutCommand, MeCommand, ProxyCommand, SignupCommand, VerifyCommand,
};

/// prodshot CLI - generate product photos from the command line.
///
/// Upload a product image, describe the scene, and get back a studio-quality
/// shot. Without an auth token the free tier is used, limited per device.
///
/// Configuration is stored in ~/.prodshot/prodshot/ and supports multiple
/// contexts, similar to kubectl's context management.
#[derive(Parser)]
#[command(name = "prodshot")]
#[command(about = "prodshot product photo generator")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.prodshot/prodshot/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Generate a product photo
    Generate(GenerateCommand),
    /// List past generations
    History(HistoryCommand),
    /// Show the signed-in account
    Me(MeCommand),
    /// Log in and save the token to the context
    Login(LoginCommand),
    /// Create an account
    Signup(SignupCommand),
    /// Confirm the e-mailed sign-up code
    Verify(VerifyCommand),
    /// Log out and forget the saved token
    Logout(LogoutCommand),
    /// Browse and buy credit packs
    Credits(CreditsCommand),
    /// Show the anonymous device id
    Device(DeviceCommand),
    /// Serve generated images from a local origin
    Proxy(ProxyCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Generate(cmd) => cmd.run(&cli).await,
        Commands::History(cmd) => cmd.run(&cli).await,
        Commands::Me(cmd) => cmd.run(&cli).await,
        Commands::Login(cmd) => cmd.run(&cli).await,
        Commands::Signup(cmd) => cmd.run(&cli).await,
        Commands::Verify(cmd) => cmd.run(&cli).await,
        Commands::Logout(cmd) => cmd.run(&cli).await,
        Commands::Credits(cmd) => cmd.run(&cli).await,
        Commands::Device(cmd) => cmd.run(&cli).await,
        Commands::Proxy(cmd) => cmd.run(&cli).await,
    }
}
