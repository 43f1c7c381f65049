//! Account commands: login, signup, verify, logout.

use clap::Args;
use tracing::info;

use prodshot_cli::{print_info, print_success};
use prodshot_client::{AuthToken, SignupOutcome};

use super::{create_client, get_config, get_context, print_verbose, read_secret};
use crate::Cli;

/// Log in and store the token in the context.
#[derive(Args)]
pub struct LoginCommand {
    /// Account e-mail
    #[arg(long)]
    email: String,

    /// Password; read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
}

impl LoginCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        print_verbose(cli, &format!("Backend: {}", ctx.effective_base_url()));

        let password = match &self.password {
            Some(p) => p.clone(),
            None => read_secret("Password: ")?,
        };
        let client = create_client(&ctx)?;
        let token = client.auth().login(&self.email, &password).await?;
        store_token(cli, &token)
    }
}

/// Create an account.
///
/// Depending on the backend the account is usable right away, or a code is
/// mailed first; confirm it with 'prodshot verify'.
#[derive(Args)]
pub struct SignupCommand {
    /// Account e-mail
    #[arg(long)]
    email: String,

    /// Password; read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
}

impl SignupCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let (password, repeated) = match &self.password {
            Some(p) => (p.clone(), p.clone()),
            None => (read_secret("Password: ")?, read_secret("Repeat password: ")?),
        };

        let client = create_client(&ctx)?;
        match client.auth().signup(&self.email, &password, &repeated).await? {
            SignupOutcome::SignedIn(token) => store_token(cli, &token),
            SignupOutcome::VerificationRequired { email, .. } => {
                print_info(&format!(
                    "A code was sent to {}. Confirm it with 'prodshot verify --email {} --otp <code>'.",
                    email, email
                ));
                Ok(())
            }
        }
    }
}

/// Confirm the e-mailed sign-up code.
#[derive(Args)]
pub struct VerifyCommand {
    /// Account e-mail
    #[arg(long)]
    email: String,

    /// Six-digit code from the e-mail
    #[arg(long, required_unless_present = "resend")]
    otp: Option<String>,

    /// Mail a new code instead
    #[arg(long)]
    resend: bool,
}

impl VerifyCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(&ctx)?;

        if self.resend {
            client.auth().resend_otp(&self.email).await?;
            print_success(&format!("New code sent to {}", self.email));
            return Ok(());
        }

        let otp = self.otp.as_deref().unwrap_or_default();
        let token = client.auth().verify_otp(&self.email, otp).await?;
        store_token(cli, &token)
    }
}

/// Log out and forget the stored token.
#[derive(Args)]
pub struct LogoutCommand {}

impl LogoutCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        if ctx.auth_token.is_empty() {
            print_info("Not logged in");
            return Ok(());
        }

        let client = create_client(&ctx)?;
        if let Err(e) = client.auth().logout().await {
            // The token is dropped locally either way.
            print_verbose(cli, &format!("logout request failed: {}", e));
        }

        let mut cfg = get_config(cli)?;
        if let Some(name) = cfg.clear_auth_token(cli.context.as_deref())? {
            print_success(&format!("Logged out of context \"{}\"", name));
        }
        Ok(())
    }
}

fn store_token(cli: &Cli, token: &AuthToken) -> anyhow::Result<()> {
    let mut cfg = get_config(cli)?;
    let name = cfg.set_auth_token(cli.context.as_deref(), &token.access_token)?;
    info!("stored token in context {}", name);
    print_success(&format!("Logged in; token saved to context \"{}\"", name));
    Ok(())
}
