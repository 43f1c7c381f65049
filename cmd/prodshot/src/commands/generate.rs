//! Generation command: upload, submit, wait, print.

use clap::Args;
use serde::Serialize;

use prodshot_cli::{print_info, print_success};
use prodshot_client::{AspectRatio, Navigation, Phase, SourceFile, ViewState, SIGNUP_REDIRECT_DELAY};
use tracing::debug;

use super::{create_client, get_context, output, print_verbose};
use crate::Cli;

/// Generate a product photo from a source image and a prompt.
#[derive(Args)]
pub struct GenerateCommand {
    /// Source product image (JPEG or PNG)
    #[arg(long)]
    image: String,

    /// Scene description
    #[arg(long)]
    prompt: String,

    /// Output aspect ratio: 1:1, 4:5 or 16:9
    #[arg(long, default_value = "1:1", value_parser = parse_aspect_ratio)]
    aspect_ratio: AspectRatio,
}

fn parse_aspect_ratio(s: &str) -> Result<AspectRatio, String> {
    AspectRatio::parse(s).ok_or_else(|| format!("unsupported aspect ratio {:?}, use 1:1, 4:5 or 16:9", s))
}

#[derive(Serialize)]
struct GenerateResult {
    phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ViewState> for GenerateResult {
    fn from(view: ViewState) -> Self {
        Self {
            phase: view.phase,
            job_id: view.job_id,
            result_url: view.result_url,
            error: view.error_message,
        }
    }
}

impl GenerateCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(&ctx)?;

        print_verbose(cli, &format!("Using context: {}", ctx.name));
        print_verbose(cli, &format!("Backend: {}", client.base_url()));
        print_verbose(
            cli,
            &format!("Tier: {}", if client.is_authenticated() { "paid" } else { "free" }),
        );

        let file = SourceFile::open(&self.image).await?;
        let session = client.session();
        let mut view = session.subscribe();

        session.select_file(file);
        let uploaded = tokio::select! {
            v = view.wait_for(|v| v.phase == Phase::Uploaded || v.upload_failed) => v?.clone(),
            _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted"),
        };
        if uploaded.upload_failed {
            anyhow::bail!(
                "upload failed: {}",
                uploaded.error_message.unwrap_or_default()
            );
        }
        print_success("Image uploaded");

        if let Err(e) = session.submit(&self.prompt, self.aspect_ratio).await {
            debug!("submit failed: {}", e);
            // Only anonymous sessions schedule the sign-up redirect.
            if e.is_quota_exceeded() && !client.is_authenticated() {
                let redirected = tokio::select! {
                    v = view.wait_for(|v| v.navigate_to == Some(Navigation::SignUp)) => v.is_ok(),
                    _ = tokio::time::sleep(SIGNUP_REDIRECT_DELAY * 2) => false,
                    _ = tokio::signal::ctrl_c() => false,
                };
                if redirected {
                    session.clear_navigation();
                    print_info("Free generations used up. Sign up with 'prodshot signup' or log in with 'prodshot login'.");
                }
            }
            return Err(anyhow::anyhow!(e.user_message()));
        }

        if let Some(job_id) = session.view().job_id {
            print_verbose(cli, &format!("Polling job {}", job_id));
        }

        let done = tokio::select! {
            v = view.wait_for(|v| {
                debug!("view: {} job={:?}", v.phase, v.job_id);
                v.phase.is_terminal()
            }) => v?.clone(),
            _ = tokio::signal::ctrl_c() => {
                session.close();
                anyhow::bail!("interrupted");
            }
        };

        if done.phase == Phase::Completed {
            print_success("Generation completed");
        }
        let failed = done.phase == Phase::Failed;
        let message = done.error_message.clone().unwrap_or_default();
        output(cli).write(&GenerateResult::from(done))?;

        if failed {
            anyhow::bail!("generation failed: {}", message);
        }
        Ok(())
    }
}
