use attendance::{ClientAddress, Submission, SubmissionOutcome};
use clap::Args;
use std::net::IpAddr;

use crate::context::CliContext;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct SubmitArgs {
    /// Identity key of the person submitting
    #[arg(short, long)]
    pub identity: String,

    /// Display name of the person submitting
    #[arg(short, long)]
    pub name: String,

    /// Forwarding chain as received (comma-separated, origin first)
    #[arg(long, value_name = "CHAIN")]
    pub forwarded_for: Option<String>,

    /// Single client address header value
    #[arg(long, value_name = "ADDRESS")]
    pub real_ip: Option<String>,

    /// Transport-level peer address
    #[arg(long, value_name = "IP")]
    pub peer: Option<IpAddr>,
}

impl SubmitArgs {
    fn client_address(&self) -> ClientAddress {
        ClientAddress {
            forwarded_for: self.forwarded_for.clone(),
            real_ip: self.real_ip.clone(),
            peer: self.peer,
        }
    }
}

pub async fn execute(ctx: &mut CliContext, args: SubmitArgs) -> anyhow::Result<()> {
    let formatter = ctx.formatter();
    let submission = Submission::new(args.identity.clone(), args.name.clone(), args.client_address());
    let outcome = ctx.service()?.submit(submission).await?;

    if formatter.format() == OutputFormat::Json {
        formatter.json(&outcome);
        return Ok(());
    }
    print_outcome(ctx, &outcome);
    Ok(())
}

fn print_outcome(ctx: &CliContext, outcome: &SubmissionOutcome) {
    let formatter = ctx.formatter();
    if outcome.already_marked {
        formatter.warning(&format!(
            "Already marked present today at {}; nothing recorded",
            outcome.timestamp.format("%H:%M:%S")
        ));
    } else {
        formatter.success(&format!("Recorded {}", outcome.status));
    }
    formatter.kv("Status", outcome.status.as_str());
    formatter.kv("Reason", outcome.reason_code.as_str());
    formatter.kv("Address", &outcome.observed_address);
    formatter.kv(
        "Expected",
        outcome.expected_address.as_deref().unwrap_or("(none)"),
    );
    formatter.kv("Private", &outcome.is_private.to_string());
    formatter.kv("Proxied", &outcome.is_proxied.to_string());
    formatter.kv("Timestamp", &outcome.timestamp.to_rfc3339());
    if outcome.degraded {
        formatter.warning("Tabular store write failed; record kept in document store only");
    }
}
