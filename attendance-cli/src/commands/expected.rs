use attendance::AddressSource;
use clap::Subcommand;

use crate::context::CliContext;
use crate::output::OutputFormat;

#[derive(Subcommand)]
pub enum ExpectedCommand {
    /// Set the expected address for an identity (overwrites)
    Set {
        /// Identity key
        identity: String,

        /// Expected address
        address: String,
    },

    /// Show the effective expected address for an identity
    Get {
        /// Identity key
        identity: String,
    },

    /// List all per-identity expected addresses
    List,
}

pub async fn execute(ctx: &mut CliContext, command: ExpectedCommand) -> anyhow::Result<()> {
    let formatter = ctx.formatter();
    let service = ctx.service()?;

    match command {
        ExpectedCommand::Set { identity, address } => {
            let entry = service.set_expected(&identity, &address).await?;
            if formatter.format() == OutputFormat::Json {
                formatter.json(&entry);
            } else {
                formatter.success(&format!(
                    "Expected address for {} set to {}",
                    entry.identity, entry.expected_address
                ));
            }
        }
        ExpectedCommand::Get { identity } => {
            let effective = service.expected_for(&identity).await?;
            match (formatter.format(), effective) {
                (OutputFormat::Json, effective) => formatter.json(&effective),
                (_, Some(effective)) => {
                    formatter.kv("Identity", &identity);
                    formatter.kv("Expected", &effective.expected_address);
                    let source = match effective.source {
                        AddressSource::Identity => "identity entry",
                        AddressSource::Default => "process default",
                    };
                    formatter.kv("Source", source);
                }
                (_, None) => {
                    formatter.warning(&format!("No expected address configured for {}", identity))
                }
            }
        }
        ExpectedCommand::List => {
            let entries = service.list_expected().await?;
            if formatter.format() == OutputFormat::Json {
                formatter.json(&entries);
            } else if entries.is_empty() {
                formatter.success("No expected addresses configured");
            } else {
                formatter.section("Expected Addresses");
                let rows: Vec<Vec<String>> = entries
                    .iter()
                    .map(|e| {
                        vec![
                            e.identity.clone(),
                            e.expected_address.clone(),
                            e.updated_at.to_rfc3339(),
                        ]
                    })
                    .collect();
                formatter.table(&["identity", "expectedAddress", "updatedAt"], &rows);
            }
        }
    }

    Ok(())
}
