use attendance::{HistoryRow, ReportSource};
use clap::Args;

use crate::context::CliContext;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ReportArgs {
    /// Only show rows for this identity
    #[arg(short, long)]
    pub identity: Option<String>,
}

pub async fn execute(ctx: &mut CliContext, args: ReportArgs) -> anyhow::Result<()> {
    let formatter = ctx.formatter();
    let quiet = ctx.quiet;
    let service = ctx.service()?;

    let rows: Vec<HistoryRow> = match args.identity.as_deref() {
        Some(identity) => service.history_for(identity).await?,
        None => {
            let report = service.report().await?;
            if report.source == ReportSource::Document && !quiet {
                formatter
                    .warning("Tabular store unavailable or behind; showing document store records");
            }
            report.rows
        }
    };

    if formatter.format() == OutputFormat::Json {
        formatter.json(&rows);
        return Ok(());
    }
    if rows.is_empty() {
        formatter.success("No attendance records");
        return Ok(());
    }
    formatter.section("Attendance");
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.identity.clone(),
                row.display_name.clone(),
                row.date.clone(),
                row.time.clone(),
                row.observed_address.clone(),
                row.status.to_string(),
            ]
        })
        .collect();
    formatter.table(
        &["identity", "displayName", "date", "time", "address", "status"],
        &cells,
    );
    Ok(())
}
