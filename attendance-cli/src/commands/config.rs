use clap::Subcommand;

use crate::context::CliContext;
use crate::output::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Validate the effective configuration
    Validate,
}

pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> anyhow::Result<()> {
    let formatter = ctx.formatter();

    match command {
        ConfigCommand::Show => {
            if formatter.format() == OutputFormat::Json {
                formatter.json(&ctx.config);
                return Ok(());
            }
            let source = ctx
                .config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(defaults)".to_string());
            formatter.kv("Config file", &source);
            formatter.kv("Tabular store", &ctx.config.tabular_path().display().to_string());
            formatter.kv("Document store", &ctx.config.document_path().display().to_string());
            formatter.kv(
                "Default expected address",
                ctx.config.default_expected().unwrap_or("(none)"),
            );
            formatter.kv("Log filter", &ctx.config.log_filter);
        }
        ConfigCommand::Validate => {
            let warnings = ctx.config.validate()?;
            for warning in &warnings {
                formatter.warning(warning);
            }
            formatter.success("Configuration is valid");
        }
    }

    Ok(())
}
