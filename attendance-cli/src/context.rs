//! CLI context - shared configuration and service for all commands

use attendance::{AttendanceConfig, AttendanceResult, AttendanceService};
use std::path::PathBuf;

use crate::output::{OutputFormat, OutputFormatter};

/// Shared context for CLI commands
pub struct CliContext {
    /// Path to the configuration file, when one was found
    pub config_path: Option<PathBuf>,
    /// Loaded configuration with environment overrides applied
    pub config: AttendanceConfig,
    /// Output format preference
    pub output_format: OutputFormat,
    /// Quiet mode (suppress status messages)
    pub quiet: bool,
    /// Service over the configured stores (lazy initialized)
    service: Option<AttendanceService>,
}

impl CliContext {
    /// Create a new CLI context from a configuration path
    pub fn new(config_path: PathBuf) -> AttendanceResult<Self> {
        let config = AttendanceConfig::load(&config_path)?.with_env_overrides();
        Ok(Self {
            config_path: Some(config_path),
            config,
            output_format: OutputFormat::Table,
            quiet: false,
            service: None,
        })
    }

    /// Create context from the first default configuration file found
    pub fn with_defaults() -> AttendanceResult<Self> {
        let default_paths = [
            PathBuf::from("config/attendance.toml"),
            PathBuf::from("attendance.toml"),
        ];

        for path in &default_paths {
            if path.exists() {
                return Self::new(path.clone());
            }
        }

        Ok(Self {
            config_path: None,
            config: AttendanceConfig::default().with_env_overrides(),
            output_format: OutputFormat::Table,
            quiet: false,
            service: None,
        })
    }

    /// Get or open the attendance service
    pub fn service(&mut self) -> AttendanceResult<&AttendanceService> {
        let service = match self.service.take() {
            Some(service) => service,
            None => AttendanceService::open(&self.config)?,
        };
        Ok(self.service.insert(service))
    }

    pub fn formatter(&self) -> OutputFormatter {
        OutputFormatter::new(self.output_format)
    }

    /// Print status message (respects quiet mode)
    pub fn status(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }
}
