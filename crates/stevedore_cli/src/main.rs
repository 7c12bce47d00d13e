//! stevedore CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Template error
//! - 5: Secret store error
//! - 6: Unknown region or cluster

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use commands::{Cli, CliError, Commands};
use config::Settings;
use stevedore_core::ResolveError;
use stevedore_spec::SpecError;
use stevedore_templates::TemplateError;
use stevedore_vault::VaultError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
    pub const SECRET_ERROR: u8 = 5;
    pub const UNKNOWN_TARGET: u8 = 6;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "stevedore=debug"
    } else if cli.quiet {
        "stevedore=warn"
    } else {
        "stevedore=info"
    };

    // stdout carries the resolved output, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", level)));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => match cli.command {
            Commands::Validate(args) => commands::validate::execute(args, &settings).await,
            Commands::Resolve(args) => commands::resolve::execute(args, &settings).await,
            Commands::Template(args) => commands::template::execute(args, &settings).await,
            Commands::Get(command) => commands::get::execute(command, &settings).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<ResolveError>() {
            return match err {
                ResolveError::Validation(spec) => spec_exit_code(spec),
                ResolveError::UnknownRegion(_)
                | ResolveError::UnknownTeam(_)
                | ResolveError::UnknownCluster { .. } => ExitCodes::UNKNOWN_TARGET,
                ResolveError::SecretUnavailable { .. } => ExitCodes::SECRET_ERROR,
                ResolveError::Template(_) => ExitCodes::TEMPLATE_ERROR,
            };
        }
        if let Some(err) = cause.downcast_ref::<SpecError>() {
            return spec_exit_code(err);
        }
        if cause.downcast_ref::<TemplateError>().is_some() {
            return ExitCodes::TEMPLATE_ERROR;
        }
        if cause.downcast_ref::<VaultError>().is_some() {
            return ExitCodes::SECRET_ERROR;
        }
        if cause.downcast_ref::<CliError>().is_some() {
            return ExitCodes::VALIDATION_FAILURE;
        }
    }
    ExitCodes::GENERAL_ERROR
}

fn spec_exit_code(err: &SpecError) -> u8 {
    match err {
        SpecError::NotFound(_) => ExitCodes::INVALID_ARGS,
        SpecError::Validation { .. } => ExitCodes::VALIDATION_FAILURE,
        SpecError::Io(_) => ExitCodes::GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    fn code<E>(err: E) -> u8
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let wrapped: anyhow::Result<()> = Err(err).context("while testing");
        categorize_error(&wrapped.unwrap_err())
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(code(ResolveError::UnknownRegion("staging".into())), ExitCodes::UNKNOWN_TARGET);
        assert_eq!(code(ResolveError::UnknownTeam("payments".into())), ExitCodes::UNKNOWN_TARGET);
        assert_eq!(
            code(ResolveError::UnknownCluster {
                region: "r".into(),
                cluster: "c".into()
            }),
            ExitCodes::UNKNOWN_TARGET
        );
        assert_eq!(
            code(ResolveError::SecretUnavailable {
                region: "r".into(),
                key: "K".into(),
                reason: "timeout".into()
            }),
            ExitCodes::SECRET_ERROR
        );
        assert_eq!(
            code(ResolveError::validation("version", "bad")),
            ExitCodes::VALIDATION_FAILURE
        );
        assert_eq!(
            code(TemplateError::NotLoaded("a.j2".into())),
            ExitCodes::TEMPLATE_ERROR
        );
        assert_eq!(code(VaultError::MissingToken), ExitCodes::SECRET_ERROR);
        assert_eq!(code(SpecError::NotFound(PathBuf::from("x"))), ExitCodes::INVALID_ARGS);
        assert_eq!(code(CliError::ValidationFailed(2)), ExitCodes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_unknown_errors_are_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
