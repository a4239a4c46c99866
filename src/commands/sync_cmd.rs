//! Sync CLI command for downloading survey responses.

use clap::Args;

use psytools_sync::config::Config;
use psytools_sync::rpc::ClientError;
use psytools_sync::sync::{connect, SurveyReport, SurveyStatus, Synchronizer};

/// Download responses of every survey
#[derive(Debug, Args, Default)]
pub struct SyncCommand {}

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        let synchronizer = Synchronizer::from_config(config);

        println!("Syncing with {}...", config.server_url.value);
        println!("Output: {}", synchronizer.output_dir().display());
        println!();

        let mut session = connect(config)?;
        let report = synchronizer.run(&mut session)?;
        session.release();

        for survey in &report.surveys {
            println!("  {}", describe(survey));
        }
        for entry in &report.malformed {
            println!("  ✗ skipped   {}", entry);
        }

        println!();
        println!(
            "{} written, {} unchanged, {} failed.",
            report.written(),
            report.unchanged(),
            report.failed()
        );

        Ok(())
    }
}

fn describe(report: &SurveyReport) -> String {
    let dropped = if report.dropped > 0 {
        format!(
            " ({} response{} dropped)",
            report.dropped,
            if report.dropped == 1 { "" } else { "s" }
        )
    } else {
        String::new()
    };
    match &report.status {
        SurveyStatus::Written(path) => format!(
            "✓ written   {} → {}{}",
            report.survey.title,
            path.display(),
            dropped
        ),
        SurveyStatus::Unchanged(_) => format!("✓ unchanged {}{}", report.survey.title, dropped),
        SurveyStatus::Failed(e) => format!("✗ failed    {} - {}", report.survey.title, e),
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    SyncError(ClientError),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::SyncError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::SyncError(e) => Some(e),
        }
    }
}

impl From<ClientError> for SyncCommandError {
    fn from(e: ClientError) -> Self {
        SyncCommandError::SyncError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psytools_sync::models::Survey;
    use std::path::PathBuf;

    fn report(status: SurveyStatus, dropped: usize) -> SurveyReport {
        SurveyReport {
            survey: Survey::new(1, "T1 - Baseline"),
            status,
            kept: 1,
            dropped,
        }
    }

    #[test]
    fn test_describe_written() {
        let line = describe(&report(
            SurveyStatus::Written(PathBuf::from("/out/T1-Baseline.json")),
            0,
        ));
        assert_eq!(line, "✓ written   T1 - Baseline → /out/T1-Baseline.json");
    }

    #[test]
    fn test_describe_dropped() {
        let line = describe(&report(
            SurveyStatus::Unchanged(PathBuf::from("/out/T1-Baseline.json")),
            2,
        ));
        assert_eq!(line, "✓ unchanged T1 - Baseline (2 responses dropped)");
    }

    #[test]
    fn test_describe_failed() {
        let line = describe(&report(SurveyStatus::Failed("Remote error".into()), 0));
        assert!(line.starts_with("✗ failed"));
    }

    #[test]
    fn test_error_source() {
        let err = SyncCommandError::from(ClientError::Authentication("denied".into()));
        assert_eq!(err.to_string(), "Authentication failed: denied");
        assert!(std::error::Error::source(&err).is_some());
    }
}
