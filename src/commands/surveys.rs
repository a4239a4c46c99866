use clap::Args;

use psytools_sync::config::Config;
use psytools_sync::sync::connect;

use super::SyncCommandError;

/// List surveys available on the server
#[derive(Debug, Args)]
pub struct SurveysCommand {}

impl SurveysCommand {
    pub fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        let mut session = connect(config)?;
        let entries = session.survey_entries()?;
        session.release();

        if entries.is_empty() {
            println!("No surveys found.");
            return Ok(());
        }
        for entry in entries {
            match entry {
                Ok(survey) => println!("▶ {} ▶ {}", survey.sid, survey.title),
                Err(e) => println!("✗ {}", e),
            }
        }
        Ok(())
    }
}
