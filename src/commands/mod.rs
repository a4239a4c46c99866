mod config_cmd;
mod surveys;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use surveys::SurveysCommand;
pub use sync_cmd::{SyncCommand, SyncCommandError};
