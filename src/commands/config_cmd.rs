use clap::{Args, Subcommand, ValueEnum};

use psytools_sync::config::Config;

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print!("{}", render_text(config)),
                }
                Ok(())
            }
        }
    }
}

fn render_text(config: &Config) -> String {
    let mut out = String::from("Configuration\n=============\n\n");

    match &config.config_file {
        Some(path) => out.push_str(&format!("Config file: {}\n\n", path.display())),
        None => out.push_str(&format!(
            "Config file: {} (not found)\n\n",
            Config::default_config_path().display()
        )),
    }

    out.push_str(&format!(
        "server_url: {}\n  source: {}\n\n",
        config.server_url.value, config.server_url.source
    ));
    out.push_str(&format!(
        "output_dir: {}\n  source: {}\n\n",
        config.output_dir.value.display(),
        config.output_dir.source
    ));
    out.push_str(&format!(
        "credentials_file: {}\n  source: {}\n\n",
        config.credentials_file.value.display(),
        config.credentials_file.source
    ));
    out.push_str(&format!(
        "identifier_attribute: {}\nresponse_status: {}\nlanguage: {}\nparticipant_limit: {}\n",
        config.identifier_attribute,
        config.response_status,
        config.language,
        config.participant_limit
    ));
    out
}
