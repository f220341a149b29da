use crate::diagnostics::DiagnosticsConfig;
use clap::Parser;
use config_rs::{Config, ConfigError, File};
use multilog_common_logger::LoggerConfiguration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[clap(rename_all = "kebab-case")]
pub struct Conf {
    /// An optional TOML file with the [diagnostics] and [logger] sections
    #[clap(long)]
    pub config_file: Option<String>,

    /// The folder where the log files are written; overrides the config file
    #[clap(long)]
    pub log_dir: Option<String>,

    /// The minimum level of the loggers; overrides the config file
    #[clap(long)]
    pub log_level: Option<String>,

    /// Finish with a halting fatal message instead of returning normally
    #[clap(long)]
    pub halt: bool,

    /// The exit code used by the halting fatal message
    #[clap(long, default_value = "-1", allow_hyphen_values = true)]
    pub exit_code: i32,
}

impl Conf {
    pub fn build() -> Result<Self, clap::Error> {
        Conf::try_parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelftestConfig {
    pub diagnostics: DiagnosticsConfig,

    /// Shared by both runs; each run sets its own format, raw file and channel name.
    pub logger: LoggerConfiguration,
}

impl Default for SelftestConfig {
    fn default() -> Self {
        Self {
            diagnostics: DiagnosticsConfig::default(),
            logger: LoggerConfiguration {
                log_dir: "test_logs".to_owned(),
                ..LoggerConfiguration::default()
            },
        }
    }
}

pub fn build_config(config_file_path: &str) -> Result<SelftestConfig, ConfigError> {
    let mut s = Config::new();
    s.merge(File::with_name(config_file_path))?;
    s.try_into()
}
