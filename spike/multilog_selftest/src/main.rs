pub mod config;
pub mod diagnostics;
pub mod error;

use crate::config::{build_config, Conf, SelftestConfig};
use crate::error::SelftestError;
use log::*;
use multilog_common_logger::format::TIMESTAMPED_FORMAT;
use multilog_common_logger::{
    AggregateFileLogger, Log, LoggerConfiguration, PerLevelFileLogger, DEFAULT_EXIT_CODE,
};

fn main() -> Result<(), SelftestError> {
    let conf = match Conf::build() {
        Ok(conf) => conf,
        // --help and --version are reported by clap as errors
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => return Err(err.into()),
    };

    let mut selftest_config = match &conf.config_file {
        Some(path) => build_config(path)?,
        None => SelftestConfig::default(),
    };
    if let Some(log_dir) = &conf.log_dir {
        selftest_config.logger.log_dir = log_dir.clone();
    }
    if let Some(log_level) = &conf.log_level {
        selftest_config.logger.log_level = log_level.clone();
    }

    diagnostics::setup_diagnostics(&selftest_config.diagnostics)?;

    let base = selftest_config.logger;
    let resolution = base.level_resolution();
    if !resolution.recognized {
        warn!("Selftest - level [{}] is not recognized, nothing will be filtered", base.log_level);
    }

    {
        let logger = PerLevelFileLogger::new(LoggerConfiguration {
            log_format: TIMESTAMPED_FORMAT.to_owned(),
            log_to_raw: true,
            logger_name: "Multi".to_owned(),
            halt_on_failure: false,
            ..base.clone()
        })?;
        exercise(&logger);
        logger.fatal("test fatal -- you should *not* see an exit line after this.");
        info!("Selftest - per-level files: {:?}", logger.log_files());
    }

    let mut logger = AggregateFileLogger::new(LoggerConfiguration {
        log_format: TIMESTAMPED_FORMAT.to_owned(),
        logger_name: "Simple".to_owned(),
        halt_on_failure: conf.halt,
        ..base.clone()
    })?;
    exercise(&logger);
    info!("Selftest - aggregate files: {:?}", logger.log_files());

    if conf.halt {
        logger.fatal_with_code(
            "test fatal -- you should see an exit line after this.",
            conf.exit_code,
        );
    }
    logger.shutdown()?;

    info!("Selftest - you should be able to examine [{}]", base.log_dir);
    Ok(())
}

fn exercise<L: Log>(logger: &L) {
    logger.log("YOU SHOULD NOT SEE THIS LINE", "debug", DEFAULT_EXIT_CODE);
    for level in &["info", "warning", "error", "critical"] {
        logger.log(&format!("test {}", level), level, DEFAULT_EXIT_CODE);
    }
    logger.warn("test warn -- exactly one line, same as warning");
    logger.info("test multi-line\nsecond line of the same call");
    logger.log("YOU SHOULD NOT SEE THIS LINE EITHER", "ignore", DEFAULT_EXIT_CODE);
}
