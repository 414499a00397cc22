//-
// Copyright (c) 2020, 2022, Jason Lingle
//
// This file is part of mail-backup.
//
// mail-backup is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// mail-backup is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// mail-backup. If not, see <http://www.gnu.org/licenses/>.

use std::path::Path;

use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::policy::compound::{
    roll::{delete::DeleteRoller, fixed_window::FixedWindowRoller, Roll},
    trigger::size::SizeTrigger,
    CompoundPolicy,
};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use super::error::{Error, FsContext};
use super::system_config::LogConfig;

const SIMPLE_PATTERN: &str = "[{l:>8}]: {m}{n}";
const TIMESTAMPED_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l:>8}]: {m}{n}";

/// Install the global logger as described by `config`.
///
/// Without a log file, everything goes to standard output. With one, output
/// goes to that file, rotated once it exceeds `max_bytes`, and additionally to
/// standard output if `print` is set.
pub fn init(config: &LogConfig) -> Result<(), Error> {
    let log4rs_config = build_config(config)?;
    log4rs::init_config(log4rs_config)
        .map_err(|e| Error::Config(format!("cannot install logger: {}", e)))?;
    Ok(())
}

fn build_config(config: &LogConfig) -> Result<Config, Error> {
    let mut builder = Config::builder();
    let mut root = Root::builder();

    if let Some(ref file) = config.file {
        builder = builder.appender(
            Appender::builder()
                .build("file", Box::new(rolling_file_appender(file, config)?)),
        );
        root = root.appender("file");
    }

    if config.file.is_none() || config.print {
        let pattern = if config.file.is_some() {
            TIMESTAMPED_PATTERN
        } else {
            SIMPLE_PATTERN
        };

        builder = builder.appender(Appender::builder().build(
            "stdout",
            Box::new(
                ConsoleAppender::builder()
                    .target(Target::Stdout)
                    .encoder(Box::new(PatternEncoder::new(pattern)))
                    .build(),
            ),
        ));
        root = root.appender("stdout");
    }

    builder
        .build(root.build(config.level.filter()))
        .map_err(|e| Error::Config(format!("bad logging setup: {}", e)))
}

fn rolling_file_appender(
    file: &Path,
    config: &LogConfig,
) -> Result<RollingFileAppender, Error> {
    let roller: Box<dyn Roll> = if 0 == config.max_count {
        Box::new(DeleteRoller::new())
    } else {
        let pattern = format!("{}.{{}}", file.display());
        Box::new(
            FixedWindowRoller::builder()
                .build(&pattern, config.max_count)
                .map_err(|e| {
                    Error::Config(format!(
                        "bad log rotation for '{}': {}",
                        file.display(),
                        e
                    ))
                })?,
        )
    };

    let trigger = SizeTrigger::new(config.max_bytes);
    let policy = CompoundPolicy::new(Box::new(trigger), roller);

    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(TIMESTAMPED_PATTERN)))
        .append(true)
        .build(file, Box::new(policy))
        .on_path(file)
}

#[cfg(test)]
pub fn init_test_log() {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(SIMPLE_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(
            Root::builder()
                .appender("stderr")
                .build(log::LevelFilter::Debug),
        );

    // Fails if a logger is already installed, which is fine
    if let Ok(config) = config {
        let _ = log4rs::init_config(config);
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;
    use crate::support::system_config::LogLevel;

    #[test]
    fn console_only_config() {
        assert!(build_config(&LogConfig::default()).is_ok());
    }

    #[test]
    fn file_config_creates_log_file() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("backup.log");
        let config = LogConfig {
            file: Some(file.clone()),
            level: LogLevel::Debug,
            max_bytes: 1024,
            max_count: 3,
            print: true,
        };

        assert!(build_config(&config).is_ok());
        assert!(file.is_file());
    }

    #[test]
    fn unwritable_log_file_is_filesystem_error() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("blocker"), b"").unwrap();
        let config = LogConfig {
            file: Some(root.path().join("blocker/backup.log")),
            max_count: 0,
            ..LogConfig::default()
        };

        assert_matches!(
            Err(Error::Filesystem { .. }),
            build_config(&config).map(|_| ())
        );
    }
}
