//-
// Copyright (c) 2020, Jason Lingle
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

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// The configuration for a backup run.
///
/// This is stored in a TOML file, by default `/etc/mail-backup.toml`. Relative
/// folder paths are resolved against the directory containing that file.
#[derive(Clone, Debug, Deserialize)]
pub struct SystemConfig {
    /// How to reach the IMAP server.
    pub imap: ImapConfig,

    /// Where log output goes.
    #[serde(default)]
    pub log: LogConfig,

    /// The folders to back up, in order.
    ///
    /// These are validated separately (see `backup::folder_config`) so that
    /// every problem can be reported at once.
    #[serde(default)]
    pub folders: Vec<RawFolderConfig>,
}

#[derive(Clone, Deserialize, Default)]
pub struct ImapConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    /// If unset, the password must be given on the command line or typed in
    /// at the terminal.
    #[serde(default)]
    pub password: Option<String>,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub allow_insecure_tls_connections: bool,
}

fn default_port() -> u16 {
    993
}

impl ImapConfig {
    /// `host:port`, or just `host` for the default port.
    pub fn host_info(&self) -> String {
        if default_port() == self.port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

// Hand-written so the password never ends up in a log.
impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field(
                "allow_insecure_tls_connections",
                &self.allow_insecure_tls_connections,
            )
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// If set, log into this file with size-based rotation instead of to
    /// standard output.
    pub file: Option<PathBuf>,
    pub level: LogLevel,
    /// The size at which the log file is rotated.
    pub max_bytes: u64,
    /// How many rotated log files are kept.
    pub max_count: u32,
    /// Also print to standard output when `file` is set.
    pub print: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            file: None,
            level: LogLevel::Info,
            max_bytes: 1024 * 1024,
            max_count: 5,
            print: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("debug") {
            Ok(LogLevel::Debug)
        } else if s.eq_ignore_ascii_case("info") {
            Ok(LogLevel::Info)
        } else if s.eq_ignore_ascii_case("warning")
            || s.eq_ignore_ascii_case("warn")
        {
            Ok(LogLevel::Warning)
        } else if s.eq_ignore_ascii_case("error") {
            Ok(LogLevel::Error)
        } else {
            Err(format!("unknown log level '{}'", s))
        }
    }
}

/// One `[[folders]]` entry, as written.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFolderConfig {
    /// The remote folder name, e.g. `INBOX`.
    #[serde(alias = "folder_name")]
    pub name: Option<String>,
    /// The pattern for file names, e.g.
    /// `./INBOX/{YEAR}-{MONTH}/{YEAR}{MONTH}{DAY}-{UID}.eml`.
    pub path: Option<String>,
    /// Only back up messages from the last this many days.
    pub last_days: Option<i64>,
    /// `compare`, `overwrite`, or `skip`.
    pub when_exists: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config: SystemConfig = toml::from_str(
            r#"
[imap]
host = "imap.example.com"
user = "me@example.com"
password = "hunter2"

[log]
file = "/var/log/mail-backup.log"
level = "warning"
max_count = 2

[[folders]]
name = "INBOX"
path = "./INBOX/{UID}.eml"
last_days = 30

[[folders]]
folder_name = "Sent"
path = "/srv/sent/{UID}.eml"
when_exists = "skip"
"#,
        )
        .unwrap();

        assert_eq!("imap.example.com", config.imap.host);
        assert_eq!(993, config.imap.port);
        assert_eq!("imap.example.com", config.imap.host_info());
        assert!(!config.imap.allow_insecure_tls_connections);
        assert_eq!(LogLevel::Warning, config.log.level);
        assert_eq!(1024 * 1024, config.log.max_bytes);
        assert_eq!(2, config.log.max_count);
        assert_eq!(2, config.folders.len());
        assert_eq!(Some("INBOX"), config.folders[0].name.as_deref());
        assert_eq!(Some(30), config.folders[0].last_days);
        assert_eq!(Some("Sent"), config.folders[1].name.as_deref());
        assert_eq!(Some("skip"), config.folders[1].when_exists.as_deref());
    }

    #[test]
    fn password_not_in_debug_output() {
        let config = ImapConfig {
            host: "h".to_owned(),
            port: 143,
            user: "u".to_owned(),
            password: Some("hunter2".to_owned()),
            allow_insecure_tls_connections: false,
        };

        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("***"));
        assert_eq!("h:143", config.host_info());
    }

    #[test]
    fn parse_log_level() {
        assert_eq!(Ok(LogLevel::Debug), "DEBUG".parse());
        assert_eq!(Ok(LogLevel::Warning), " warn ".parse());
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(log::LevelFilter::Warn, LogLevel::Warning.filter());
    }
}
