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

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::debug;
use structopt::StructOpt;

use crate::backup::folder_config::{parse_folder_configs, FolderConfig};
use crate::support::error::{Error, FsContext};
use crate::support::file_ops;
use crate::support::logging;
use crate::support::sysexits::*;
use crate::support::system_config::{LogLevel, SystemConfig};

/// Back up IMAP folders into a directory tree, one file per message.
///
/// Each configured folder is read without modifying anything on the server.
/// A message is written to the path obtained by substituting its attributes
/// into the folder's path pattern, e.g.
/// `./INBOX/{YEAR}-{MONTH}/{YEAR}{MONTH}{DAY}-{UID}-{SUBJECT}.eml`, unless a
/// file with the same content is already there. Running the backup again
/// therefore only saves new messages.
///
/// Relative paths are resolved against the directory containing the
/// configuration file.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
pub(super) struct Options {
    /// The configuration file.
    #[structopt(
        short,
        long,
        parse(from_os_str),
        default_value = "/etc/mail-backup.toml"
    )]
    pub(super) conf_file: PathBuf,

    /// Log into this file instead of standard output. The file is rotated
    /// once it gets too big.
    #[structopt(short = "f", long, parse(from_os_str))]
    pub(super) log_file: Option<PathBuf>,

    /// The log level: debug, info, warning, or error.
    #[structopt(short = "l", long)]
    pub(super) log_level: Option<LogLevel>,

    /// Also log to standard output when logging into a file.
    #[structopt(short = "p", long)]
    pub(super) log_print: bool,

    /// The IMAP password. Overrides the configuration file.
    #[structopt(short = "s", long)]
    pub(super) imap_password: Option<String>,

    /// Dump a trace of the IMAP connection to standard error.
    #[structopt(long)]
    pub(super) trace: bool,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let mut config = load_config(&options.conf_file);
    apply_overrides(&mut config, &options);

    if let Err(e) = logging::init(&config.log) {
        die!(Sysexit::from(&e), "Failed to set up logging: {}", e);
    }
    debug!("Configuration: {:#?}", config);

    let folders = match check_config(&config) {
        Ok(folders) => folders,
        Err(e) => die!(
            EX_CONFIG,
            "Error in config file at '{}': {}",
            options.conf_file.display(),
            e
        ),
    };

    let pivot = match pivot_path(&options.conf_file) {
        Ok(pivot) => pivot,
        Err(e) => die!(EX_IOERR, "{}", e),
    };
    debug!("Relative paths are resolved against {}", pivot.display());

    let password = match password(&options, &config) {
        Ok(password) => password,
        Err(e) => die!(Sysexit::from(&e), "{}", e),
    };

    super::backup::backup(
        &config.imap,
        &password,
        options.trace,
        &folders,
        &pivot,
    );
}

fn load_config(path: &Path) -> SystemConfig {
    let mut config_toml = Vec::new();
    if let Err(e) = fs::File::open(path)
        .and_then(|mut f| f.read_to_end(&mut config_toml))
    {
        die!(EX_NOINPUT, "Error reading '{}': {}", path.display(), e);
    }

    match toml::from_slice(&config_toml) {
        Ok(config) => config,
        Err(e) => die!(
            EX_CONFIG,
            "Error in config file at '{}': {}",
            path.display(),
            e
        ),
    }
}

/// Let command-line options take precedence over the file.
fn apply_overrides(config: &mut SystemConfig, options: &Options) {
    if let Some(ref file) = options.log_file {
        config.log.file = Some(file.clone());
    }
    if let Some(level) = options.log_level {
        config.log.level = level;
    }
    if options.log_print {
        config.log.print = true;
    }
}

fn check_config(config: &SystemConfig) -> Result<Vec<FolderConfig>, Error> {
    if config.imap.host.trim().is_empty() {
        return Err(Error::Config("'imap.host' is empty".to_owned()));
    }
    if config.imap.user.trim().is_empty() {
        return Err(Error::Config("'imap.user' is empty".to_owned()));
    }

    parse_folder_configs(&config.folders)
}

/// The absolute directory containing the configuration file.
///
/// A symlinked configuration file keeps the symlink's directory.
fn pivot_path(conf_file: &Path) -> Result<PathBuf, Error> {
    let absolute = file_ops::absolute_path(conf_file).on_path(conf_file)?;
    Ok(absolute
        .parent()
        .map(Path::to_owned)
        .unwrap_or_else(|| PathBuf::from("/")))
}

fn password(options: &Options, config: &SystemConfig) -> Result<String, Error> {
    if let Some(ref password) = options.imap_password {
        return Ok(password.clone());
    }
    if let Some(ref password) = config.imap.password {
        return Ok(password.clone());
    }

    if Ok(true) != nix::unistd::isatty(0) {
        return Err(Error::Config(
            "No IMAP password configured and standard input is not a \
             terminal; use --imap-password or set 'imap.password'"
                .to_owned(),
        ));
    }

    match rpassword::read_password_from_tty(Some(&format!(
        "IMAP password for {}@{}: ",
        config.imap.user,
        config.imap.host_info()
    ))) {
        Ok(password) => Ok(password),
        Err(e) => die!(EX_NOINPUT, "Failed to read password: {}", e),
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn parse(args: &[&str]) -> Options {
        let mut argv = vec!["mail-backup"];
        argv.extend_from_slice(args);
        let matches = Options::clap().get_matches_from_safe(argv).unwrap();
        Options::from_clap(&matches)
    }

    fn config() -> SystemConfig {
        toml::from_str(
            r#"
[imap]
host = "imap.example.com"
user = "me"
password = "from-config"

[[folders]]
name = "INBOX"
path = "{UID}.eml"
"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults() {
        let options = parse(&[]);
        assert_eq!(PathBuf::from("/etc/mail-backup.toml"), options.conf_file);
        assert_eq!(None, options.log_file);
        assert_eq!(None, options.log_level);
        assert!(!options.log_print);
        assert_eq!(None, options.imap_password);
        assert!(!options.trace);
    }

    #[test]
    fn overrides() {
        let options = parse(&[
            "-c",
            "/tmp/x.toml",
            "-f",
            "/tmp/x.log",
            "-l",
            "warning",
            "-p",
            "-s",
            "secret",
            "--trace",
        ]);

        let mut config = config();
        apply_overrides(&mut config, &options);
        assert_eq!(Some(PathBuf::from("/tmp/x.log")), config.log.file);
        assert_eq!(LogLevel::Warning, config.log.level);
        assert!(config.log.print);
        assert_eq!("secret", password(&options, &config).unwrap());
        assert!(options.trace);
    }

    #[test]
    fn bad_log_level_is_usage_error() {
        assert!(Options::clap()
            .get_matches_from_safe(vec!["mail-backup", "-l", "loud"])
            .is_err());
    }

    #[test]
    fn password_from_config() {
        assert_eq!("from-config", password(&parse(&[]), &config()).unwrap());
    }

    #[test]
    fn empty_host_rejected() {
        let mut config = config();
        config.imap.host = " ".to_owned();
        assert_matches!(Err(Error::Config(..)), check_config(&config));
    }

    #[test]
    fn pivot_is_config_directory() {
        let root = TempDir::new().unwrap();
        let conf = root.path().join("sub/../backup.toml");
        fs::write(root.path().join("backup.toml"), b"").unwrap();
        fs::create_dir(root.path().join("sub")).unwrap();

        assert_eq!(root.path(), pivot_path(&conf).unwrap());
    }

    #[test]
    fn pivot_of_symlinked_config() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("dotfiles")).unwrap();
        fs::create_dir(root.path().join("etc")).unwrap();
        fs::write(root.path().join("dotfiles/mb.toml"), b"").unwrap();
        std::os::unix::fs::symlink(
            root.path().join("dotfiles/mb.toml"),
            root.path().join("etc/mb.toml"),
        )
        .unwrap();

        assert_eq!(
            root.path().join("etc"),
            pivot_path(&root.path().join("etc/mb.toml")).unwrap()
        );
    }
}
