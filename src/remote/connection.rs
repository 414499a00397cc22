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

use std::net::{TcpStream, ToSocketAddrs};
use std::vec;

use chrono::NaiveDate;
use log::{debug, info, warn};
use openssl::ssl::{
    HandshakeError, SslConnector, SslMethod, SslStream, SslVerifyMode,
};
use utf7_imap::{decode_utf7_imap, encode_utf7_imap};

use crate::backup::message::MessageRecord;
use crate::backup::transport::{MessageIter, Transport};
use crate::support::chronox::*;
use crate::support::error::Error;
use crate::support::system_config::ImapConfig;

type ImapSession = imap::Session<SslStream<TcpStream>>;

/// A logged-in IMAPS connection.
///
/// Folders are only ever opened with `EXAMINE` and bodies fetched with
/// `BODY.PEEK[]`, so nothing on the server changes, not even `\Seen` flags.
pub struct ImapTransport {
    session: ImapSession,
    host_info: String,
}

impl ImapTransport {
    /// Connect to the server described by `config` and log in.
    ///
    /// If `trace` is set, the whole IMAP conversation is written to standard
    /// error.
    pub fn connect(
        config: &ImapConfig,
        password: &str,
        trace: bool,
    ) -> Result<Self, Error> {
        let host_info = config.host_info();

        let address = (&config.host as &str, config.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addresses| addresses.next())
            .ok_or_else(|| {
                Error::Connect(format!("Host ({}) not found", host_info))
            })?;

        debug!("Opening connection to {} ({})", host_info, address);
        let tcp_stream = TcpStream::connect(address).map_err(|e| {
            Error::Connect(format!("Cannot connect to {}: {}", host_info, e))
        })?;

        debug!("Starting TLS handshake");
        let mut connector = SslConnector::builder(SslMethod::tls())?;
        if config.allow_insecure_tls_connections {
            connector.set_verify(SslVerifyMode::NONE);
        }

        let ssl_stream = connector
            .build()
            .connect(&config.host, tcp_stream)
            .map_err(|e| match e {
                HandshakeError::SetupFailure(es) => Error::Tls(es),
                HandshakeError::Failure(f) => {
                    Error::TlsHandshake(f.into_error())
                }
                HandshakeError::WouldBlock(f) => {
                    Error::TlsHandshake(f.into_error())
                }
            })?;

        let mut client = imap::Client::new(ssl_stream);
        client.debug = trace;

        debug!("Connection established; reading server greeting");
        client.read_greeting()?;

        let session = client
            .login(&config.user, password)
            .map_err(|(e, _)| Error::from(e))?;
        info!("Logged in to {} as {}", host_info, config.user);

        Ok(ImapTransport { session, host_info })
    }
}

impl Transport for ImapTransport {
    fn list_folders(&mut self) -> Result<Vec<String>, Error> {
        let names = self.session.list(Some(""), Some("*"))?;
        Ok(names.iter().map(|n| decode_folder_name(n.name())).collect())
    }

    fn select_folder(&mut self, name: &str) -> Result<(), Error> {
        let mailbox = self.session.examine(encode_folder_name(name))?;
        debug!("{}: {} messages", name, mailbox.exists);
        Ok(())
    }

    fn fetch_messages(
        &mut self,
        since: Option<NaiveDate>,
    ) -> Result<MessageIter<'_>, Error> {
        let query = match since {
            Some(since) => format!("SINCE {}", since.to_imap_date()),
            None => "ALL".to_owned(),
        };

        let mut uids = self
            .session
            .uid_search(&query)?
            .into_iter()
            .collect::<Vec<_>>();
        uids.sort_unstable();
        debug!("UID SEARCH {}: {} messages", query, uids.len());

        Ok(Box::new(MessageFetcher {
            session: &mut self.session,
            uids: uids.into_iter(),
        }))
    }
}

impl Drop for ImapTransport {
    fn drop(&mut self) {
        match self.session.logout() {
            Ok(()) => debug!("Logged out of {}", self.host_info),
            Err(e) => warn!("Logout from {} failed: {}", self.host_info, e),
        }
    }
}

// Mailbox names travel as modified UTF-7 (RFC 3501 section 5.1.3)
fn decode_folder_name(wire: &str) -> String {
    decode_utf7_imap(wire.to_owned())
}

fn encode_folder_name(name: &str) -> String {
    encode_utf7_imap(name.to_owned())
}

/// Fetches one message per call to `next()`.
struct MessageFetcher<'a> {
    session: &'a mut ImapSession,
    uids: vec::IntoIter<u32>,
}

impl MessageFetcher<'_> {
    fn fetch(&mut self, uid: u32) -> Result<Option<MessageRecord>, Error> {
        let fetches = self
            .session
            .uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")?;

        Ok(fetches.iter().find_map(|fetch| {
            let body = fetch.body()?;
            Some(MessageRecord::parse(
                fetch.uid.unwrap_or(uid),
                body.to_vec(),
            ))
        }))
    }
}

impl Iterator for MessageFetcher<'_> {
    type Item = Result<MessageRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(uid) = self.uids.next() {
            match self.fetch(uid) {
                Ok(Some(message)) => return Some(Ok(message)),
                // Expunged since the search
                Ok(None) => debug!("UID {} has vanished, ignoring", uid),
                Err(e) => return Some(Err(e)),
            }
        }

        None
    }
}

#[cfg(test)]
mod test {
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    fn config(host: &str, port: u16) -> ImapConfig {
        ImapConfig {
            host: host.to_owned(),
            port,
            user: "user".to_owned(),
            password: None,
            allow_insecure_tls_connections: true,
        }
    }

    #[test]
    fn folder_names_use_modified_utf7() {
        assert_eq!("Entw&APw-rfe", encode_folder_name("Entwürfe"));
        assert_eq!("Entwürfe", decode_folder_name("Entw&APw-rfe"));
        assert_eq!("INBOX", encode_folder_name("INBOX"));
        assert_eq!("INBOX/Sent", decode_folder_name("INBOX/Sent"));
        assert_eq!("Грязь", decode_folder_name(&encode_folder_name("Грязь")));
    }

    #[test]
    fn unknown_host() {
        let nowhere = config("nonexistent.invalid", 993);
        let result = ImapTransport::connect(&nowhere, "", false);
        assert_matches!(
            Err(Error::Connect(ref msg)) if msg.contains("not found"),
            result.map(|_| ())
        );
    }

    #[test]
    fn server_without_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            // Accept and immediately hang up
            let _ = listener.accept();
        });

        let result =
            ImapTransport::connect(&config("127.0.0.1", port), "", false);
        assert_matches!(Err(Error::TlsHandshake(..)), result.map(|_| ()));
        server.join().unwrap();
    }
}
