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

use chrono::prelude::*;
use mailparse::{MailAddr, MailHeader, MailHeaderMap};

/// One message fetched from the server.
///
/// Only the fields needed to name the backup file are broken out; `content` is
/// the exact byte sequence that gets written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub uid: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub subject: Option<String>,
    /// The wall-clock time from the `Date` header, in the sender's time zone.
    /// Dates that only the lenient fallback parser understands (e.g. with a
    /// full month name) come out in UTC instead.
    pub date: Option<NaiveDateTime>,
    pub content: Vec<u8>,
}

impl MessageRecord {
    /// Extract the naming metadata from the raw RFC 5322 message.
    ///
    /// This never fails; anything that can't be parsed is simply absent.
    pub fn parse(uid: impl ToString, content: Vec<u8>) -> Self {
        let (from, to, subject, date) =
            match mailparse::parse_headers(&content) {
                Ok((headers, _)) => (
                    addresses(&headers, "From"),
                    addresses(&headers, "To"),
                    headers.get_first_value("Subject"),
                    headers
                        .get_first_value("Date")
                        .and_then(|d| parse_date(&d)),
                ),
                Err(_) => (vec![], vec![], None, None),
            };

        MessageRecord {
            uid: uid.to_string(),
            from,
            to,
            subject,
            date,
            content,
        }
    }
}

// The content is usually huge and not interesting.
impl fmt::Debug for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MessageRecord")
            .field("uid", &self.uid)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("date", &self.date)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .finish()
    }
}

fn addresses(headers: &[MailHeader], name: &str) -> Vec<String> {
    let header = match headers.get_first_header(name) {
        Some(h) => h,
        None => return vec![],
    };

    let list = match mailparse::addrparse_header(header) {
        Ok(list) => list,
        // Not a parseable address list; use whatever text is there
        Err(_) => {
            let raw = header.get_value();
            let raw = raw.trim();
            return if raw.is_empty() {
                vec![]
            } else {
                vec![raw.to_owned()]
            };
        }
    };

    let mut ret = Vec::new();
    for addr in list.iter() {
        match *addr {
            MailAddr::Single(ref info) => ret.push(info.addr.clone()),
            MailAddr::Group(ref group) => {
                ret.extend(group.addrs.iter().map(|info| info.addr.clone()))
            }
        }
    }
    ret
}

fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_local());
    }

    // mailparse copes with more broken real-world dates, but only gives UTC
    mailparse::dateparse(value)
        .ok()
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|dt| dt.naive_utc())
}
