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

//! Derivation of the file-name-safe attributes of a message.

use std::fmt;
use std::str::FromStr;

use chrono::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;

use super::message::MessageRecord;
use crate::support::chronox::*;

pub const MAX_ATTRIBUTE_LENGTH: usize = 32;
pub const MAX_SUBJECT_LENGTH: usize = 50;

/// Messages dated before this year get the sentinel date instead.
const MIN_PLAUSIBLE_YEAR: i32 = 1971;

/// Bounds the collapse loop in `sanitise`. Each pass shrinks the string, so
/// this is never reached on real input.
const MAX_COLLAPSE_PASSES: usize = 64;

const REPLY_PREFIXES: &[&str] = &["fw:", "fwd:", "re:", "aw:"];

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new("[^A-Za-z0-9.-]").unwrap();
}

/// The names which may be used as `{NAME}` placeholders in a path pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeName {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Uid,
    Subject,
    To1,
    From,
}

impl AttributeName {
    pub const ALL: [AttributeName; 9] = [
        AttributeName::Year,
        AttributeName::Month,
        AttributeName::Day,
        AttributeName::Hour,
        AttributeName::Minute,
        AttributeName::Uid,
        AttributeName::Subject,
        AttributeName::To1,
        AttributeName::From,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AttributeName::Year => "YEAR",
            AttributeName::Month => "MONTH",
            AttributeName::Day => "DAY",
            AttributeName::Hour => "HOUR",
            AttributeName::Minute => "MINUTE",
            AttributeName::Uid => "UID",
            AttributeName::Subject => "SUBJECT",
            AttributeName::To1 => "TO1",
            AttributeName::From => "FROM",
        }
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AttributeName {
    type Err = ();

    /// Names are case-sensitive, as in the patterns users write.
    fn from_str(s: &str) -> Result<Self, ()> {
        AttributeName::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or(())
    }
}

/// The sanitised attributes of one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSet {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub uid: String,
    pub subject: String,
    pub to1: String,
    pub from: String,
}

impl AttributeSet {
    pub fn extract(record: &MessageRecord) -> Self {
        let date = record
            .date
            .filter(|d| d.year() >= MIN_PLAUSIBLE_YEAR)
            .unwrap_or_else(sentinel_date);

        AttributeSet {
            year: format!("{:04}", date.year()),
            month: format!("{:02}", date.month()),
            day: format!("{:02}", date.day()),
            hour: format!("{:02}", date.hour()),
            minute: format!("{:02}", date.minute()),
            uid: sanitise(&record.uid, MAX_ATTRIBUTE_LENGTH),
            subject: sanitise(
                strip_reply_prefixes(record.subject.as_deref().unwrap_or("")),
                MAX_SUBJECT_LENGTH,
            ),
            to1: sanitise(&first_address(&record.to), MAX_ATTRIBUTE_LENGTH),
            from: sanitise(&first_address(&record.from), MAX_ATTRIBUTE_LENGTH),
        }
    }

    pub fn get(&self, name: AttributeName) -> &str {
        match name {
            AttributeName::Year => &self.year,
            AttributeName::Month => &self.month,
            AttributeName::Day => &self.day,
            AttributeName::Hour => &self.hour,
            AttributeName::Minute => &self.minute,
            AttributeName::Uid => &self.uid,
            AttributeName::Subject => &self.subject,
            AttributeName::To1 => &self.to1,
            AttributeName::From => &self.from,
        }
    }
}

/// What undated (or implausibly dated) messages are filed under.
pub fn sentinel_date() -> NaiveDateTime {
    NaiveDate::from_ymdx(1, 1, 1).and_hmsx(0, 0, 0)
}

/// Reduce an address list to the first address, with `@` turned into `.` so
/// it survives sanitisation as one readable token.
pub fn first_address(addresses: &[String]) -> String {
    addresses
        .first()
        .map(|a| a.trim().replace('@', "."))
        .unwrap_or_default()
}

/// Strip any number of stacked `Re:`, `Fwd:`, etc, in any order and case.
pub fn strip_reply_prefixes(mut subject: &str) -> &str {
    'outer: loop {
        subject = subject.trim();
        for prefix in REPLY_PREFIXES {
            if subject
                .get(..prefix.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
            {
                subject = &subject[prefix.len()..];
                continue 'outer;
            }
        }

        return subject;
    }
}

/// Turn arbitrary text into something that can be used in a file name.
///
/// The result contains only ASCII letters, digits, `.` and `-`, never
/// contains `..`, `.-` or `-.`, never starts or ends with `.`, and is at most
/// `max_length` bytes long. `sanitise(sanitise(x)) == sanitise(x)`.
pub fn sanitise(value: &str, max_length: usize) -> String {
    let value = deunicode::deunicode(value.trim());
    let value = value.replace(|c| '_' == c || ' ' == c, ".");
    let mut value = UNSAFE_CHARS.replace_all(&value, ".").into_owned();

    for _ in 0..MAX_COLLAPSE_PASSES {
        let collapsed = value
            .replace(".-", "-")
            .replace("-.", "-")
            .replace("..", ".");
        if collapsed == value {
            break;
        }
        value = collapsed;
    }

    // Only ASCII remains, so any byte offset is a char boundary
    value.truncate(max_length);
    value.trim_matches('.').to_owned()
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_sanitise() {
        assert_eq!("a.b.c.d.e", sanitise(" a##b:c;d\\e..  ", 32));
        assert_eq!("123", sanitise("123456789", 3));
        assert_eq!("aUss.gghJ.lk", sanitise(" äÜß    gghJ    lk  ", 32));
        assert_eq!("a-b", sanitise("a.-.b", 32));
        assert_eq!("a-b", sanitise("a#-#b", 32));
        assert_eq!("a--b", sanitise("a--b", 32));
        assert_eq!("x-y", sanitise("x - y", 32));
        assert_eq!("reply.to.mail.de", sanitise("reply_to.mail.de", 32));
        assert_eq!("", sanitise("  ##  ", 32));
        assert_eq!("ab", sanitise("ab.cd", 3));
    }

    #[test]
    fn test_first_address() {
        assert_eq!(
            "reply_to.mail.de",
            first_address(&[" reply_to@mail.de ".to_owned()])
        );
        assert_eq!(
            "reply_to.mail.de",
            first_address(&[
                "reply_to@mail.de".to_owned(),
                "reply_to2@mail.de".to_owned()
            ])
        );
        assert_eq!("", first_address(&[]));
    }

    #[test]
    fn test_strip_reply_prefixes() {
        assert_eq!(
            "123",
            strip_reply_prefixes("  fw:  Fwd: Re: Fwd: fwD:    re:  123 ")
        );
        assert_eq!("hello", strip_reply_prefixes("Fwd: Re: hello"));
        assert_eq!("x", strip_reply_prefixes("AW: aw:x"));
        assert_eq!("Remarks", strip_reply_prefixes("Remarks"));
        assert_eq!("", strip_reply_prefixes("Re:"));
        assert_eq!("Ünïcode", strip_reply_prefixes("re: Ünïcode"));
        assert_eq!("é", strip_reply_prefixes("é"));
    }

    fn record() -> MessageRecord {
        MessageRecord {
            uid: "123".to_owned(),
            from: vec!["from@dummy.de".to_owned()],
            to: vec!["to@dummy.de".to_owned(), "to2@dummy.de".to_owned()],
            subject: Some(" Fwd: Re: Fwd: fwD:    re:  123 ".to_owned()),
            date: Some(NaiveDate::from_ymdx(2020, 9, 10).and_hmsx(18, 7, 6)),
            content: vec![],
        }
    }

    #[test]
    fn test_extract() {
        assert_eq!(
            AttributeSet {
                year: "2020".to_owned(),
                month: "09".to_owned(),
                day: "10".to_owned(),
                hour: "18".to_owned(),
                minute: "07".to_owned(),
                uid: "123".to_owned(),
                subject: "123".to_owned(),
                to1: "to.dummy.de".to_owned(),
                from: "from.dummy.de".to_owned(),
            },
            AttributeSet::extract(&record())
        );
    }

    #[test]
    fn test_extract_implausible_date() {
        let mut r = record();
        r.date = Some(NaiveDate::from_ymdx(1970, 12, 31).and_hmsx(23, 59, 0));
        let attrs = AttributeSet::extract(&r);
        assert_eq!("0001", attrs.year);
        assert_eq!("01", attrs.month);
        assert_eq!("01", attrs.day);
        assert_eq!("00", attrs.hour);
        assert_eq!("00", attrs.minute);

        r.date = None;
        assert_eq!(attrs, AttributeSet::extract(&r));

        r.date = Some(NaiveDate::from_ymdx(1971, 1, 1).and_hmsx(0, 0, 0));
        assert_eq!("1971", AttributeSet::extract(&r).year);
    }

    #[test]
    fn test_extract_truncation_and_empties() {
        let r = MessageRecord {
            uid: "x".repeat(40),
            from: vec![],
            to: vec![],
            subject: Some("s".repeat(60)),
            date: None,
            content: vec![],
        };
        let attrs = AttributeSet::extract(&r);
        assert_eq!(MAX_ATTRIBUTE_LENGTH, attrs.uid.len());
        assert_eq!(MAX_SUBJECT_LENGTH, attrs.subject.len());
        assert_eq!("", attrs.from);
        assert_eq!("", attrs.to1);
    }

    #[test]
    fn attribute_names_round_trip() {
        for &name in &AttributeName::ALL {
            assert_eq!(Ok(name), name.name().parse());
        }
        assert_eq!(Err(()), "year".parse::<AttributeName>());
        assert_eq!(Err(()), "DATETIME_OBJ".parse::<AttributeName>());
    }

    proptest! {
        #[test]
        fn sanitise_is_fixed_point(s in ".*", max in 1usize..60) {
            let once = sanitise(&s, max);
            prop_assert_eq!(&once, &sanitise(&once, max));
        }

        #[test]
        fn sanitise_output_is_safe(s in ".*") {
            let out = sanitise(&s, MAX_ATTRIBUTE_LENGTH);
            prop_assert!(out.len() <= MAX_ATTRIBUTE_LENGTH);
            prop_assert!(out.bytes().all(
                |b| b.is_ascii_alphanumeric() || b'.' == b || b'-' == b));
            prop_assert!(!out.starts_with('.') && !out.ends_with('.'));
            prop_assert!(!out.contains("..") && !out.contains(".-")
                         && !out.contains("-."));
        }
    }
}
