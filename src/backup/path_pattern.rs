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

//! Path patterns, like `./{YEAR}-{MONTH}/{YEAR}{MONTH}{DAY}-{UID}.eml`.
//!
//! A placeholder is an attribute name in braces. `{{` and `}}` stand for
//! literal braces. Patterns are compiled once, when the configuration is
//! loaded, so an unknown placeholder is reported before anything is fetched
//! and rendering itself cannot fail.

use std::fmt;
use std::path::{Path, PathBuf};

use super::attributes::{AttributeName, AttributeSet};
use crate::support::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Attribute(AttributeName),
}

#[derive(Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        let malformed = |reason| Error::MalformedPattern {
            pattern: pattern.to_owned(),
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if Some(&'{') == chars.peek() => {
                    chars.next();
                    literal.push('{');
                }
                '}' if Some(&'}') == chars.peek() => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(malformed("single '}' outside placeholder")),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => {
                                return Err(malformed("'{' inside placeholder"))
                            }
                            Some(c) => name.push(c),
                            None => {
                                return Err(malformed(
                                    "unterminated placeholder",
                                ))
                            }
                        }
                    }

                    let attribute = name.parse::<AttributeName>().map_err(
                        |()| Error::UnknownAttribute {
                            pattern: pattern.to_owned(),
                            name: name.clone(),
                        },
                    )?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(
                            &mut literal,
                        )));
                    }
                    segments.push(Segment::Attribute(attribute));
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(PathPattern {
            source: pattern.to_owned(),
            segments,
        })
    }

    /// Substitute `attributes` into the pattern.
    pub fn render(&self, attributes: &AttributeSet) -> String {
        let mut out = String::with_capacity(self.source.len() + 64);
        for segment in &self.segments {
            match *segment {
                Segment::Literal(ref s) => out.push_str(s),
                Segment::Attribute(name) => out.push_str(attributes.get(name)),
            }
        }
        out
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PathPattern({:?})", self.source)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Place `path` under `base` unless it is already absolute.
///
/// No normalisation happens here: `./x` under `/b` is `/b/./x`. Symlinks and
/// `..` are only resolved when the path is actually used (see
/// `file_ops::resolve_real_path`).
pub fn join_with_base(base: &Path, path: &str) -> PathBuf {
    if path.starts_with('/') {
        PathBuf::from(path)
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn render_path(
        pattern: &str,
        attributes: &AttributeSet,
    ) -> Result<String, Error> {
        PathPattern::parse(pattern).map(|p| p.render(attributes))
    }

    fn attributes() -> AttributeSet {
        AttributeSet {
            year: "2020".to_owned(),
            month: "09".to_owned(),
            day: "10".to_owned(),
            hour: "18".to_owned(),
            minute: "07".to_owned(),
            uid: "123".to_owned(),
            subject: "subject".to_owned(),
            to1: "to.dummy.de".to_owned(),
            from: "from.dummy.de".to_owned(),
        }
    }

    #[test]
    fn test_render() {
        let attrs = attributes();
        assert_eq!(
            "./2020-09/20200910-1807-123.eml",
            render_path(
                "./{YEAR}-{MONTH}/{YEAR}{MONTH}{DAY}-{HOUR}{MINUTE}-{UID}.eml",
                &attrs
            )
            .unwrap()
        );
        assert_eq!(
            "./__work__/2020-09/\
             20200910-OUT-from.dummy.de-to.dummy.de-subject.eml",
            render_path(
                "./__work__/{YEAR}-{MONTH}/\
                 {YEAR}{MONTH}{DAY}-OUT-{FROM}-{TO1}-{SUBJECT}.eml",
                &attrs
            )
            .unwrap()
        );
        assert_eq!(
            "no placeholders",
            render_path("no placeholders", &attrs).unwrap()
        );
        assert_eq!(
            "{UID}-123}",
            render_path("{{UID}}-{UID}}}", &attrs).unwrap()
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_matches!(
            Err(Error::UnknownAttribute { ref name, .. }) if name == "SECOND",
            PathPattern::parse("{YEAR}/{SECOND}.eml")
        );
        assert_matches!(
            Err(Error::UnknownAttribute { ref name, .. }) if name == "uid",
            PathPattern::parse("{uid}.eml")
        );
        assert_matches!(
            Err(Error::UnknownAttribute { ref name, .. }) if name.is_empty(),
            PathPattern::parse("{}.eml")
        );
        assert_matches!(
            Err(Error::MalformedPattern { .. }),
            PathPattern::parse("{YEAR")
        );
        assert_matches!(
            Err(Error::MalformedPattern { .. }),
            PathPattern::parse("YEAR}")
        );
        assert_matches!(
            Err(Error::MalformedPattern { .. }),
            PathPattern::parse("{YE{AR}")
        );
    }

    #[test]
    fn test_join_with_base() {
        let base = Path::new("/home/x/mb");
        assert_eq!(
            Some("/home/x/mb/./2020/11/x.eml"),
            join_with_base(base, "./2020/11/x.eml").to_str()
        );
        assert_eq!(
            Some("/home/x/mb/2020/11/x.eml"),
            join_with_base(base, "2020/11/x.eml").to_str()
        );
        assert_eq!(
            Some("/home/x/mb/2020/11/x.eml"),
            join_with_base(Path::new("/home/x/mb/"), "2020/11/x.eml").to_str()
        );
        assert_eq!(
            Some("/2020/11/x.eml"),
            join_with_base(Path::new("/home/x/mb/"), "/2020/11/x.eml").to_str()
        );
    }
}
