//! Directive table
//!
//! Maps a directive code (`%h`, `%>s`, `%{Referer}i`, ...) to the rule that
//! extracts its value from an [`EventRecord`]. The set is closed: anything
//! the table does not know becomes [`Directive::Unknown`] and is rendered
//! through the fallback by the renderer.
//!
//! | Code | Rule |
//! |------|------|
//! | `%%` | literal `%` |
//! | `%h` | remote address |
//! | `%l` | remote logname (never tracked) |
//! | `%u` | authenticated user (never tracked) |
//! | `%t` | `[DD/Mon/YYYY:HH:mm:ss ±HHMM]` |
//! | `%r` | `METHOD URL HTTP/1.1` |
//! | `%s`, `%>s` | final status code |
//! | `%b` | response size in bytes |
//! | `%{Referer}i` | referer header |
//! | `%{User-agent}i` | user-agent header |

use std::borrow::Cow;

use crate::record::EventRecord;

/// strftime layout for `%t`
pub const REQUEST_TIME_FORMAT: &str = "[%d/%b/%Y:%H:%M:%S %z]";

/// Protocol reported by `%r`; the negotiated version is not recorded upstream
pub const REQUEST_PROTOCOL: &str = "HTTP/1.1";

/// Request headers available through `%{...}i`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Header {
    Referer,
    UserAgent,
}

impl Header {
    /// Look up a header by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("referer") {
            Some(Self::Referer)
        } else if name.eq_ignore_ascii_case("user-agent") {
            Some(Self::UserAgent)
        } else {
            None
        }
    }

    fn value(self, record: &EventRecord) -> Option<&str> {
        match self {
            Self::Referer => record.source.referer.as_deref(),
            Self::UserAgent => record.source.user_agent.as_deref(),
        }
    }
}

/// A rendering rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `%%`
    Percent,
    /// `%h`
    RemoteHost,
    /// `%l`
    RemoteLogname,
    /// `%u`
    RemoteUser,
    /// `%t`
    RequestTime,
    /// `%r`
    RequestLine,
    /// `%s` and `%>s`; no intermediate statuses are recorded
    Status,
    /// `%b`
    ResponseSize,
    /// `%{Name}i`
    RequestHeader(Header),
    /// Matches the directive grammar but has no rule
    Unknown,
}

/// Fixed-code part of the table
const TABLE: &[(&str, Directive)] = &[
    ("%%", Directive::Percent),
    ("%h", Directive::RemoteHost),
    ("%l", Directive::RemoteLogname),
    ("%u", Directive::RemoteUser),
    ("%t", Directive::RequestTime),
    ("%r", Directive::RequestLine),
    ("%s", Directive::Status),
    ("%>s", Directive::Status),
    ("%b", Directive::ResponseSize),
];

impl Directive {
    /// Resolve a directive code such as `%>s` or `%{User-agent}i`
    pub fn from_code(code: &str) -> Self {
        if let Some((_, directive)) = TABLE.iter().find(|(c, _)| *c == code) {
            return *directive;
        }

        code.strip_prefix("%{")
            .and_then(|rest| rest.strip_suffix("}i"))
            .and_then(Header::from_name)
            .map_or(Self::Unknown, Self::RequestHeader)
    }

    /// Whether the table has a rule for this directive
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Extract this directive's value from a record
    ///
    /// `None` means the record has nothing to show; the renderer substitutes
    /// the fallback for it.
    pub fn render<'a>(&self, record: &'a EventRecord) -> Option<Cow<'a, str>> {
        match self {
            Self::Percent => Some(Cow::Borrowed("%")),
            Self::RemoteLogname | Self::RemoteUser => Some(Cow::Borrowed("-")),
            Self::RemoteHost => record.source.remote_address.as_deref().map(Cow::Borrowed),
            Self::RequestTime => record
                .timestamp
                .map(|t| Cow::Owned(t.format(REQUEST_TIME_FORMAT).to_string())),
            Self::RequestLine => request_line(record).map(Cow::Owned),
            Self::Status => record.status_code.map(|s| Cow::Owned(s.to_string())),
            Self::ResponseSize => record
                .response_payload
                .as_ref()
                .map(|p| Cow::Owned(p.byte_len().to_string())),
            Self::RequestHeader(header) => header.value(record).map(Cow::Borrowed),
            Self::Unknown => None,
        }
    }
}

/// `METHOD URL HTTP/1.1`, preferring the URL captured when the request arrived
fn request_line(record: &EventRecord) -> Option<String> {
    let method = record.method.as_deref().filter(|m| !m.is_empty())?;
    let url = match record.received_url() {
        Some(url) => Cow::Borrowed(url),
        None => record.request_target()?,
    };
    Some(format!(
        "{} {} {}",
        method.to_uppercase(),
        url,
        REQUEST_PROTOCOL
    ))
}

#[cfg(test)]
#[path = "directive_test.rs"]
mod directive_test;
