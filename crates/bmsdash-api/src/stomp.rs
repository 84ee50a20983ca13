//! STOMP 1.2 text frame codec.
//!
//! A frame is `COMMAND EOL *(header EOL) EOL body NUL`. Each WebSocket text
//! message carries exactly one frame; a message holding only EOLs is a
//! heart-beat and decodes to `None`.
//!
//! Header values are escaped (`\\`, `\n`, `\r`, `\c`) on every command except
//! `CONNECT` and `CONNECTED`, which keep their values verbatim for
//! compatibility with 1.0 brokers.

use std::fmt::Write as _;

use strum::{AsRefStr, Display, EnumString};

use crate::error::Error;

/// Client and server frame commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Command {
    // Client frames
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    // Server frames
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

/// One STOMP frame.
///
/// Headers keep insertion order; repeated names are allowed and the first
/// occurrence wins on lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to the wire form, NUL terminator included.
    ///
    /// A `content-length` header is added for non-empty bodies unless the
    /// caller already set one.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_ref());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.get("content-length").is_none() {
            let _ = writeln!(out, "content-length:{}", self.body.len());
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame from a text message.
    ///
    /// Returns `Ok(None)` for heart-beats. Accepts both `\n` and `\r\n`
    /// line endings.
    pub fn decode(text: &str) -> Result<Option<Self>, Error> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() || text == "\0" {
            return Ok(None);
        }

        let (head, rest) = split_head(text)
            .ok_or_else(|| Error::Stomp("frame has no header terminator".into()))?;

        let mut lines = head.lines();
        let command_line = lines.next().unwrap_or_default().trim_end();
        let command: Command = command_line
            .parse()
            .map_err(|_| Error::Stomp(format!("unknown command {command_line:?}")))?;

        let escaped = command.escapes_headers();
        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Stomp(format!("malformed header line {line:?}")))?;
            if escaped {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_owned(), value.to_owned()));
            }
        }

        let declared_len = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| Error::Stomp(format!("invalid content-length {v:?}")))
            })
            .transpose()?;

        let body = match declared_len {
            Some(len) => rest
                .get(..len)
                .ok_or_else(|| Error::Stomp(format!("body shorter than content-length {len}")))?,
            None => rest.split('\0').next().unwrap_or_default(),
        };

        Ok(Some(Self {
            command,
            headers,
            body: body.to_owned(),
        }))
    }
}

/// Split at the first blank line, whichever line ending it uses.
fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let (at, skip) = match (lf, crlf) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    Some((&text[..at], &text[at + skip..]))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(Error::Stomp(format!(
                    "undefined escape sequence \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

// ── Tests ────────────────────────────────────────────────────────────
