//! Quoting and escaping of file names for display.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use unicode_width::UnicodeWidthChar;

use crate::entry::QuoteNeed;

/// How names are quoted on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotingStyle {
    #[default]
    Literal,
    Shell,
    ShellAlways,
    ShellEscape,
    ShellEscapeAlways,
    C,
    Escape,
}

impl QuotingStyle {
    /// Styles that quote some names but not others.
    pub fn has_variable_outer_quotes(self) -> bool {
        matches!(self, QuotingStyle::Shell | QuotingStyle::ShellEscape)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuotingOptions {
    pub style: QuotingStyle,
    /// Print non-graphic characters as `?` (`-q`).
    pub hide_control: bool,
}

/// A name rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedName {
    pub bytes: Vec<u8>,
    pub width: usize,
    pub outer_quotes: bool,
}

impl QuotedName {
    pub fn as_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

enum Segment<'a> {
    Text(&'a str),
    Invalid(&'a [u8]),
}

/// Split bytes into valid UTF-8 runs and invalid sequences.
fn segments(mut bytes: &[u8]) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.push(Segment::Text(s));
                break;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                if !valid.is_empty() {
                    // valid_up_to guarantees this prefix decodes
                    out.push(Segment::Text(std::str::from_utf8(valid).unwrap_or_default()));
                }
                let bad = e.error_len().unwrap_or(rest.len());
                out.push(Segment::Invalid(&rest[..bad]));
                bytes = &rest[bad..];
            }
        }
    }
    out
}

const SHELL_SPECIALS: &str = " \t\n!\"#$&'()*;<=>?[\\]^`{|}";

fn shell_needs_quoting(name: &[u8]) -> bool {
    if name.is_empty() || name[0] == b'~' {
        return true;
    }
    segments(name).iter().any(|seg| match seg {
        Segment::Invalid(_) => true,
        Segment::Text(s) => s.chars().any(|c| c.is_control() || SHELL_SPECIALS.contains(c)),
    })
}

fn c_escape(c: char) -> Option<&'static str> {
    Some(match c {
        '\x07' => "\\a",
        '\x08' => "\\b",
        '\x0c' => "\\f",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        '\x0b' => "\\v",
        _ => return None,
    })
}

fn push_octal(out: &mut String, bytes: &[u8]) {
    for b in bytes {
        out.push_str(&format!("\\{:03o}", b));
    }
}

fn push_escaped_char(out: &mut String, c: char) {
    if let Some(esc) = c_escape(c) {
        out.push_str(esc);
    } else if c.is_control() {
        let mut buf = [0u8; 4];
        push_octal(out, c.encode_utf8(&mut buf).as_bytes());
    } else {
        out.push(c);
    }
}

fn text_width(s: &str) -> usize {
    s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Render `name` in the requested quoting style.
pub fn quote_name(name: &OsStr, opts: &QuotingOptions) -> QuotedName {
    let raw = name.as_bytes();
    match opts.style {
        QuotingStyle::Literal => literal(raw, opts.hide_control),
        QuotingStyle::Escape => escaped(raw, false),
        QuotingStyle::C => escaped(raw, true),
        QuotingStyle::Shell | QuotingStyle::ShellAlways => {
            let always = opts.style == QuotingStyle::ShellAlways;
            shell(raw, always, false, opts.hide_control)
        }
        QuotingStyle::ShellEscape | QuotingStyle::ShellEscapeAlways => {
            let always = opts.style == QuotingStyle::ShellEscapeAlways;
            shell(raw, always, true, opts.hide_control)
        }
    }
}

/// Whether `name` gets outer quotes, evaluated only for styles where that varies.
pub fn outer_quote_need(name: &OsStr, opts: &QuotingOptions) -> QuoteNeed {
    if !opts.style.has_variable_outer_quotes() {
        return QuoteNeed::Unknown;
    }
    if quote_name(name, opts).outer_quotes {
        QuoteNeed::Quoted
    } else {
        QuoteNeed::Unquoted
    }
}

fn literal(raw: &[u8], hide_control: bool) -> QuotedName {
    if !hide_control {
        let width = segments(raw)
            .iter()
            .map(|seg| match seg {
                Segment::Text(s) => text_width(s),
                Segment::Invalid(b) => b.len(),
            })
            .sum();
        return QuotedName {
            bytes: raw.to_vec(),
            width,
            outer_quotes: false,
        };
    }
    let mut text = String::new();
    for seg in segments(raw) {
        match seg {
            Segment::Text(s) => {
                text.extend(s.chars().map(|c| if c.is_control() { '?' } else { c }))
            }
            Segment::Invalid(b) => text.extend(std::iter::repeat('?').take(b.len())),
        }
    }
    finish(text, false)
}

fn escaped(raw: &[u8], c_style: bool) -> QuotedName {
    let mut text = String::new();
    if c_style {
        text.push('"');
    }
    for seg in segments(raw) {
        match seg {
            Segment::Invalid(b) => push_octal(&mut text, b),
            Segment::Text(s) => {
                for c in s.chars() {
                    match c {
                        '\\' => text.push_str("\\\\"),
                        '"' if c_style => text.push_str("\\\""),
                        ' ' if !c_style => text.push_str("\\ "),
                        _ => push_escaped_char(&mut text, c),
                    }
                }
            }
        }
    }
    if c_style {
        text.push('"');
    }
    finish(text, c_style)
}

fn shell(raw: &[u8], always: bool, escape: bool, hide_control: bool) -> QuotedName {
    let needs = always || shell_needs_quoting(raw);
    let segs = segments(raw);

    let has_control = segs.iter().any(|seg| match seg {
        Segment::Invalid(_) => true,
        Segment::Text(s) => s.chars().any(char::is_control),
    });
    let printable = |out: &mut String, c: char| {
        if c.is_control() && hide_control {
            out.push('?');
        } else {
            out.push(c);
        }
    };

    if !needs {
        let mut text = String::new();
        for seg in &segs {
            if let Segment::Text(s) = seg {
                text.push_str(s);
            }
        }
        return finish(text, false);
    }

    // Prefer double quotes for names whose only problem is an apostrophe.
    let dq_hostile = |c: char| matches!(c, '"' | '$' | '`' | '\\' | '!');
    let simple_apostrophe = raw.contains(&b'\'')
        && !(escape && has_control)
        && segs.iter().all(|seg| match seg {
            Segment::Text(s) => !s.chars().any(dq_hostile),
            Segment::Invalid(_) => false,
        });
    if simple_apostrophe {
        let mut text = String::from("\"");
        for seg in &segs {
            if let Segment::Text(s) = seg {
                s.chars().for_each(|c| printable(&mut text, c));
            }
        }
        text.push('"');
        return finish(text, true);
    }

    let mut text = String::from("'");
    for seg in &segs {
        match seg {
            Segment::Invalid(b) if escape && !hide_control => {
                text.push_str("'$'");
                push_octal(&mut text, b);
                text.push_str("''");
            }
            Segment::Invalid(b) => text.extend(std::iter::repeat('?').take(b.len())),
            Segment::Text(s) => {
                for c in s.chars() {
                    if c == '\'' {
                        text.push_str("'\\''");
                    } else if c.is_control() && escape && !hide_control {
                        text.push_str("'$'");
                        push_escaped_char(&mut text, c);
                        text.push_str("''");
                    } else {
                        printable(&mut text, c);
                    }
                }
            }
        }
    }
    text.push('\'');
    // A literal apostrophe is always escaped, so a trailing `''` is an empty reopened segment.
    if text.len() > 4 && text.ends_with("'''") {
        text.truncate(text.len() - 2);
    }
    finish(text, true)
}

fn finish(text: String, outer_quotes: bool) -> QuotedName {
    let width = text_width(&text);
    QuotedName {
        bytes: text.into_bytes(),
        width,
        outer_quotes,
    }
}
