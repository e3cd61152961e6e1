//! Line formatting for console and file handlers.
//!
//! Patterns use `%(key)[flags][width][.precision]type` placeholders, e.g.
//! `%(asctime)s %(levelname)-8s : %(message)s`. Keys that are not record
//! attributes are looked up among the event's extra fields.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use thiserror::Error;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::observability::record::LogRecord;

const DEFAULT_ASCTIME: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// A malformed line pattern or date format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unterminated placeholder at offset {0}")]
    Unterminated(usize),

    #[error("unsupported conversion '{conversion}' at offset {offset}")]
    Conversion { conversion: char, offset: usize },

    #[error("placeholder at offset {0} has an empty key")]
    EmptyKey(usize),

    #[error("invalid date format '{0}'")]
    DateFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Str,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    key: String,
    left_align: bool,
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed line pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePattern {
    segments: Vec<Segment>,
    keys: BTreeSet<String>,
}

impl LinePattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut keys = BTreeSet::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            match chars.next() {
                Some((_, '%')) => literal.push('%'),
                Some((_, '(')) => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some((_, ')')) => break,
                            Some((_, ch)) => key.push(ch),
                            None => return Err(PatternError::Unterminated(offset)),
                        }
                    }
                    if key.is_empty() {
                        return Err(PatternError::EmptyKey(offset));
                    }

                    let mut placeholder = Placeholder {
                        key,
                        left_align: false,
                        zero_pad: false,
                        width: None,
                        precision: None,
                        conversion: Conversion::Str,
                    };

                    while let Some(&(_, flag)) = chars.peek() {
                        match flag {
                            '-' => placeholder.left_align = true,
                            '0' => placeholder.zero_pad = true,
                            ' ' | '+' | '#' => {}
                            _ => break,
                        }
                        chars.next();
                    }

                    placeholder.width = take_number(&mut chars);
                    if chars.peek().map(|&(_, ch)| ch) == Some('.') {
                        chars.next();
                        placeholder.precision = Some(take_number(&mut chars).unwrap_or(0));
                    }

                    placeholder.conversion = match chars.next() {
                        Some((_, 's' | 'r')) => Conversion::Str,
                        Some((_, 'd' | 'i')) => Conversion::Int,
                        Some((_, 'f')) => Conversion::Float,
                        Some((at, other)) => {
                            return Err(PatternError::Conversion { conversion: other, offset: at })
                        }
                        None => return Err(PatternError::Unterminated(offset)),
                    };

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    keys.insert(placeholder.key.clone());
                    segments.push(Segment::Field(placeholder));
                }
                Some((at, other)) => {
                    return Err(PatternError::Conversion { conversion: other, offset: at })
                }
                None => return Err(PatternError::Unterminated(offset)),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments, keys })
    }

    /// Whether the pattern references `key`.
    pub fn references(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

fn take_number<I>(chars: &mut std::iter::Peekable<I>) -> Option<usize>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut digits = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if !ch.is_ascii_digit() {
            break;
        }
        digits.push(ch);
        chars.next();
    }
    digits.parse().ok()
}

enum Value<'a> {
    Text(std::borrow::Cow<'a, str>),
    Int(i64),
    Float(f64),
}

/// Renders records with a [`LinePattern`] and optional date format.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    pattern: LinePattern,
    datefmt: Option<String>,
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self {
            pattern: LinePattern {
                segments: vec![Segment::Field(Placeholder {
                    key: "message".to_string(),
                    left_align: false,
                    zero_pad: false,
                    width: None,
                    precision: None,
                    conversion: Conversion::Str,
                })],
                keys: BTreeSet::from(["message".to_string()]),
            },
            datefmt: None,
        }
    }
}

impl LineFormatter {
    pub fn new(pattern: LinePattern, datefmt: Option<String>) -> Result<Self, PatternError> {
        if let Some(fmt) = &datefmt {
            if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                return Err(PatternError::DateFormat(fmt.clone()));
            }
        }
        Ok(Self { pattern, datefmt })
    }

    /// Render one record, without a trailing newline.
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::new();
        for segment in &self.pattern.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(placeholder) => {
                    let value = self.lookup(record, &placeholder.key);
                    render(&mut out, placeholder, value);
                }
            }
        }

        for (key, value) in &record.fields {
            if !self.pattern.references(key) {
                let _ = write!(out, " {}={}", key, value);
            }
        }
        out
    }

    fn lookup<'a>(&self, record: &'a LogRecord, key: &str) -> Value<'a> {
        match key {
            "message" => Value::Text(record.message.as_str().into()),
            "name" => Value::Text(record.name.as_str().into()),
            "levelname" => Value::Text(record.levelname().into()),
            "levelno" => Value::Int(record.levelno()),
            "asctime" => {
                let fmt = self.datefmt.as_deref().unwrap_or(DEFAULT_ASCTIME);
                let mut stamp = String::new();
                let _ = write!(stamp, "{}", record.timestamp.format(fmt));
                Value::Text(stamp.into())
            }
            "created" => Value::Float(record.created()),
            "filename" => Value::Text(record.filename().into()),
            "pathname" => Value::Text(record.file.as_deref().unwrap_or("").into()),
            "module" => Value::Text(record.module().into()),
            "lineno" => Value::Int(record.line.map(i64::from).unwrap_or(0)),
            "process" => Value::Int(i64::from(std::process::id())),
            other => Value::Text(record.field(other).unwrap_or("-").into()),
        }
    }
}

fn render(out: &mut String, placeholder: &Placeholder, value: Value<'_>) {
    let text = match (placeholder.conversion, value) {
        (Conversion::Float, Value::Float(f)) => format!("{:.*}", placeholder.precision.unwrap_or(6), f),
        (Conversion::Float, Value::Int(n)) => format!("{:.*}", placeholder.precision.unwrap_or(6), n as f64),
        (Conversion::Int, Value::Float(f)) => format!("{}", f.trunc() as i64),
        (Conversion::Str, Value::Text(t)) => match placeholder.precision {
            Some(max) => t.chars().take(max).collect(),
            None => t.into_owned(),
        },
        (_, Value::Text(t)) => t.into_owned(),
        (_, Value::Int(n)) => n.to_string(),
        (_, Value::Float(f)) => f.to_string(),
    };

    let width = placeholder.width.unwrap_or(0);
    let len = text.chars().count();
    if len >= width {
        out.push_str(&text);
    } else if placeholder.left_align {
        out.push_str(&text);
        out.extend(std::iter::repeat(' ').take(width - len));
    } else {
        let pad = if placeholder.zero_pad && placeholder.conversion != Conversion::Str { '0' } else { ' ' };
        out.extend(std::iter::repeat(pad).take(width - len));
        out.push_str(&text);
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let record = LogRecord::from_event(event);
        writeln!(writer, "{}", self.format(&record))
    }
}
