use crate::level::{LevelRegistry, Rank};
use crate::LoggerError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use std::fmt::Write;

/// Renders only the message text; used by raw sinks whatever the configured template.
pub const MESSAGE_ONLY_FORMAT: &str = "{message}";
/// `<timestamp> - <SEVERITY right-aligned to 7 chars> - <message>`
pub const TIMESTAMPED_FORMAT: &str = "{timestamp} - {level:>7} - {message}";
pub const DEFAULT_DATE_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Timestamp,
    Level { align: Align, width: usize },
    Message,
}

/// A compiled message template paired with a chrono strftime timestamp format.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    segments: Vec<Segment>,
    date_format: String,
}

impl LineFormatter {
    pub fn new(template: &str, date_format: &str) -> Result<Self, LoggerError> {
        if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
            return Err(LoggerError::LoggerConfigurationError {
                message: format!("Invalid timestamp format [{}]", date_format),
            });
        }
        Ok(Self { segments: parse_template(template)?, date_format: date_format.to_owned() })
    }

    pub fn message_only() -> Self {
        Self { segments: vec![Segment::Message], date_format: DEFAULT_DATE_FORMAT.to_owned() }
    }

    pub fn format(&self, rank: Rank, message: &str) -> String {
        self.format_at(&Local::now(), rank, message)
    }

    fn format_at(&self, timestamp: &DateTime<Local>, rank: Rank, message: &str) -> String {
        let mut line = String::with_capacity(message.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Message => line.push_str(message),
                Segment::Timestamp => {
                    // the date format was validated in new(), the write cannot fail
                    let _ = write!(line, "{}", timestamp.format(&self.date_format));
                }
                Segment::Level { align, width } => {
                    let name = LevelRegistry::display_name(rank);
                    let _ = match align {
                        Align::Left => write!(line, "{:<width$}", name, width = width),
                        Align::Right => write!(line, "{:>width$}", name, width = width),
                    };
                }
            }
        }
        line
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>, LoggerError> {
    let mut segments = vec![];
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(next);
                }
                if !closed {
                    return Err(template_error(template, "unclosed placeholder"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(parse_placeholder(template, &placeholder)?);
            }
            '}' => return Err(template_error(template, "unmatched '}'")),
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    if !segments.contains(&Segment::Message) {
        return Err(template_error(template, "missing the {message} placeholder"));
    }
    Ok(segments)
}

fn parse_placeholder(template: &str, placeholder: &str) -> Result<Segment, LoggerError> {
    let (name, spec) = match placeholder.find(':') {
        Some(index) => (&placeholder[..index], Some(&placeholder[index + 1..])),
        None => (placeholder, None),
    };
    match (name, spec) {
        ("timestamp", None) => Ok(Segment::Timestamp),
        ("message", None) => Ok(Segment::Message),
        ("level", None) => Ok(Segment::Level { align: Align::Left, width: 0 }),
        ("level", Some(spec)) => {
            let (align, width) = match spec.strip_prefix('>') {
                Some(width) => (Align::Right, width),
                None => (Align::Left, spec.strip_prefix('<').unwrap_or(spec)),
            };
            let width = width.parse::<usize>().map_err(|_| {
                template_error(template, &format!("invalid level width [{}]", spec))
            })?;
            Ok(Segment::Level { align, width })
        }
        _ => Err(template_error(template, &format!("unknown placeholder [{}]", placeholder))),
    }
}

fn template_error(template: &str, reason: &str) -> LoggerError {
    LoggerError::LoggerConfigurationError {
        message: format!("Cannot parse the log format [{}]: {}", template, reason),
    }
}
