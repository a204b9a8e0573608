use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Yes/no answer, encoded on the wire as 1/2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    /// Target present
    Yes,
    /// Target absent
    No,
}

impl Answer {
    pub fn code(self) -> u8 {
        match self {
            Self::Yes => 1,
            Self::No => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Yes),
            2 => Some(Self::No),
            _ => None,
        }
    }

    pub fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for Answer {
    fn from(target_present: bool) -> Self {
        if target_present { Self::Yes } else { Self::No }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordParseError {
    #[error("row does not start with a quoted experiment id")]
    MissingQuote,
    #[error("unterminated experiment id")]
    UnterminatedId,
    #[error("invalid escape sequence in experiment id")]
    BadEscape,
    #[error("expected 6 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// One completed trial, as handed to a result sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub experiment_id: String,
    pub epoch: i64,
    pub trial_index: u64,
    pub expected: Answer,
    pub response: Answer,
    pub display_time: Duration,
}

/// Form body for network submission. Field names are part of the collection
/// endpoint's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFields {
    pub experiment_id: String,
    pub epoch: String,
    pub idx: String,
    pub expect: String,
    pub response: String,
    pub display_time: String,
}

impl ResultRecord {
    pub fn is_correct(&self) -> bool {
        self.expected == self.response
    }

    pub fn display_seconds(&self) -> String {
        format!("{:.3}", self.display_time.as_secs_f64())
    }

    /// `"<id>",<epoch>,<idx>,<expect>,<response>,<seconds %.3f>` with no
    /// trailing newline
    pub fn to_row(&self) -> String {
        self.to_string()
    }

    pub fn parse_row(row: &str) -> Result<Self, RecordParseError> {
        let (experiment_id, rest) = unquote(row)?;
        let rest = rest.strip_prefix(',').ok_or(RecordParseError::FieldCount(1))?;
        let fields: Vec<&str> = rest.split(',').collect();
        if fields.len() != 5 {
            return Err(RecordParseError::FieldCount(fields.len() + 1));
        }

        let epoch = parse_field::<i64>("epoch", fields[0])?;
        let trial_index = parse_field::<u64>("trial index", fields[1])?;
        let expected = parse_answer("expected answer", fields[2])?;
        let response = parse_answer("response", fields[3])?;
        let seconds = parse_field::<f64>("display time", fields[4])?;
        let display_time = Duration::try_from_secs_f64(seconds).map_err(|_| {
            RecordParseError::InvalidField {
                field: "display time",
                value: fields[4].to_string(),
            }
        })?;

        Ok(Self {
            experiment_id,
            epoch,
            trial_index,
            expected,
            response,
            display_time,
        })
    }

    pub fn form_fields(&self) -> FormFields {
        FormFields {
            experiment_id: self.experiment_id.clone(),
            epoch: self.epoch.to_string(),
            idx: self.trial_index.to_string(),
            expect: self.expected.code().to_string(),
            response: self.response.code().to_string(),
            display_time: self.display_seconds(),
        }
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            quote(&self.experiment_id),
            self.epoch,
            self.trial_index,
            self.expected.code(),
            self.response.code(),
            self.display_seconds(),
        )
    }
}

impl FromStr for ResultRecord {
    type Err = RecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_row(s)
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, RecordParseError> {
    value.parse().map_err(|_| RecordParseError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn parse_answer(field: &'static str, value: &str) -> Result<Answer, RecordParseError> {
    parse_field::<u8>(field, value)
        .ok()
        .and_then(Answer::from_code)
        .ok_or_else(|| RecordParseError::InvalidField {
            field,
            value: value.to_string(),
        })
}

fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control()
        || c.is_whitespace()
        || matches!(
            c,
            '\u{ad}'
                | '\u{600}'..='\u{605}'
                | '\u{61c}'
                | '\u{180e}'
                | '\u{200b}'..='\u{200f}'
                | '\u{202a}'..='\u{202e}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{206f}'
                | '\u{feff}'
                | '\u{fff9}'..='\u{fffb}'
                | '\u{e0001}'
                | '\u{e0020}'..='\u{e007f}'
        ))
}

/// Double-quotes `s` for the result row.
///
/// `"` and `\` are backslash-escaped and printable characters are kept as
/// is. Other characters use `\a \b \f \n \r \t \v`, then `\xHH` for the
/// remaining ASCII controls, `\uHHHH` inside the BMP and `\UHHHHHHHH`
/// above it. Hex digits are lowercase.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if is_printable(c) => out.push(c),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if c < ' ' || c == '\u{7f}' => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}

fn read_hex(chars: &mut std::str::CharIndices<'_>, digits: usize) -> Result<char, RecordParseError> {
    let mut code = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|(_, h)| h.to_digit(16))
            .ok_or(RecordParseError::BadEscape)?;
        code = code * 16 + digit;
    }
    char::from_u32(code).ok_or(RecordParseError::BadEscape)
}

/// Reads a string written by [`quote`] off the front of `s`, returning it
/// unescaped together with the remainder after the closing quote. The
/// braced `\u{..}` form of older rows is accepted too.
fn unquote(s: &str) -> Result<(String, &str), RecordParseError> {
    let body = s.strip_prefix('"').ok_or(RecordParseError::MissingQuote)?;
    let mut out = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &body[i + 1..])),
            '\\' => {
                let (_, esc) = chars.next().ok_or(RecordParseError::UnterminatedId)?;
                out.push(match esc {
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    'a' => '\u{7}',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\u{b}',
                    '0' => '\0',
                    'x' => read_hex(&mut chars, 2)?,
                    'U' => read_hex(&mut chars, 8)?,
                    'u' if body[i + 2..].starts_with('{') => {
                        chars.next();
                        let mut hex = String::new();
                        loop {
                            match chars.next() {
                                Some((_, '}')) => break,
                                Some((_, h)) if h.is_ascii_hexdigit() => hex.push(h),
                                _ => return Err(RecordParseError::BadEscape),
                            }
                        }
                        u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or(RecordParseError::BadEscape)?
                    }
                    'u' => read_hex(&mut chars, 4)?,
                    _ => return Err(RecordParseError::BadEscape),
                });
            }
            other => out.push(other),
        }
    }
    Err(RecordParseError::UnterminatedId)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ResultRecord {
        ResultRecord {
            experiment_id: id.to_string(),
            epoch: 1_600_000_000,
            trial_index: 3,
            expected: Answer::Yes,
            response: Answer::No,
            display_time: Duration::from_micros(97_400),
        }
    }

    #[test]
    fn row_matches_file_contract() {
        assert_eq!(record("pilot").to_row(), "\"pilot\",1600000000,3,1,2,0.097");
    }

    #[test]
    fn row_has_no_trailing_newline() {
        assert!(!record("x").to_row().ends_with('\n'));
    }

    #[test]
    fn quotes_and_commas_in_id_survive_a_round_trip() {
        let original = record("a \"b\", c\\d\n\te\u{1}");
        let row = original.to_row();
        assert!(row.starts_with("\"a \\\"b\\\", c\\\\d\\n\\te\\x01\","));

        let parsed: ResultRecord = row.parse().expect("parse");
        assert_eq!(parsed.experiment_id, original.experiment_id);
        assert_eq!(parsed.epoch, original.epoch);
        assert_eq!(parsed.trial_index, original.trial_index);
        assert_eq!(parsed.expected, original.expected);
        assert_eq!(parsed.response, original.response);
        assert_eq!(parsed.display_seconds(), original.display_seconds());
    }

    #[test]
    fn non_printing_characters_use_fixed_width_escapes() {
        assert_eq!(quote("pilot"), "\"pilot\"");
        assert_eq!(
            quote("\u{7}\u{1}\u{7f}\u{b}\u{85}\u{200b}\u{e0001}"),
            "\"\\a\\x01\\x7f\\v\\u0085\\u200b\\U000e0001\""
        );
        assert_eq!(quote("é ü 😀 'x'"), "\"é ü 😀 'x'\"");
    }

    #[test]
    fn every_escape_form_unquotes() {
        let row = "\"\\a\\x01\\u00e9\\U0001f600\\u{1}\\'\",1,2,1,2,0.090";
        let parsed = ResultRecord::parse_row(row).expect("parse");
        assert_eq!(parsed.experiment_id, "\u{7}\u{1}é😀\u{1}'");

        assert_eq!(
            ResultRecord::parse_row("\"\\x1\",1,2,1,2,0.1"),
            Err(RecordParseError::BadEscape)
        );
        assert_eq!(
            ResultRecord::parse_row("\"\\ud800\",1,2,1,2,0.1"),
            Err(RecordParseError::BadEscape)
        );
    }

    #[test]
    fn display_time_rounds_to_milliseconds() {
        let mut r = record("x");
        r.display_time = Duration::from_micros(90_499);
        assert_eq!(r.display_seconds(), "0.090");
        r.display_time = Duration::from_micros(105_600);
        assert_eq!(r.display_seconds(), "0.106");
    }

    #[test]
    fn form_fields_use_row_encodings() {
        let fields = record("pilot").form_fields();
        assert_eq!(
            fields,
            FormFields {
                experiment_id: "pilot".into(),
                epoch: "1600000000".into(),
                idx: "3".into(),
                expect: "1".into(),
                response: "2".into(),
                display_time: "0.097".into(),
            }
        );
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert_eq!(
            ResultRecord::parse_row("pilot,1,2,1,2,0.1"),
            Err(RecordParseError::MissingQuote)
        );
        assert_eq!(
            ResultRecord::parse_row("\"pilot,1,2,1,2,0.1"),
            Err(RecordParseError::UnterminatedId)
        );
        assert_eq!(
            ResultRecord::parse_row("\"pilot\",1,2,1,2"),
            Err(RecordParseError::FieldCount(5))
        );
        assert!(matches!(
            ResultRecord::parse_row("\"pilot\",1,2,3,2,0.1"),
            Err(RecordParseError::InvalidField { field: "expected answer", .. })
        ));
        assert!(matches!(
            ResultRecord::parse_row("\"pilot\",1,2,1,2,-0.1"),
            Err(RecordParseError::InvalidField { field: "display time", .. })
        ));
    }

    #[test]
    fn answer_codes() {
        assert_eq!(Answer::from(true).code(), 1);
        assert_eq!(Answer::from(false).code(), 2);
        assert_eq!(Answer::from_code(2), Some(Answer::No));
        assert_eq!(Answer::from_code(0), None);
    }
}
