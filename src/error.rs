//! Error types

use crate::binary::read::ReadEof;
use crate::tag::DisplayTag;
use std::fmt;
use std::path::PathBuf;

/// Errors that originate when parsing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    BadVersion,
    BadOffset,
    BadIndex,
    LimitExceeded,
    MissingValue,
    MissingTable(u32),
    NotImplemented,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadVersion => write!(f, "unexpected data version"),
            ParseError::BadOffset => write!(f, "invalid data offset"),
            ParseError::BadIndex => write!(f, "invalid data index"),
            ParseError::LimitExceeded => write!(f, "limit exceeded"),
            ParseError::MissingValue => write!(f, "an expected data value was missing"),
            ParseError::MissingTable(tag) => {
                write!(f, "font is missing '{}' table", DisplayTag(*tag))
            }
            ParseError::NotImplemented => write!(f, "feature not implemented"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A font table that was present but could not be decoded
///
/// Decode errors are absorbed by the font: the table is logged and treated as absent.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DecodeError {
    pub tag: u32,
    pub error: ParseError,
}

impl DecodeError {
    pub fn new(tag: u32, error: ParseError) -> Self {
        DecodeError { tag, error }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to decode '{}' table: {}", DisplayTag(self.tag), self.error)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Error returned when a font face cannot be created
#[derive(Debug)]
pub enum FontLoadError {
    NotFound(PathBuf),
    Io(std::io::Error),
    /// The font engine rejected the face
    Face(String),
    Parse(ParseError),
}

impl From<std::io::Error> for FontLoadError {
    fn from(error: std::io::Error) -> Self {
        FontLoadError::Io(error)
    }
}

impl From<ParseError> for FontLoadError {
    fn from(error: ParseError) -> Self {
        FontLoadError::Parse(error)
    }
}

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontLoadError::NotFound(path) => write!(f, "font file not found: {}", path.display()),
            FontLoadError::Io(err) => write!(f, "font io: {}", err),
            FontLoadError::Face(msg) => write!(f, "unable to create font face: {}", msg),
            FontLoadError::Parse(err) => write!(f, "font parse: {}", err),
        }
    }
}

impl std::error::Error for FontLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FontLoadError::Io(err) => Some(err),
            FontLoadError::Parse(err) => Some(err),
            FontLoadError::NotFound(_) | FontLoadError::Face(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag;

    #[test]
    fn decode_error_names_table() {
        let err = DecodeError::new(tag::GPOS, ParseError::BadOffset);
        assert_eq!(
            err.to_string(),
            "unable to decode 'GPOS' table: invalid data offset"
        );
    }

    #[test]
    fn font_load_error_display() {
        let err = FontLoadError::NotFound(PathBuf::from("missing.ttf"));
        assert_eq!(err.to_string(), "font file not found: missing.ttf");
    }
}
