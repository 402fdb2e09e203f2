use crate::error::ParseError;
use std::fmt;

/// Generate a 4-byte font table tag from byte string
///
/// Example:
///
/// ```ignore
/// assert_eq!(tag!(b"GSUB"), 0x47535542);
/// ```
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    ((chars[3] as u32) << 0)
        | ((chars[2] as u32) << 8)
        | ((chars[1] as u32) << 16)
        | ((chars[0] as u32) << 24)
}

pub fn from_string(s: &str) -> Result<u32, ParseError> {
    if s.len() > 4 {
        return Err(ParseError::BadValue);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(ParseError::BadValue);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.0;
        let mut s = String::with_capacity(4);
        s.push(char::from((tag >> 24) as u8));
        s.push(char::from(((tag >> 16) & 255) as u8));
        s.push(char::from(((tag >> 8) & 255) as u8));
        s.push(char::from((tag & 255) as u8));
        if s.chars().any(|c| !c.is_ascii() || c.is_ascii_control()) {
            write!(f, "0x{:08x}", tag)
        } else {
            s.fmt(f)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

pub const ARAB: u32 = tag!(b"arab");
pub const CALT: u32 = tag!(b"calt");
pub const CCMP: u32 = tag!(b"ccmp");
pub const CMAP: u32 = tag!(b"cmap");
pub const CURS: u32 = tag!(b"curs");
pub const DFLT: u32 = tag!(b"DFLT");
pub const FINA: u32 = tag!(b"fina");
pub const GDEF: u32 = tag!(b"GDEF");
pub const GPOS: u32 = tag!(b"GPOS");
pub const GSUB: u32 = tag!(b"GSUB");
pub const INIT: u32 = tag!(b"init");
pub const ISOL: u32 = tag!(b"isol");
pub const KERN: u32 = tag!(b"kern");
pub const LATN: u32 = tag!(b"latn");
pub const LIGA: u32 = tag!(b"liga");
pub const MARK: u32 = tag!(b"mark");
pub const MEDI: u32 = tag!(b"medi");
pub const MKMK: u32 = tag!(b"mkmk");
pub const RLIG: u32 = tag!(b"rlig");

#[cfg(test)]
mod tests {
    use super::*;

    mod from_string {
        use super::*;

        #[test]
        fn test_four_chars() {
            let tag = from_string("arab").expect("invalid tag");

            assert_eq!(tag, ARAB);
        }

        #[test]
        fn test_three_chars() {
            let tag = from_string("ARA").expect("invalid tag");

            assert_eq!(tag, 0x41524120);
        }

        #[test]
        fn test_too_long() {
            assert!(from_string("arabic").is_err());
        }
    }

    mod display_tag {
        use crate::tag::{DisplayTag, MKMK};

        #[test]
        fn test_ascii() {
            assert_eq!(DisplayTag(MKMK).to_string(), "mkmk".to_string());
        }

        #[test]
        fn test_non_ascii() {
            assert_eq!(DisplayTag(0x12345678).to_string(), "0x12345678".to_string());
        }
    }
}
