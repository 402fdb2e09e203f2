#![warn(rust_2018_idioms)]

/// Reading of binary data.
pub mod binary;
pub mod bidi;
pub mod context;
pub mod error;
pub mod font;
pub mod gdef;
pub mod gpos;
pub mod gsub;
pub mod layout;
pub mod scripts;
pub mod string_record;
pub mod tables;
pub mod tag;
pub mod text;
/// Shared test code.
#[cfg(test)]
pub mod tests;

pub use font::{Font, FontEngine};
pub use text::{Point, Text, TextAlignment};
