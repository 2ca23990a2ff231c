//! Codec option string parser
//!
//! Parses strings like `"crf=18,preset=slow,fragmented_mp4=false"` into
//! typed [`CodecOptions`].

use codec_harness_core::{CodecOptions, OptionValue};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Codec option '{item}' at position {position} is not a key=value pair")]
    MissingEquals { position: usize, item: String },

    #[error("Empty option name at position {position}: {item}")]
    EmptyKey { position: usize, item: String },

    #[error("Option '{key}' given more than once")]
    DuplicateKey { key: String },
}

/// Parse a comma-separated `key=value` list.
///
/// # Syntax
///
/// - **Commas (`,`)**: separate options; empty items are ignored
/// - **First `=`**: separates name and value, so values may contain `=`
/// - Values are typed: `true`/`false` are booleans, integer and float
///   literals are numbers, anything else is a string
///
/// An empty or blank input yields no options.
///
/// # Examples
///
/// ```text
/// "crf=18,preset=slow" → {crf: 18, preset: "slow"}
/// "x264-params=keyint=60" → {x264-params: "keyint=60"}
/// ```
pub fn parse_codec_options(input: &str) -> Result<CodecOptions, ParseError> {
    let mut options = CodecOptions::new();

    for (position, item) in input.split(',').enumerate() {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let (key, value) = item.split_once('=').ok_or_else(|| ParseError::MissingEquals {
            position,
            item: item.to_string(),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::EmptyKey {
                position,
                item: item.to_string(),
            });
        }
        if options.contains_key(key) {
            return Err(ParseError::DuplicateKey {
                key: key.to_string(),
            });
        }

        options.insert(key, OptionValue::parse_literal(value));
    }

    Ok(options)
}
