//! Codec Harness CLI library
//!
//! Registry assembly for the shipped plugin kinds, the codec option string
//! parser and typed encode wrappers. The `codec-harness` binary is a thin
//! layer over these.

pub mod parser;
pub mod registry_helper;
pub mod shortcuts;

pub use parser::{parse_codec_options, ParseError};
pub use registry_helper::{build_registry, builtin_factories, builtin_manifests};
pub use shortcuts::{encode_av1, encode_h264, Av1Params, H264Params};
