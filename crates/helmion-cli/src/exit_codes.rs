//! Process exit codes, one per error kind
//!
//! Argument errors are reported by clap with its own exit code (2), so
//! codes here start above it.

use helmion_core::ErrorKind;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Bad chart or repository data (invalid versions, unknown apiVersion, cycles)
pub const CONFIGURATION_ERROR: i32 = 3;

/// Invalid arguments, unknown chart or version
pub const PARAMETER_ERROR: i32 = 4;

/// File, archive or parse failure
pub const IO_ERROR: i32 = 5;

/// Repository unreachable or HTTP failure
pub const NETWORK_ERROR: i32 = 6;

/// Template engine failed or produced unusable output
pub const TEMPLATE_ERROR: i32 = 7;

pub fn for_kind(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Configuration => CONFIGURATION_ERROR,
        ErrorKind::Parameter => PARAMETER_ERROR,
        ErrorKind::InputOutput => IO_ERROR,
        ErrorKind::Network => NETWORK_ERROR,
        ErrorKind::TemplateEngine => TEMPLATE_ERROR,
    }
}
