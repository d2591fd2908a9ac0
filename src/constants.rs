//! Common constants used throughout the sourcegen application.

/// Prefix of the sibling temporary files used for atomic output writes
pub const TEMP_FILE_PREFIX: &str = ".sourcegen-";

/// Source lines wider than this are not echoed in diagnostics
pub const MAX_DIAGNOSTIC_WIDTH: usize = 60;
