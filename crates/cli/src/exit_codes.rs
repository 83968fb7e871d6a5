//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                                |
//! |---------|------------------|--------------------------------------------|
//! | 0       | Universal        | Success                                    |
//! | 1       | Universal        | General error (unspecified)                |
//! | 2       | Universal        | CLI usage error (bad args, bad schema)     |
//! | 3-9     | files            | IO, response parsing, export               |
//! | 10-19   | ai               | Provider configuration / keychain          |
//! | 20-29   | session          | Editing session file                       |
//! | 50-59   | engine           | Extraction engine calls                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable image, invalid schema descriptor.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Files (3-9)
// =============================================================================

/// Cannot read or write a file (response text, CSV, session).
pub const EXIT_IO: u8 = 3;

/// Engine response (or edited CSV) could not be parsed. Session untouched.
pub const EXIT_PARSE: u8 = 4;

/// Spreadsheet export failed.
pub const EXIT_EXPORT: u8 = 5;

// =============================================================================
// AI (10-19)
// =============================================================================

/// Provider set to "none"; extraction is unavailable.
pub const EXIT_AI_DISABLED: u8 = 10;

/// Provider configured but API key missing.
pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// Keychain error (cannot read/write credentials).
pub const EXIT_AI_KEYCHAIN_ERR: u8 = 12;

// =============================================================================
// Session (20-29)
// =============================================================================

/// Command needs a session table and there is none (run extract/ingest first).
pub const EXIT_NO_SESSION: u8 = 20;

// =============================================================================
// Engine (50-59)
// =============================================================================

/// Provider rejected the credentials (401/403).
pub const EXIT_ENGINE_AUTH: u8 = 50;

/// Provider rejected the request (400 / other 4xx).
pub const EXIT_ENGINE_REJECTED: u8 = 51;

/// Provider rate limit hit (429). Not retried automatically.
pub const EXIT_ENGINE_RATE_LIMIT: u8 = 52;

/// Provider 5xx or network failure.
pub const EXIT_ENGINE_UPSTREAM: u8 = 53;

/// Call exceeded the configured timeout.
pub const EXIT_ENGINE_TIMEOUT: u8 = 54;

/// Provider answered but the envelope held no text.
pub const EXIT_ENGINE_EMPTY: u8 = 55;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_PARSE,
            EXIT_EXPORT,
            EXIT_AI_DISABLED,
            EXIT_AI_MISSING_KEY,
            EXIT_AI_KEYCHAIN_ERR,
            EXIT_NO_SESSION,
            EXIT_ENGINE_AUTH,
            EXIT_ENGINE_REJECTED,
            EXIT_ENGINE_RATE_LIMIT,
            EXIT_ENGINE_UPSTREAM,
            EXIT_ENGINE_TIMEOUT,
            EXIT_ENGINE_EMPTY,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
