// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Runtime Name Sanitizer Domain Service
//!
//! Maps caller-assigned logical identifiers onto the control plane's runtime
//! naming constraint: alphabetic first character, `[A-Za-z0-9_]` only, at
//! most 48 characters.

use crate::domain::runtime::ProvisionError;

/// Maximum runtime name length accepted by the control plane.
pub const MAX_RUNTIME_NAME_LEN: usize = 48;

/// Prepended when the logical identifier does not start with a letter.
const NAME_FILLER: char = 'a';

/// Derive a provider-legal runtime name from a logical identifier.
///
/// The mapping is deterministic and lossy: every character outside
/// `[A-Za-z0-9_]` is replaced with `_` (one-to-one, never collapsed), a
/// filler letter is prepended when the first character is not alphabetic,
/// and the result is truncated to [`MAX_RUNTIME_NAME_LEN`] characters.
/// Distinct logical identifiers can therefore collide on the same runtime
/// name; collisions are not detected here.
pub fn sanitize_runtime_name(logical_id: &str) -> Result<String, ProvisionError> {
    if logical_id.is_empty() {
        return Err(ProvisionError::InvalidInput(
            "logical identifier must not be empty".to_string(),
        ));
    }

    let mut name: String = logical_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name.insert(0, NAME_FILLER);
    }

    // All characters are ASCII at this point, so the byte index is a
    // character index.
    name.truncate(MAX_RUNTIME_NAME_LEN);

    Ok(name)
}
