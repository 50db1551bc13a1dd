//! Document store status codes
//!
//! The store reports outcomes as signed numeric status codes. Zero is
//! success; everything else maps to a fixed human-readable message. Unknown
//! codes render a generic message instead of failing the lookup.

/// Successful operation.
pub const OK: i32 = 0;

/// Document already checked out (held by another user).
pub const ALREADY_CHECKED_OUT: i32 = -50146;
/// Document already checked out by the current user.
pub const ALREADY_CHECKED_OUT_BY_SELF: i32 = 50011;
/// Annotation group already exists on the document.
pub const ANNOTATION_EXISTS: i32 = -50090;

/// True for the two conflict codes that mean "the lock is already taken".
pub fn is_lock_conflict(code: i32) -> bool {
    code == ALREADY_CHECKED_OUT || code == ALREADY_CHECKED_OUT_BY_SELF
}

/// Fixed message for a store status code.
pub fn status_message(code: i32) -> String {
    match code {
        -1011 => "insufficient rights - user cannot modify this document".to_string(),
        -1001 => "invalid session - session may have expired".to_string(),
        -1002 => "invalid cabinet name".to_string(),
        -1003 => "document not found".to_string(),
        -1004 => "document is locked by another user".to_string(),
        -1005 => "invalid document index".to_string(),
        ALREADY_CHECKED_OUT => "document already checked out".to_string(),
        ALREADY_CHECKED_OUT_BY_SELF => "document already checked out by current user".to_string(),
        -1010 => "user not found in cabinet".to_string(),
        -1012 => "document is read-only".to_string(),
        -1013 => "document version mismatch".to_string(),
        other => format!("unknown error code: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_have_fixed_messages() {
        assert_eq!(status_message(-1003), "document not found");
        assert_eq!(status_message(-1012), "document is read-only");
        assert_eq!(status_message(-1013), "document version mismatch");
    }

    #[test]
    fn test_unknown_code_renders_generic_message() {
        assert_eq!(status_message(-9999), "unknown error code: -9999");
    }

    #[test]
    fn test_lock_conflict_codes() {
        assert!(is_lock_conflict(ALREADY_CHECKED_OUT));
        assert!(is_lock_conflict(ALREADY_CHECKED_OUT_BY_SELF));
        assert!(!is_lock_conflict(OK));
        assert!(!is_lock_conflict(-1004));
    }
}
