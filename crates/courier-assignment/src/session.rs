//! Explicit authentication context.

use std::fmt;

/// Caller-owned authentication context passed into every backend call.
///
/// Nothing in this crate stores a session; whoever holds it controls its
/// lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

// Never print the token
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::new("secret-token");
        assert_eq!(session.access_token(), "secret-token");
        assert!(!format!("{:?}", session).contains("secret-token"));
    }
}
