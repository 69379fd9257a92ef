use std::fmt;
use std::sync::{Arc, RwLock};

/// Shared handle to the current access token.
///
/// Cloning is cheap and every clone sees the same token. The token is set
/// after OTP verification and cleared on logout or when the API answers
/// 401/403.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pre-loaded with a token, e.g. one passed on the command line.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let ctx = Self::new();
        ctx.set_token(token);
        ctx
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let value = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
        match self.token.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    pub fn clear(&self) {
        match self.token.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_token() {
        let ctx = AuthContext::new();
        let other = ctx.clone();
        ctx.set_token("abc");
        assert_eq!(other.token().as_deref(), Some("abc"));
        other.clear();
        assert!(!ctx.is_logged_in());
    }

    #[test]
    fn blank_token_counts_as_logged_out() {
        let ctx = AuthContext::with_token("   ");
        assert!(!ctx.is_logged_in());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let ctx = AuthContext::with_token("secret-token");
        assert!(!format!("{ctx:?}").contains("secret-token"));
    }
}
