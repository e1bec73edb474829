//! The authorization sub-dialog: a caller-installed credential provider
//! answers `resource → (username, password)`, and an optional
//! MD5-challenge helper for the wire form the daemon is *not* sent by
//! default.

use std::fmt;

/// A username/password pair for one SANE resource.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    // Never print the password, even in debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Answers an authorization challenge for a named resource. Installed once
/// per [`crate::session::Session`]; consulted whenever an RPC reply carries
/// a non-empty resource string.
pub trait CredentialProvider {
    /// Returns credentials for `resource`, or `None` if this resource
    /// cannot be authenticated. The caller then fails with
    /// [`crate::Error::AuthDenied`].
    fn provide(&mut self, resource: &str) -> Option<Credentials>;
}

impl<T> CredentialProvider for T
where
    T: FnMut(&str) -> Option<Credentials>,
{
    fn provide(&mut self, resource: &str) -> Option<Credentials> {
        self(resource)
    }
}

/// A [`CredentialProvider`] that can never be constructed, for sessions
/// that never expect an authorization challenge.
#[derive(Debug, Clone, Copy)]
pub enum NoCredentials {}

impl CredentialProvider for NoCredentials {
    fn provide(&mut self, _resource: &str) -> Option<Credentials> {
        match *self {}
    }
}

/// Computes the SANE MD5-challenge response: `md5(salt ++ password)`,
/// hex-encoded with lowercase digits, over the ISO-8859-1 bytes of both
/// inputs.
///
/// This value is never sent on the wire by [`crate::session::Session`]
/// unless [`crate::session::SessionConfig::allow_md5_auth`] is explicitly
/// set, since most deployed `saned` builds mishandle the `$MD5$`
/// separator, so cleartext is the default transport.
pub fn md5_challenge(salt: &str, password: &str) -> String {
    let mut input = crate::wire::latin1::encode(salt);
    input.extend(crate::wire::latin1::encode(password));
    let digest = md5::compute(input);
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_implements_credential_provider() {
        let mut provider = |resource: &str| {
            if resource == "scanner" {
                Some(Credentials::new("alice", "hunter2"))
            } else {
                None
            }
        };
        let creds = provider.provide("scanner").unwrap();
        assert_eq!(creds.username, "alice");
        assert!(provider.provide("other").is_none());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn md5_challenge_is_deterministic_and_hex_lowercase() {
        let a = md5_challenge("salt123", "hunter2");
        let b = md5_challenge("salt123", "hunter2");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn md5_challenge_differs_with_salt() {
        let a = md5_challenge("salt1", "hunter2");
        let b = md5_challenge("salt2", "hunter2");
        assert_ne!(a, b);
    }
}
