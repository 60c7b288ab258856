//! Repository manager credentials with masking capabilities
//!
//! Passwords are held in `secrecy::SecretString` so they never show up in
//! `Debug` output, logs or error messages.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Basic-auth credentials for a repository manager
///
/// # Examples
///
/// ```
/// use release_publisher::security::Credentials;
/// use secrecy::SecretString;
///
/// let credentials = Credentials::new("spring", SecretString::new("secret-password".into()));
/// assert_eq!(credentials.username(), "spring");
/// assert_eq!(credentials.masked_password(), "sec...ord");
/// ```
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// Build credentials from optional configuration values
    ///
    /// Returns `None` when no username is configured, in which case requests
    /// are sent unauthenticated. A missing password is sent as empty.
    pub fn from_parts(username: Option<&str>, password: Option<&SecretString>) -> Option<Self> {
        let username = username.map(str::trim).filter(|u| !u.is_empty())?;
        let password = password
            .map(|p| SecretString::new(p.expose_secret().into()))
            .unwrap_or_else(|| SecretString::new("".into()));

        Some(Self::new(username, password))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Masked form of the password, safe to log
    pub fn masked_password(&self) -> String {
        mask_secret(self.password.expose_secret())
    }

    /// Replace every occurrence of the password in `text` with its masked form
    pub fn mask_in(&self, text: &str) -> String {
        let secret = self.password.expose_secret();
        if secret.is_empty() {
            return text.to_string();
        }
        text.replace(secret, &mask_secret(secret))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.masked_password())
            .finish()
    }
}

/// Masks a secret for safe logging
///
/// Shows only the first 3 and last 3 characters for identification purposes.
/// Secrets shorter than 10 characters are fully masked as "****".
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }

    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 3..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::new(value.into())
    }

    #[test]
    fn test_mask_secret_with_short_secret() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret(""), "****");
    }

    #[test]
    fn test_mask_secret_with_long_secret() {
        assert_eq!(mask_secret("abcdef123456"), "abc...456");
        assert_eq!(mask_secret("very-long-token-string"), "ver...ing");
    }

    #[test]
    fn test_from_parts_without_username() {
        assert!(Credentials::from_parts(None, Some(&secret("password"))).is_none());
        assert!(Credentials::from_parts(Some("  "), Some(&secret("password"))).is_none());
    }

    #[test]
    fn test_from_parts_without_password() {
        let credentials = Credentials::from_parts(Some("spring"), None).unwrap();
        assert_eq!(credentials.username(), "spring");
        assert_eq!(credentials.password().expose_secret(), "");
    }

    #[test]
    fn test_mask_in_replaces_password() {
        let credentials = Credentials::new("spring", secret("secret-password-123"));
        let output = credentials.mask_in("rejected secret-password-123 for spring");
        assert!(output.contains("sec...123"));
        assert!(!output.contains("secret-password-123"));
    }

    #[test]
    fn test_debug_does_not_expose_password() {
        let credentials = Credentials::new("spring", secret("secret-password-123"));
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("spring"));
        assert!(!debug.contains("secret-password-123"));
    }
}
