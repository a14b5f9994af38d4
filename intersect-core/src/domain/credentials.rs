//! Registry credentials

use std::fmt;

/// An opaque secret value
///
/// `Debug` and `Display` print a placeholder; the value is only reachable
/// through [`Secret::expose`].
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Login for a non-default registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub registry: String,
    pub username: String,
    pub password: Secret,
}

impl RegistryCredentials {
    pub fn new(
        registry: impl Into<String>,
        username: impl Into<String>,
        password: Secret,
    ) -> Self {
        Self {
            registry: registry.into(),
            username: username.into(),
            password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_never_formatted() {
        let creds = RegistryCredentials::new("ghcr.io", "nsdf", Secret::new("hunter2"));

        assert!(!format!("{:?}", creds).contains("hunter2"));
        assert_eq!(creds.password.to_string(), "***");
        assert_eq!(creds.password.expose(), "hunter2");
    }
}
