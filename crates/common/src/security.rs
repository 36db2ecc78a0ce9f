// crates/common/src/security.rs
use crate::{Error, Result};
use std::fmt;
use zeroize::ZeroizeOnDrop;

/// Object store credentials with automatic zeroing on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Resolve credentials from the process environment. The arguments are
    /// the *names* of the variables holding the key material.
    pub fn from_env(access_key_var: &str, secret_key_var: &str) -> Result<Self> {
        Self::from_lookup(access_key_var, secret_key_var, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(access_key_var: &str, secret_key_var: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = require_var(&lookup, access_key_var)?;
        let secret_access_key = require_var(&lookup, secret_key_var)?;
        Ok(Self { access_key_id, secret_access_key })
    }
}

fn require_var<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{} not set", name))),
    }
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}
