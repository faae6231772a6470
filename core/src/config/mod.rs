pub mod expand;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// SSH connection settings for sampling a remote Linux host.
///
/// `auth_method` is one of `"password"`, `"key"` or `"agent"`. For key
/// authentication `password` holds the key passphrase, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfig {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    pub auth_method: String,
    pub password: Option<String>,
    pub key_path: Option<String>,
    /// TCP connect and SSH operation timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ssh_port(),
            username: String::new(),
            auth_method: String::new(),
            password: None,
            key_path: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

const AUTH_METHODS: [&str; 3] = ["password", "key", "agent"];

impl SshConfig {
    /// Return a copy with all `${env:...}` placeholders and `~` expanded.
    pub fn expand(mut self) -> Self {
        self.host = expand::expand_env_placeholders(&self.host);
        self.username = expand::expand_env_placeholders(&self.username);
        self.key_path = self.key_path.map(|s| {
            // Pasted paths often arrive quoted.
            let stripped = s.trim().trim_matches('"').trim_matches('\'');
            expand::expand_tilde(&expand::expand_env_placeholders(stripped))
        });
        self.password = self.password.map(|s| expand::expand_env_placeholders(&s));
        self
    }

    /// Check the fields a connection attempt cannot do without.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config("SSH host is empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(CoreError::Config("SSH username is empty".to_string()));
        }
        if !AUTH_METHODS.contains(&self.auth_method.as_str()) {
            return Err(CoreError::Config(format!(
                "Unknown SSH auth method: '{}'",
                self.auth_method
            )));
        }
        Ok(())
    }

    /// `host:port` for display and connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_timeout_ms() -> u32 {
    10_000
}
