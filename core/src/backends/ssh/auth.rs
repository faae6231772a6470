//! SSH connection setup and authentication.

use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::SshConfig;
use crate::errors::AcquisitionError;

const DEFAULT_KEY_PATH: &str = "~/.ssh/id_rsa";

/// Connect to an SSH server, perform handshake, and authenticate.
///
/// Expects an already [expanded](SshConfig::expand) config. Returns an
/// authenticated `Session` in blocking mode with the config's timeout
/// applied to every subsequent operation.
pub fn connect_and_authenticate(config: &SshConfig) -> Result<ssh2::Session, AcquisitionError> {
    let addr = config.address();
    let timeout = Duration::from_millis(u64::from(config.timeout_ms));

    let socket_addr = addr
        .to_socket_addrs()
        .map_err(|e| AcquisitionError::Remote(format!("Cannot resolve {addr}: {e}")))?
        .next()
        .ok_or_else(|| AcquisitionError::Remote(format!("No address found for {addr}")))?;

    let tcp = TcpStream::connect_timeout(&socket_addr, timeout)
        .map_err(|e| AcquisitionError::Remote(format!("Connection to {addr} failed: {e}")))?;

    let mut session = ssh2::Session::new().map_err(|e| AcquisitionError::Remote(e.to_string()))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(config.timeout_ms);
    session
        .handshake()
        .map_err(|e| AcquisitionError::Remote(format!("Handshake failed: {e}")))?;

    match config.auth_method.as_str() {
        "agent" => {
            session
                .userauth_agent(&config.username)
                .map_err(|e| AcquisitionError::Remote(format!("Agent auth failed: {e}")))?;
        }
        "key" => {
            let key_path = PathBuf::from(
                config
                    .key_path
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| crate::config::expand::expand_tilde(DEFAULT_KEY_PATH)),
            );
            session
                .userauth_pubkey_file(
                    &config.username,
                    None,
                    &key_path,
                    config.password.as_deref(),
                )
                .map_err(|e| AcquisitionError::Remote(format!("Key auth failed: {e}")))?;
        }
        _ => {
            let password = config.password.as_deref().unwrap_or("");
            session
                .userauth_password(&config.username, password)
                .map_err(|e| AcquisitionError::Remote(format!("Password auth failed: {e}")))?;
        }
    }

    if !session.authenticated() {
        return Err(AcquisitionError::Remote(
            "Authentication failed".to_string(),
        ));
    }

    session.set_blocking(true);
    Ok(session)
}
