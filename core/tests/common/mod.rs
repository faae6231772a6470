//! Shared test utilities for hoststat core integration tests.
//!
//! The SSH tests expect an OpenSSH container listening on
//! [`PORT_SSH_PASSWORD`] with user `testuser` / `testpass`. They skip
//! gracefully when it isn't running.

// Each integration test is compiled as its own crate, so not every test file
// uses every function from this shared module.
#![allow(dead_code)]

use std::net::TcpStream;
use std::time::Duration;

use hoststat_core::config::SshConfig;

/// ssh-password container (password auth, OpenSSH latest).
pub const PORT_SSH_PASSWORD: u16 = 2201;

/// Check if a TCP port is reachable on the given host.
///
/// Returns `true` if a TCP connection can be established within 2 seconds.
pub fn is_port_reachable(host: &str, port: u16) -> bool {
    let addr = format!("{host}:{port}");
    if let Ok(addr) = addr.parse() {
        TcpStream::connect_timeout(&addr, Duration::from_secs(2)).is_ok()
    } else {
        false
    }
}

/// Skip the current test if a Docker container is not reachable on the given port.
macro_rules! require_docker {
    ($port:expr) => {
        if !common::is_port_reachable("127.0.0.1", $port) {
            eprintln!(
                "SKIPPED: Docker container not reachable on port {}",
                $port
            );
            return;
        }
    };
}
pub(crate) use require_docker;

/// Build an `SshConfig` for password authentication.
pub fn ssh_password_config(port: u16) -> SshConfig {
    SshConfig {
        host: "127.0.0.1".to_string(),
        port,
        username: "testuser".to_string(),
        auth_method: "password".to_string(),
        password: Some("testpass".to_string()),
        ..Default::default()
    }
}

/// Write a fake `/proc` tree with the given `stat` contents.
pub fn fake_proc(stat: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_stat(dir.path(), stat);
    dir
}

/// Replace the `stat` file of a fake `/proc` tree.
pub fn write_stat(root: &std::path::Path, stat: &str) {
    std::fs::write(root.join("stat"), stat).expect("write stat");
}
