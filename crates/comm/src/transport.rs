use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CommError;

/// Directory for IPC sockets created by [`Transport::ipc`].
const IPC_DIR: &str = "/tmp/polyfold";

/// A rank's inbound ZeroMQ endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "address")]
pub enum Transport {
    /// Unix domain socket at an absolute path. Same-host groups only.
    Ipc(PathBuf),

    /// TCP, for groups spread over several hosts.
    Tcp { host: String, port: u16 },
}

impl Transport {
    /// IPC socket `{name}.sock` in the default socket directory.
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(Path::new(IPC_DIR).join(format!("{name}.sock")))
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Parse `ipc:///abs/path.sock` or `tcp://host:port`.
    ///
    /// IPC paths are kept exactly as written and must be absolute.
    pub fn parse(endpoint: &str) -> Result<Self, CommError> {
        if let Some(path) = endpoint.strip_prefix("ipc://") {
            let path = Path::new(path);
            if !path.is_absolute() || path.file_name().is_none() {
                return Err(CommError::Config(format!(
                    "ipc endpoint '{endpoint}' needs an absolute socket path"
                )));
            }
            return Ok(Self::Ipc(path.to_path_buf()));
        }

        let addr = endpoint.strip_prefix("tcp://").ok_or_else(|| {
            CommError::Config(format!("endpoint '{endpoint}' must start with 'tcp://' or 'ipc://'"))
        })?;
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| CommError::Config(format!("tcp endpoint '{endpoint}' has no port")))?;
        if host.is_empty() {
            return Err(CommError::Config(format!("tcp endpoint '{endpoint}' has no host")));
        }
        let port = port
            .parse()
            .map_err(|_| CommError::Config(format!("tcp endpoint '{endpoint}' has invalid port")))?;
        Ok(Self::tcp(host, port))
    }

    /// The address string handed to ZeroMQ.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(path) => format!("ipc://{}", path.display()),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// Prepare the filesystem before binding: create the socket's directory
    /// and remove a socket file left behind by an earlier run. No-op for TCP.
    pub fn prepare_bind(&self) -> std::io::Result<()> {
        let Self::Ipc(path) = self else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale IPC socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_ipc_lands_in_default_dir() {
        assert_eq!(
            Transport::ipc("rank-0").endpoint(),
            "ipc:///tmp/polyfold/rank-0.sock"
        );
    }

    #[test]
    fn tcp_endpoint() {
        assert_eq!(Transport::tcp("127.0.0.1", 5700).endpoint(), "tcp://127.0.0.1:5700");
    }

    #[test]
    fn parse_keeps_endpoint_verbatim() {
        for endpoint in [
            "tcp://10.0.0.2:6001",
            "ipc:///tmp/polyfold/rank-3.sock",
            "ipc:///var/run/app/rank-0.sock",
        ] {
            assert_eq!(Transport::parse(endpoint).unwrap().endpoint(), endpoint);
        }
    }

    #[test]
    fn ipc_paths_with_same_file_name_stay_distinct() {
        let a = Transport::parse("ipc:///a/r.sock").unwrap();
        let b = Transport::parse("ipc:///b/r.sock").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Transport::parse("udp://host:1").is_err());
        assert!(Transport::parse("tcp://host").is_err());
        assert!(Transport::parse("tcp://host:notaport").is_err());
        assert!(Transport::parse("tcp://:5000").is_err());
        assert!(Transport::parse("ipc://relative.sock").is_err());
        assert!(Transport::parse("ipc:///").is_err());
    }

    #[test]
    fn prepare_bind_creates_dir_and_clears_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rank-1.sock");
        let transport = Transport::Ipc(path.clone());

        transport.prepare_bind().unwrap();
        assert!(path.parent().unwrap().is_dir());

        std::fs::write(&path, b"").unwrap();
        transport.prepare_bind().unwrap();
        assert!(!path.exists());
    }
}
