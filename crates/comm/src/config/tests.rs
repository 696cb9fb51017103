use std::io::Write;

use super::types::GroupConfig;
use crate::error::CommError;
use crate::transport::Transport;

#[test]
fn parse_minimal_toml() {
    let toml = r#"
[group]
ranks = ["tcp://127.0.0.1:5700", "tcp://127.0.0.1:5701"]
"#;
    let cfg = GroupConfig::from_toml(toml).unwrap();
    assert_eq!(cfg.size(), 2);
    assert_eq!(cfg.transport.connect_retries, 50);
    assert_eq!(cfg.transport.retry_delay_ms, 100);
}

#[test]
fn parse_full_toml() {
    let toml = r#"
[group]
ranks = [
    "tcp://10.0.0.1:6000",
    "tcp://10.0.0.2:6000",
    "ipc:///tmp/polyfold/rank-2.sock",
]

[transport]
connect_retries = 5
retry_delay_ms = 250
"#;
    let cfg = GroupConfig::from_toml(toml).unwrap();
    assert_eq!(cfg.size(), 3);
    assert_eq!(cfg.transport.connect_retries, 5);
    assert_eq!(cfg.retry_delay().as_millis(), 250);
    assert_eq!(cfg.transport_for(1).unwrap(), Transport::tcp("10.0.0.2", 6000));
    assert_eq!(cfg.transport_for(2).unwrap(), Transport::ipc("rank-2"));
}

#[test]
fn ipc_endpoints_outside_default_dir_are_kept() {
    let toml = r#"
[group]
ranks = ["ipc:///var/run/app/rank-0.sock", "ipc:///srv/app/rank-0.sock"]
"#;
    let cfg = GroupConfig::from_toml(toml).unwrap();
    assert_eq!(cfg.transport_for(0).unwrap().endpoint(), "ipc:///var/run/app/rank-0.sock");
    assert_eq!(cfg.transport_for(1).unwrap().endpoint(), "ipc:///srv/app/rank-0.sock");
}

#[test]
fn rejects_empty_group() {
    let err = GroupConfig::from_toml("[group]\nranks = []\n").unwrap_err();
    assert!(matches!(err, CommError::Config(_)));
}

#[test]
fn rejects_bad_endpoint() {
    let err = GroupConfig::from_toml("[group]\nranks = [\"udp://x:1\"]\n").unwrap_err();
    assert!(err.to_string().contains("rank 0"));
}

#[test]
fn rejects_duplicate_endpoints() {
    let toml = r#"
[group]
ranks = ["tcp://127.0.0.1:5700", "tcp://127.0.0.1:5700"]
"#;
    let err = GroupConfig::from_toml(toml).unwrap_err();
    assert!(err.to_string().contains("reuses endpoint"));
}

#[test]
fn rejects_two_spellings_of_one_socket() {
    let toml = r#"
[group]
ranks = ["ipc:///tmp/app/r.sock", "ipc:///tmp/app/./r.sock"]
"#;
    let err = GroupConfig::from_toml(toml).unwrap_err();
    assert!(err.to_string().contains("rank 1 reuses endpoint"));

    let toml = r#"
[group]
ranks = ["tcp://127.0.0.1:5700", "tcp://127.0.0.1:05700"]
"#;
    assert!(GroupConfig::from_toml(toml).is_err());
}

#[test]
fn rejects_missing_group_section() {
    assert!(matches!(
        GroupConfig::from_toml("[transport]\nconnect_retries = 1\n"),
        Err(CommError::ConfigParse(_))
    ));
}

#[test]
fn local_layout_uses_consecutive_ports() {
    let cfg = GroupConfig::local(3, 5800).unwrap();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.group.ranks[2], "tcp://127.0.0.1:5802");
}

#[test]
fn local_layout_rejects_port_overflow() {
    assert!(GroupConfig::local(2, u16::MAX - 1).is_ok());
    assert!(matches!(
        GroupConfig::local(3, u16::MAX - 1),
        Err(CommError::Config(_))
    ));
    assert!(GroupConfig::local(70_000, 0).is_err());
}

#[test]
fn ipc_layout_names_sockets_by_rank() {
    let cfg = GroupConfig::ipc(2, "job");
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.group.ranks[1], "ipc:///tmp/polyfold/job-1.sock");
}

#[test]
fn transport_for_unknown_rank() {
    let cfg = GroupConfig::local(2, 5900).unwrap();
    assert!(matches!(
        cfg.transport_for(2),
        Err(CommError::InvalidRank { rank: 2, size: 2 })
    ));
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[group]\nranks = [\"tcp://127.0.0.1:5950\"]").unwrap();
    let cfg = GroupConfig::from_file(file.path()).unwrap();
    assert_eq!(cfg.size(), 1);
}

#[test]
fn missing_file_is_io_error() {
    assert!(matches!(
        GroupConfig::from_file("/nonexistent/polyfold.toml"),
        Err(CommError::ConfigIo(_))
    ));
}

#[test]
fn shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/polyfold.toml");
    let cfg = GroupConfig::from_file(path).unwrap();
    assert_eq!(cfg.size(), 4);
    assert_eq!(cfg.transport.connect_retries, 50);
}
