use std::path::PathBuf;

use redis_compare::{SourceOpts, TargetOpts};

#[test]
fn test_source_opts_creation() {
    let opts = SourceOpts {
        source_addr: vec!["10.0.0.1:6379".to_string()],
        source_username: Some("default".to_string()),
        source_password: Some("password".to_string()),
        source_db: 2,
        source_cluster: false,
    };

    let connect = opts.connect_options();
    assert_eq!(connect.addresses, vec!["10.0.0.1:6379"]);
    assert_eq!(connect.username, Some("default".to_string()));
    assert_eq!(connect.password, Some("password".to_string()));
    assert_eq!(connect.db, 2);
    assert!(connect.validate().is_ok());
}

#[test]
fn test_target_cluster_opts() {
    let opts = TargetOpts {
        target_addr: vec!["n1:7000".to_string(), "n2:7001".to_string()],
        target_username: None,
        target_password: Some(String::new()),
        target_db: 0,
        target_cluster: true,
    };

    let connect = opts.connect_options();
    assert!(connect.cluster);
    assert!(connect.password.is_none());
    assert!(connect.validate().is_ok());
}

#[test]
fn test_several_addresses_require_cluster_flag() {
    let opts = SourceOpts {
        source_addr: vec!["n1:7000".to_string(), "n2:7001".to_string()],
        source_username: None,
        source_password: None,
        source_db: 0,
        source_cluster: false,
    };

    assert!(opts.connect_options().validate().is_err());
}

#[test]
fn test_parse_rejects_unknown_suffix() {
    let dir = tempfile::TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("compare.txt");
    std::fs::write(&path, "{}\n").unwrap();

    let err = compare_report::parse_file(&path).unwrap_err();
    assert!(err.to_string().contains("File must have suffix"));
}
