//! Daemon settings extraction, secret-literal guard and unused-key report.

use shop_config::{
    load_layered_yaml_from_strings, report_unknown_keys, DaemonSettings, UnknownKeyPolicy,
    DEFAULT_JWT_SECRET_ENV,
};

#[test]
fn empty_config_yields_defaults() {
    let loaded = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let s = DaemonSettings::from_config_json(&loaded.config_json).unwrap();

    assert_eq!(s, DaemonSettings::default());
    assert_eq!(s.bind_addr.to_string(), "127.0.0.1:4000");
    assert_eq!(s.max_connections, 10);
    assert_eq!(s.jwt_secret_env, DEFAULT_JWT_SECRET_ENV);
    assert!(s.allowed_origins.is_empty());
}

#[test]
fn explicit_values_are_read() {
    let yaml = r#"
server:
  bind_addr: "0.0.0.0:9000"
database:
  max_connections: 4
auth:
  jwt_secret_env: "TIENDA_JWT_SECRET"
cors:
  allowed_origins: ["https://tienda.example/", "https://admin.tienda.example"]
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let s = DaemonSettings::from_config_json(&loaded.config_json).unwrap();

    assert_eq!(s.bind_addr.port(), 9000);
    assert_eq!(s.max_connections, 4);
    assert_eq!(s.jwt_secret_env, "TIENDA_JWT_SECRET");
    assert_eq!(
        s.allowed_origins,
        vec![
            "https://tienda.example".to_string(),
            "https://admin.tienda.example".to_string()
        ]
    );
}

#[test]
fn invalid_values_are_rejected() {
    for yaml in [
        "server:\n  bind_addr: \"not-an-addr\"\n",
        "database:\n  max_connections: 0\n",
        "auth:\n  jwt_secret_env: \"lowercase-name\"\n",
        "cors:\n  allowed_origins: \"https://single.example\"\n",
        "database:\n  max_connections: -3\n",
        "server: 4000\n",
    ] {
        let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
        assert!(
            DaemonSettings::from_config_json(&loaded.config_json).is_err(),
            "expected rejection for: {yaml}"
        );
    }
}

#[test]
fn secret_literal_aborts_load() {
    let yaml = r#"
auth:
  jwt_secret_env: "eyJhbGciOiJIUzI1NiJ9.payload.sig"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
    let msg = format!("{err:?}");
    assert!(msg.contains("CONFIG_SECRET_DETECTED"), "got: {msg}");
    assert!(!msg.contains("payload"), "secret value must be redacted: {msg}");
}

#[test]
fn unused_keys_warn_or_fail() {
    let yaml = r#"
server:
  bind_addr: "127.0.0.1:4000"
cors:
  allowed_origins: ["https://tienda.example"]
mail:
  smtp_user_env: "EMAIL_USER"
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();

    let unknown = report_unknown_keys(&loaded.config_json, UnknownKeyPolicy::Warn).unwrap();
    assert_eq!(unknown, vec!["mail".to_string()]);

    let err = report_unknown_keys(&loaded.config_json, UnknownKeyPolicy::Fail).unwrap_err();
    assert!(format!("{err:?}").contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn unknown_keys_inside_known_sections_are_reported() {
    let yaml = r#"
server:
  bind_addr: "127.0.0.1:4000"
  tls: true
database:
  max_conections: 4
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let unknown = report_unknown_keys(&loaded.config_json, UnknownKeyPolicy::Warn).unwrap();
    assert_eq!(
        unknown,
        vec!["database.max_conections".to_string(), "server.tls".to_string()]
    );

    // The misspelt key is ignored, so the default still applies.
    let s = DaemonSettings::from_config_json(&loaded.config_json).unwrap();
    assert_eq!(s.max_connections, 10);
}

#[test]
fn fully_known_config_reports_nothing() {
    let yaml = r#"
server:
  bind_addr: "127.0.0.1:4000"
database:
  max_connections: 4
auth:
  jwt_secret_env: "SHOP_JWT_SECRET"
cors:
  allowed_origins: []
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let unknown = report_unknown_keys(&loaded.config_json, UnknownKeyPolicy::Fail).unwrap();
    assert!(unknown.is_empty());
}
