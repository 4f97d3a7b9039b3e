//! Integration test: configuration files on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use gantry_common::config::ConfigError;
use gantry_control_unit::config::load_config;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn shipped_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config/gantry.toml");
    let config = load_config(&path).unwrap();
    assert_eq!(config.shared.service_name, "gantry-01");
    assert_eq!(config.control.cycle_time_ms, 50);
    assert_eq!(config.axes[0].encoders, vec![0, 1]);
    assert_eq!(config.axes[1].max_position, 1.0);
}

#[test]
fn overrides_are_applied() {
    let file = write_config(
        r#"
[control]
cycle_time_ms = 20
stale_threshold = 4

[pid]
kp = 0.5

[[axes]]
name = "x"
offset = 0.1
encoders = [1]
output = "control_x_speed"
min_position = 0.0
max_position = 1.5

[[axes]]
name = "y"
encoders = [2]
output = "control_y_speed"
min_position = -0.5
max_position = 0.5
"#,
    );
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.control.cycle_time_ms, 20);
    assert_eq!(config.control.stale_threshold, 4);
    assert_eq!(config.pid.kp, 0.5);
    assert_eq!(config.pid.kd, 0.001);
    assert_eq!(config.axes[0].offset, 0.1);
    assert_eq!(config.axes[1].offset, 0.0);
}

#[test]
fn missing_file_is_reported() {
    let err = load_config(Path::new("/nonexistent/gantry.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn malformed_toml_is_parse_error() {
    let file = write_config("[control\ncycle_time_ms = 50\n");
    assert!(matches!(
        load_config(file.path()).unwrap_err(),
        ConfigError::ParseError(_)
    ));
}

#[test]
fn invalid_values_are_validation_errors() {
    let file = write_config("[lowpass]\nalpha = 2.0\n");
    assert!(matches!(
        load_config(file.path()).unwrap_err(),
        ConfigError::ValidationError(_)
    ));

    let file = write_config("[[axes]]\nname = \"x\"\nencoders = [0]\noutput = \"control_x_speed\"\nmin_position = 0.0\nmax_position = 1.0\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("expected 2 axes"));
}
