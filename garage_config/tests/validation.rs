use garage_config::load_toml;
use rstest::rstest;

const VALID: &str = r#"
[runner]
tick_rate_ms = 100

[leadership]
start_as_leader = true

[logging]
level = "info"
rotation = "daily"

[[doors]]
id = "main"
time_to_open_ms = 10000
time_to_close_ms = 8000
initial_percent_closed = 0

[[doors]]
id = "side"
time_to_open_ms = 12000
time_to_close_ms = 12000
"#;

#[test]
fn accepts_valid_config() {
    let cfg = load_toml(VALID).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.doors.len(), 2);
    assert_eq!(cfg.door("main").unwrap().initial_percent_closed, 0);
    // Unspecified seed defaults to fully closed
    assert_eq!(cfg.door("side").unwrap().initial_percent_closed, 100);
}

#[test]
fn defaults_apply_to_missing_sections() {
    let cfg = load_toml(
        r#"
[[doors]]
id = "main"
time_to_open_ms = 1000
time_to_close_ms = 1000
"#,
    )
    .expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.runner.tick_rate_ms, 100);
    assert!(cfg.leadership.start_as_leader);
    assert!(cfg.logging.file.is_none());
}

#[rstest]
#[case("time_to_open_ms = 10000", "time_to_open_ms = 0", "main.time_to_open_ms must be > 0")]
#[case("time_to_close_ms = 8000", "time_to_close_ms = -5", "main.time_to_close_ms must be > 0")]
#[case("tick_rate_ms = 100", "tick_rate_ms = 0", "tick_rate_ms must be >= 1")]
#[case("initial_percent_closed = 0", "initial_percent_closed = 101", "initial_percent_closed must be in [0, 100]")]
#[case("rotation = \"daily\"", "rotation = \"weekly\"", "logging.rotation must be one of")]
#[case("id = \"side\"", "id = \"main\"", "'main' is duplicated")]
fn rejects_invalid_values(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let toml = VALID.replacen(from, to, 1);
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "unexpected error: {err}"
    );
}

#[test]
fn rejects_config_without_doors() {
    let cfg = load_toml("[runner]\ntick_rate_ms = 50\n").expect("parse TOML");
    let err = cfg.validate().expect_err("no doors");
    assert!(format!("{err}").contains("[[doors]]"));
}

#[test]
fn rejects_non_integer_rated_time() {
    // Rated times must be integers
    let err = load_toml(
        r#"
[[doors]]
id = "main"
time_to_open_ms = "ten seconds"
time_to_close_ms = 8000
"#,
    )
    .expect_err("string rated time");
    assert!(format!("{err}").contains("time_to_open_ms"));
}
