use std::time::Duration;

use crate::config::{apply_file, engine_timeout, Settings};

#[test]
fn defaults_match_the_original_relay() {
    let settings = Settings::default();
    assert_eq!(settings.bind_addr, "127.0.0.1:3000");
    assert_eq!(settings.engine_binary, "./kvstore");
    assert_eq!(settings.engine_timeout_secs, 10);
}

#[test]
fn file_overrides_take_effect() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        "bind_addr = \"0.0.0.0:8080\"\nengine_bin = \"/usr/local/bin/kvstore\"\nengine_timeout_secs = \"3\"\n",
    );
    assert_eq!(settings.bind_addr, "0.0.0.0:8080");
    assert_eq!(settings.engine_binary, "/usr/local/bin/kvstore");
    assert_eq!(settings.engine_timeout_secs, 3);
}

#[test]
fn unparseable_file_leaves_defaults_in_place() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "not valid toml ===");
    assert_eq!(settings, Settings::default());
}

#[test]
fn engine_timeout_never_drops_below_one_second() {
    let mut settings = Settings::default();
    settings.engine_timeout_secs = 0;
    assert_eq!(engine_timeout(&settings), Duration::from_secs(1));

    settings.engine_timeout_secs = 7;
    assert_eq!(engine_timeout(&settings), Duration::from_secs(7));
}
