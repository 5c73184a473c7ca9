//! Layered configuration loading: defaults, TOML file, environment.

use door_console::config::ConsoleConfig;
use figment::Jail;
use std::io::Write;

#[test]
fn test_missing_file_uses_defaults() {
    Jail::expect_with(|_jail| {
        let config = ConsoleConfig::load_from("does-not-exist.toml").map_err(|e| e.to_string())?;
        assert_eq!(config, ConsoleConfig::default());
        Ok(())
    });
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "door-console.toml",
            r#"
                [server]
                url = "192.168.1.20:5000"

                [settings]
                threshold = 42
            "#,
        )?;

        let config = ConsoleConfig::load_from("door-console.toml").map_err(|e| e.to_string())?;
        assert_eq!(config.server.url, "192.168.1.20:5000");
        assert_eq!(config.settings.threshold, 42);
        assert_eq!(config.settings.min_area_percent, 5);
        assert_eq!(config.reconnect.initial_delay_ms, 1000);
        assert!(config.validate().is_ok());

        let transport = config.transport().map_err(|e| e.to_string())?;
        assert_eq!(
            transport.address.socket_url().as_str(),
            "ws://192.168.1.20:5000/socket.io/?EIO=4&transport=websocket"
        );
        Ok(())
    });
}

#[test]
fn test_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "door-console.toml",
            r#"
                [server]
                url = "door-cam.local"

                [logging]
                level = "info"
            "#,
        )?;
        jail.set_env("DOOR_CONSOLE_SERVER__URL", "wss://door-cam.example.org");
        jail.set_env("DOOR_CONSOLE_LOGGING__LEVEL", "debug");
        jail.set_env("DOOR_CONSOLE_RECONNECT__MAX_ATTEMPTS", "3");

        let config = ConsoleConfig::load_from("door-console.toml").map_err(|e| e.to_string())?;
        assert_eq!(config.server.url, "wss://door-cam.example.org");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.reconnect.max_attempts, 3);

        let transport = config.transport().map_err(|e| e.to_string())?;
        assert!(transport.address.is_tls());
        assert_eq!(transport.address.as_str(), "https://door-cam.example.org:5000/");
        Ok(())
    });
}

#[test]
fn test_out_of_range_file_fails_validation() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "door-console.toml",
            r#"
                [settings]
                threshold = 300
            "#,
        )?;

        let config = ConsoleConfig::load_from("door-console.toml").map_err(|e| e.to_string())?;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("settings.threshold"));
        Ok(())
    });
}

#[test]
fn test_type_mismatch_is_a_load_error() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "door-console.toml",
            r#"
                [reconnect]
                initial_delay_ms = "soon"
            "#,
        )?;

        assert!(ConsoleConfig::load_from("door-console.toml").is_err());
        Ok(())
    });
}

#[test]
fn test_load_from_temp_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        "[window]\nwidth = 800.0\nheight = 600.0\n\n[logging]\nformat = \"json\""
    )
    .unwrap();

    let path = file.path().to_path_buf();
    Jail::expect_with(move |_jail| {
        let config = ConsoleConfig::load_from(&path).map_err(|e| e.to_string())?;
        assert_eq!(config.window.width, 800.0);
        assert_eq!(config.window.height, 600.0);
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn test_rendered_toml_loads_back() {
    Jail::expect_with(|jail| {
        let mut config = ConsoleConfig::default();
        config.server.url = "10.0.0.7:5000".to_string();
        config.settings.min_area_percent = 12;
        jail.create_file("rendered.toml", &config.to_toml().map_err(|e| e.to_string())?)?;

        let loaded = ConsoleConfig::load_from("rendered.toml").map_err(|e| e.to_string())?;
        assert_eq!(loaded, config);
        Ok(())
    });
}
