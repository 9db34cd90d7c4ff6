// =========================
// tests/unit/config_tests.rs
// =========================
use backend_lib::config::{Settings, StorageBackend};
use figment::Jail;
use std::time::Duration;

#[test]
fn test_explicit_config_path() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "authgate.toml",
            r#"
            [storage]
            backend = "flat_file"

            [auth]
            base_url = "https://app.example.com"
            trusted_origins = ["https://app.example.com", "https://admin.example.com"]

            [retry]
            max_retries = 5
            base_delay_ms = 250

            [validation.password]
            min_length = 12
            "#,
        )?;

        let settings = Settings::load_from("authgate.toml").map_err(|e| e.to_string())?;
        assert_eq!(settings.storage.backend, StorageBackend::FlatFile);
        assert_eq!(settings.auth.trusted_origins.len(), 2);
        assert_eq!(settings.validation.password.min_length, 12);
        // Unset requirement keys keep their defaults
        assert!(settings.validation.password.require_special);

        let policy = settings.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        Ok(())
    });
}

#[test]
fn test_env_overrides_nested_keys() {
    Jail::expect_with(|jail| {
        jail.set_env("AUTHGATE_AUTH__SESSION_TTL_SECS", "60");
        jail.set_env("AUTHGATE_LOG__JSON", "true");

        let settings = Settings::load().map_err(|e| e.to_string())?;
        assert_eq!(settings.session_ttl(), Duration::from_secs(60));
        assert!(settings.log.json);
        Ok(())
    });
}

#[test]
fn test_unknown_storage_backend_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[storage]\nbackend = \"postgres\"\n")?;
        assert!(Settings::load().is_err());
        Ok(())
    });
}
