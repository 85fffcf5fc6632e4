//! Layered configuration loader
//!
//! Settings are assembled from TOML files and `FUSION_CACHE_*` environment
//! variables through the `config` crate, then validated.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use tracing::debug;

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "FUSION_CACHE_CONFIG_DIR";

/// Environment variable for a single configuration file
const CONFIG_FILE_ENV: &str = "FUSION_CACHE_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";

/// Prefix for environment overrides, e.g. `FUSION_CACHE_CACHE__TTL_SECONDS`
const ENV_PREFIX: &str = "FUSION_CACHE";

/// Separator for nested keys in environment overrides
const ENV_SEPARATOR: &str = "__";

/// Loads [`Settings`] from layered sources
///
/// Sources, lowest priority first:
/// 1. `default.toml` (required)
/// 2. `{environment}.toml`
/// 3. `local.toml`
/// 4. `FUSION_CACHE_*` environment variables
///
/// When `FUSION_CACHE_CONFIG_FILE` is set, only that file and the
/// environment variables are read.
#[derive(Debug)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a loader from `FUSION_CACHE_CONFIG_DIR`, `FUSION_CACHE_CONFIG_FILE`
    /// and `FUSION_CACHE_ENV`.
    ///
    /// # Errors
    ///
    /// Fails if both the directory and the file variables are set.
    pub fn new() -> Result<Self, ConfigError> {
        let dir_var = std::env::var(CONFIG_DIR_ENV).ok();
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if dir_var.is_some() && config_file.is_some() {
            return Err(ConfigError::MutualExclusivityError(format!(
                "{} and {} cannot both be set",
                CONFIG_DIR_ENV, CONFIG_FILE_ENV
            )));
        }

        Ok(Self {
            config_dir: dir_var
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Loader reading a single file, ignoring the directory layers.
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(path.into()),
            environment: AppEnvironment::from_env(),
        }
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load and validate settings from all sources
    ///
    /// # Errors
    ///
    /// Returns an error if a required file is missing, parsing fails,
    /// or validation fails.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let settings: Settings = self.build_config()?.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;
        debug!(
            environment = %self.environment,
            backend = ?settings.cache.backend,
            enabled = settings.cache.enabled,
            "Configuration loaded"
        );
        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = match &self.config_file {
            Some(file) => add_file(Config::builder(), file, true)?,
            None => {
                let builder = add_file(Config::builder(), &self.config_dir.join("default.toml"), true)?;
                let builder = add_file(
                    builder,
                    &self.config_dir.join(self.environment.config_file_name()),
                    false,
                )?;
                add_file(builder, &self.config_dir.join("local.toml"), false)?
            }
        };

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()
            .map_err(ConfigError::from)
    }
}

fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if required && !path.exists() {
        return Err(ConfigError::FileNotFound(format!(
            "Required configuration file not found: {}",
            path.display()
        )));
    }

    let name = path
        .to_str()
        .ok_or_else(|| ConfigError::ParseError(format!("Non UTF-8 path: {}", path.display())))?;
    Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::config::settings::CacheBackend;

    // Tests touching process environment must not interleave
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        CONFIG_DIR_ENV,
        CONFIG_FILE_ENV,
        AppEnvironment::ENV_VAR,
        "FUSION_CACHE_CACHE__TTL_SECONDS",
        "FUSION_CACHE_CACHE__ENABLED",
    ];

    const DEFAULT_TOML: &str = r#"
[cache]
enabled = true
ttl_seconds = 300
backend = "file"

[cache.file]
directory = "/var/cache/app"

[logger]
level = "info"
"#;

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).expect("Failed to write config file");
        }
        temp_dir
    }

    /// Clears the loader's variables and restores them on drop
    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn clean() -> Self {
            let mut guard = Self { saved: Vec::new() };
            for key in VARS {
                guard.remove(key);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            self.saved.push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        fn remove(&mut self, key: &str) {
            self.saved.push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original) in self.saved.iter().rev() {
                unsafe {
                    match original {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_new_defaults() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let _env = EnvGuard::clean();

        let loader = ConfigLoader::new().unwrap();
        assert_eq!(loader.config_dir(), Path::new("config"));
        assert!(loader.config_file.is_none());
        assert_eq!(loader.environment(), AppEnvironment::Development);
    }

    #[test]
    fn test_dir_and_file_are_exclusive() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        env.set(CONFIG_DIR_ENV, "/etc/cache");
        env.set(CONFIG_FILE_ENV, "/etc/cache/app.toml");

        let err = ConfigLoader::new().unwrap_err();
        assert!(matches!(err, ConfigError::MutualExclusivityError(_)));
    }

    #[test]
    fn test_missing_default_toml() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        let dir = setup_config_dir(&[]);
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());

        let err = ConfigLoader::new().unwrap().load().unwrap_err();
        match err {
            ConfigError::FileNotFound(msg) => assert!(msg.contains("default.toml")),
            other => panic!("Expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_load_default_only() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        let dir = setup_config_dir(&[("default.toml", DEFAULT_TOML)]);
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());

        let settings = ConfigLoader::new().unwrap().load().unwrap();
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.ttl_seconds, 300);
        assert_eq!(settings.cache.backend, CacheBackend::File);
        assert_eq!(settings.cache.file.directory, "/var/cache/app");
    }

    #[test]
    fn test_full_precedence_chain() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();

        let production = r#"
[cache]
backend = "memcached"
ttl_seconds = 600

[[cache.memcached.servers]]
host = "cache-prod"
port = 11211
"#;
        let local = r#"
[cache]
ttl_seconds = 900
"#;
        let dir = setup_config_dir(&[
            ("default.toml", DEFAULT_TOML),
            ("production.toml", production),
            ("local.toml", local),
        ]);
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());
        env.set(AppEnvironment::ENV_VAR, "production");
        env.set("FUSION_CACHE_CACHE__ENABLED", "false");

        let settings = ConfigLoader::new().unwrap().load().unwrap();

        // environment variable beats every file
        assert!(!settings.cache.enabled);
        // local.toml beats production.toml
        assert_eq!(settings.cache.ttl_seconds, 900);
        // production.toml beats default.toml
        assert_eq!(settings.cache.backend, CacheBackend::Memcached);
        assert_eq!(settings.cache.memcached.servers[0].host, "cache-prod");
        // default.toml fills the rest
        assert_eq!(settings.cache.file.directory, "/var/cache/app");
    }

    #[test]
    fn test_env_var_override() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        let dir = setup_config_dir(&[("default.toml", DEFAULT_TOML)]);
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());
        env.set("FUSION_CACHE_CACHE__TTL_SECONDS", "42");

        let settings = ConfigLoader::new().unwrap().load().unwrap();
        assert_eq!(settings.cache.ttl_seconds, 42);
    }

    #[test]
    fn test_single_file_mode() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let _env = EnvGuard::clean();
        let dir = setup_config_dir(&[(
            "single.toml",
            r#"
[cache]
enabled = true
backend = "memcached"

[cache.memcached]
compression = true
"#,
        )]);

        let settings = ConfigLoader::from_file(dir.path().join("single.toml"))
            .load()
            .unwrap();
        assert_eq!(settings.cache.backend, CacheBackend::Memcached);
        assert!(settings.cache.memcached.compression);
        assert_eq!(settings.cache.memcached.servers.len(), 1);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let _lock = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        let dir = setup_config_dir(&[(
            "default.toml",
            r#"
[cache]
backend = "memcached"

[cache.memcached]
servers = []
"#,
        )]);
        env.set(CONFIG_DIR_ENV, dir.path().to_str().unwrap());

        let err = ConfigLoader::new().unwrap().load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
