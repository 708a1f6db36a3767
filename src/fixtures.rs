#[cfg(test)]
pub mod test {
    use serde::{Deserialize, Serialize};

    use crate::config::AppConfig;
    use crate::error::ClappError;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct TestConfig {
        /// The application name.
        pub name: String,

        /// The port number.
        pub port: i64,

        /// Enable debug mode.
        pub debug: bool,

        pub tags: Vec<String>,

        /// Database settings.
        pub database: TestDbConfig,
    }

    impl Default for TestConfig {
        fn default() -> Self {
            Self {
                name: "default".into(),
                port: 8080,
                debug: false,
                tags: vec!["base".into()],
                database: TestDbConfig::default(),
            }
        }
    }

    impl AppConfig for TestConfig {}

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct TestDbConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        pub pool_size: i64,
    }

    impl Default for TestDbConfig {
        fn default() -> Self {
            Self {
                url: None,
                pool_size: 5,
            }
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = TestConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.pool_size, 5);
    }

    // -- Fixtures for the logger adjuster ---------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
    pub struct LoggingConfig {
        pub log_level: i64,
        pub log_format: String,
    }

    impl AppConfig for LoggingConfig {}

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
    pub struct BadLevelConfig {
        pub log_level: String,
    }

    impl AppConfig for BadLevelConfig {}

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
    pub struct BadFormatConfig {
        pub log_format: i64,
    }

    impl AppConfig for BadFormatConfig {}

    /// Exposes its level through the trait instead of a `log_level` field.
    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
    pub struct TypedLoggingConfig {
        pub verbose: bool,
    }

    impl AppConfig for TypedLoggingConfig {
        fn log_level(&self) -> Result<Option<i64>, ClappError> {
            Ok(self.verbose.then_some(-1))
        }
    }

    // -- Fixture for required environment variables -----------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
    pub struct RequiredEnvConfig {
        pub api_token: String,
    }

    impl AppConfig for RequiredEnvConfig {
        fn required_env() -> &'static [&'static str] {
            &["api_token"]
        }
    }

    // -- Fixture for the precedence tests ---------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct LayerConfig {
        pub a: String,
    }

    impl Default for LayerConfig {
        fn default() -> Self {
            Self { a: "default".into() }
        }
    }

    impl AppConfig for LayerConfig {}

    // -- Fixtures for fields without a type to parse against ---------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
    pub struct ListConfig {
        pub names: Vec<String>,
        pub ids: Vec<i64>,
        pub limit: Option<i64>,
    }

    impl AppConfig for ListConfig {}

    // -- Fixtures for fields serde skips ----------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct SkipConfig {
        pub name: String,
        #[serde(skip)]
        pub runtime: i64,
    }

    impl Default for SkipConfig {
        fn default() -> Self {
            Self {
                name: "d".into(),
                runtime: 42,
            }
        }
    }

    impl AppConfig for SkipConfig {}

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct RestoringSkipConfig {
        pub name: String,
        #[serde(skip)]
        pub runtime: i64,
    }

    impl Default for RestoringSkipConfig {
        fn default() -> Self {
            Self {
                name: "d".into(),
                runtime: 42,
            }
        }
    }

    impl AppConfig for RestoringSkipConfig {
        fn restore_skipped(&mut self, previous: Self) {
            self.runtime = previous.runtime;
        }
    }
}
