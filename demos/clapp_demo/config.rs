//! Configuration for the clapp demo application.
//!
//! # Env var mapping
//!
//! The root command is named `clapp-demo`, so the prefix is `CLAPP_DEMO`:
//!
//! | Env var                       | Config key          |
//! |-------------------------------|---------------------|
//! | `CLAPP_DEMO_GLOBAL`           | `global`            |
//! | `CLAPP_DEMO_MY_CONFIG_VAR`    | `my_config_var`     |
//! | `CLAPP_DEMO_LOG_LEVEL`        | `log_level`         |
//! | `CLAPP_DEMO_LOG_FORMAT`       | `log_format`        |

use clapp::AppConfig;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DemoConfig {
    /// Settable from any command through `--global-var`.
    pub global: String,

    /// Settable on the root command through `--my-config-var` / `-m`.
    pub my_config_var: String,

    /// Integer log level: -1 trace, 0 debug, 1 info, 2 warn, 3 error.
    pub log_level: i64,

    /// `console` or `json`.
    pub log_format: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            global: "global".into(),
            my_config_var: "ping".into(),
            log_level: 1,
            log_format: "console".into(),
        }
    }
}

impl AppConfig for DemoConfig {}
