//! Configuration module for toolstash.
//!
//! Settings come from defaults, an optional `config.json` in the toolstash
//! home directory, and environment variables, in that order.

mod settings;

pub use settings::{
    parse_bool, ConfigError, Settings, DEFAULT_GITHUB_API, ENV_GITHUB_API, ENV_HOME, ENV_PROGRESS,
};
