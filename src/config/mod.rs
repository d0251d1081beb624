mod settings;

use config::{Config, Environment, File};

use crate::utils::error::Result;

pub use settings::{MIN_IDLE_TIMEOUT_MS, PartialSettings, Settings, idle_timeout_ms};

/// Loads the configuration from `config/default` and the process environment,
/// merged over the default values.
pub fn load_config() -> Result<Settings> {
    load_config_from("config/default")
}

/// Same as [`load_config`] but reads the optional file at `path`
/// (extension may be omitted, as with `config::File::with_name`).
///
/// Environment variables are read unprefixed and unsplit, so `PORT` maps to
/// `port` and `IDLE_TIMEOUT_MS` to `idle_timeout_ms`.
pub fn load_config_from(path: &str) -> Result<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::default().try_parsing(true));

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}
