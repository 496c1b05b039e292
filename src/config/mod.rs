//! The `config` module loads the relay's settings.
//!
//! Values come from an optional `config/default` file and from environment
//! variables prefixed with `RELAYCAST_`; anything left unspecified falls back
//! to the defaults in [`Settings::default`].

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{LoggingSettings, ServerSettings, Settings, normalize_path};

/// Prefix for environment overrides, e.g. `RELAYCAST_SERVER_PORT=9000`.
pub const ENV_PREFIX: &str = "RELAYCAST";

/// Loads the configuration from the default file and environment variables
/// and merges it with default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("_")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}
