//! Settings for every stage of a job, persisted as `settings.toml`.
//!
//! One table per concern (paths, tools, conversion, separation,
//! transcription, intake, logging). Missing keys take their defaults and the
//! file is completed on disk the next time it is loaded.
//!
//! ```no_run
//! use stemscribe_core::config::{ConfigManager, ConfigSection};
//!
//! # fn main() -> Result<(), stemscribe_core::config::ConfigError> {
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create()?;
//! config.settings_mut().separation.model = "htdemucs".into();
//! config.update_section(ConfigSection::Separation)?;
//! # Ok(())
//! # }
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, ConversionSettings, IntakeSettings, LoggingSettings, PathSettings,
    SeparationSettings, Settings, ToolSettings, TranscriptionSettings,
};
