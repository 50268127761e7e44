//! Loading and persisting `settings.toml`.
//!
//! The file is written whole through a temp file and rename. A file missing
//! keys (or carrying tables nobody reads) is rewritten with defaults on load;
//! `update_section` edits one table in place and leaves the rest untouched.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("settings file is not editable TOML: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("settings file {0} does not exist")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings file path and the settings read from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Nothing is read until `load` or `load_or_create`.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Strict load: the file must exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        let content = match fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.config_path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load, writing defaults first when there is no file yet.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        match self.load() {
            Ok(()) => {
                let content = fs::read_to_string(&self.config_path)?;
                if needs_rewrite(&content, &self.settings)? {
                    tracing::debug!(
                        path = %self.config_path.display(),
                        "settings file incomplete, rewriting with defaults"
                    );
                    self.save()?;
                }
                Ok(())
            }
            Err(ConfigError::NotFound(_)) => {
                self.settings = Settings::default();
                self.save()
            }
            Err(e) => Err(e),
        }
    }

    /// Create every folder the pipeline writes into.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        let dirs = [
            paths.upload_dir(),
            paths.processed_dir(),
            paths.work_dir(),
            paths.logs_dir(),
        ];
        for dir in dirs.iter() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn save(&self) -> ConfigResult<()> {
        let rendered = self.render_document()?;
        self.write_replacing(&rendered)?;
        Ok(())
    }

    /// Replace one table on disk, keeping hand edits made elsewhere.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = match fs::read_to_string(&self.config_path) {
            Ok(text) if !text.trim().is_empty() => text.parse::<DocumentMut>()?,
            Ok(_) => DocumentMut::new(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => return Err(e.into()),
        };

        let table: DocumentMut = toml::to_string_pretty(&section_value(&self.settings, section)?)?
            .parse()?;
        doc[section.table_name()] = Item::Table(table.as_table().clone());

        self.write_replacing(&doc.to_string())?;
        Ok(())
    }

    fn render_document(&self) -> ConfigResult<String> {
        let mut out = String::from("# Stemscribe settings\n");
        out.push_str("# Regenerated when keys are missing; edit values freely.\n");

        for section in ConfigSection::ALL {
            let body = toml::to_string_pretty(&section_value(&self.settings, section)?)?;
            out.push_str(&format!(
                "\n# {}\n[{}]\n{}",
                section.comment(),
                section.table_name(),
                body
            ));
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn write_replacing(&self, content: &str) -> io::Result<()> {
        match self.config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
            _ => {}
        }

        let staging = self.config_path.with_extension("toml.tmp");
        let mut file = fs::File::create(&staging)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, &self.config_path)
    }
}

/// One section of `settings` as a TOML table.
fn section_value(settings: &Settings, section: ConfigSection) -> ConfigResult<toml::Value> {
    let value = match section {
        ConfigSection::Paths => toml::Value::try_from(&settings.paths),
        ConfigSection::Tools => toml::Value::try_from(&settings.tools),
        ConfigSection::Conversion => toml::Value::try_from(&settings.conversion),
        ConfigSection::Separation => toml::Value::try_from(&settings.separation),
        ConfigSection::Transcription => toml::Value::try_from(&settings.transcription),
        ConfigSection::Intake => toml::Value::try_from(&settings.intake),
        ConfigSection::Logging => toml::Value::try_from(&settings.logging),
    }?;
    Ok(value)
}

/// True when the file lacks a known key or carries an unknown table.
fn needs_rewrite(content: &str, settings: &Settings) -> ConfigResult<bool> {
    let doc: DocumentMut = content.parse()?;

    let unknown_table = doc
        .iter()
        .any(|(key, _)| !ConfigSection::ALL.iter().any(|s| s.table_name() == key));
    if unknown_table {
        return Ok(true);
    }

    for section in ConfigSection::ALL {
        let Some(table) = doc.get(section.table_name()).and_then(Item::as_table) else {
            return Ok(true);
        };
        if let toml::Value::Table(expected) = section_value(settings, section)? {
            if expected.keys().any(|key| !table.contains_key(key)) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
