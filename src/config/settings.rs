use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub source_control: SourceControlConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    /// Executable used for every command
    pub binary: String,
    pub min_version_check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BehaviorConfig {
    pub log_commands: bool,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceControlConfig {
    pub enable_source_control: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UiConfig {
    pub file_extensions_visibility: FileExtensionsVisibility,
    pub shown_file_extensions: Vec<String>,
    pub hidden_file_extensions: Vec<String>,
    pub file_icon_style: FileIconStyle,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileExtensionsVisibility {
    ShowAll,
    HideAll,
    ShowOnly,
    HideOnly,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileIconStyle {
    Color,
    Monochrome,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            binary: "git".to_string(),
            min_version_check: true,
            audit_log: None,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            log_commands: false,
            log_level: "info".to_string(),
        }
    }
}

impl Default for SourceControlConfig {
    fn default() -> Self {
        SourceControlConfig {
            enable_source_control: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            file_extensions_visibility: FileExtensionsVisibility::ShowAll,
            shown_file_extensions: Vec::new(),
            hidden_file_extensions: Vec::new(),
            file_icon_style: FileIconStyle::Color,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitclient"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the default location, falling back to defaults when no file exists
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default_config());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            git: GitConfig::default(),
            behavior: BehaviorConfig::default(),
            source_control: SourceControlConfig::default(),
            ui: UiConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "git.binary must not be empty".to_string(),
            ));
        }

        if self.git.binary.chars().any(|c| c.is_whitespace() || c == '$' || c == '`') {
            return Err(ConfigError::InvalidValue(format!(
                "git.binary contains unsupported characters: {}",
                self.git.binary
            )));
        }

        if !LOG_LEVELS.contains(&self.behavior.log_level.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "Unknown log level: {}. Expected one of {}",
                self.behavior.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

impl UiConfig {
    /// Name to show for a file under the extension visibility rule
    pub fn display_name(&self, file_name: &str) -> String {
        let Some((stem, ext)) = file_name.rsplit_once('.').filter(|(stem, _)| !stem.is_empty())
        else {
            return file_name.to_string();
        };

        let hide = match self.file_extensions_visibility {
            FileExtensionsVisibility::ShowAll => false,
            FileExtensionsVisibility::HideAll => true,
            FileExtensionsVisibility::ShowOnly => {
                !self.shown_file_extensions.iter().any(|e| e == ext)
            }
            FileExtensionsVisibility::HideOnly => {
                self.hidden_file_extensions.iter().any(|e| e == ext)
            }
        };

        if hide { stem.to_string() } else { file_name.to_string() }
    }

    /// Whether file icons are drawn in their language color
    pub fn colored_icons(&self) -> bool {
        self.file_icon_style == FileIconStyle::Color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.git.binary, "git");
        assert!(config.source_control.enable_source_control);
        assert_eq!(config.behavior.log_level, "info");
        assert!(config.ui.colored_icons());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default_config().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_binary() {
        let mut config = Config::default_config();
        config.git.binary = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_binary_with_substitution() {
        let mut config = Config::default_config();
        config.git.binary = "$(evil)".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_log_level() {
        let mut config = Config::default_config();
        config.behavior.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = Config::default_config();
        config.ui.file_extensions_visibility = FileExtensionsVisibility::HideOnly;
        config.ui.hidden_file_extensions = vec!["rs".to_string()];

        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let parsed: Config = toml::from_str(
            "[ui]\nfile_extensions_visibility = \"hide_all\"\nshown_file_extensions = []\nhidden_file_extensions = []\nfile_icon_style = \"monochrome\"\n",
        )
        .unwrap();

        assert_eq!(parsed.git, GitConfig::default());
        assert_eq!(parsed.ui.file_extensions_visibility, FileExtensionsVisibility::HideAll);
        assert!(!parsed.ui.colored_icons());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default_config();
        config.behavior.log_commands = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "git = [").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_display_name_visibility_modes() {
        let mut ui = UiConfig::default();
        assert_eq!(ui.display_name("main.rs"), "main.rs");

        ui.file_extensions_visibility = FileExtensionsVisibility::HideAll;
        assert_eq!(ui.display_name("main.rs"), "main");
        assert_eq!(ui.display_name(".gitignore"), ".gitignore");
        assert_eq!(ui.display_name("Makefile"), "Makefile");

        ui.file_extensions_visibility = FileExtensionsVisibility::ShowOnly;
        ui.shown_file_extensions = vec!["rs".to_string()];
        assert_eq!(ui.display_name("main.rs"), "main.rs");
        assert_eq!(ui.display_name("notes.txt"), "notes");

        ui.file_extensions_visibility = FileExtensionsVisibility::HideOnly;
        ui.hidden_file_extensions = vec!["txt".to_string()];
        assert_eq!(ui.display_name("main.rs"), "main.rs");
        assert_eq!(ui.display_name("notes.txt"), "notes");
    }
}
