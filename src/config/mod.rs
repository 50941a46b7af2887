pub mod settings;

pub use settings::{
    BehaviorConfig, Config, FileExtensionsVisibility, FileIconStyle, GitConfig,
    SourceControlConfig, UiConfig,
};
