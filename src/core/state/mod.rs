mod settings;

pub use settings::{StagerSettings, SETTINGS_FILE};
