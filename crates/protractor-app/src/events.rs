use protractor::config::ConfigRecord;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Activate,
    Deactivate,
    Clear,
    OpenSettings,
    Apply(ConfigRecord),
    SettingsReload,
}
