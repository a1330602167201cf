use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// When notification previews are shown on the lock screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShowPreviewOption {
    #[serde(rename = "always")]
    Always,
    #[serde(rename = "when-unlocked")]
    WhenUnlocked,
    #[serde(rename = "never")]
    Never,
}

impl ShowPreviewOption {
    pub const ALL: [ShowPreviewOption; 3] = [Self::Always, Self::WhenUnlocked, Self::Never];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::WhenUnlocked => "when-unlocked",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ShowPreviewOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowPreviewOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|o| o.as_str() == s).ok_or(())
    }
}

/// Idle delay before the device locks itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoLockOption {
    #[serde(rename = "1-minute")]
    OneMinute,
    #[serde(rename = "2-minutes")]
    TwoMinutes,
    #[serde(rename = "5-minutes")]
    FiveMinutes,
    #[serde(rename = "never")]
    Never,
}

impl AutoLockOption {
    pub const ALL: [AutoLockOption; 4] = [
        Self::OneMinute,
        Self::TwoMinutes,
        Self::FiveMinutes,
        Self::Never,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1-minute",
            Self::TwoMinutes => "2-minutes",
            Self::FiveMinutes => "5-minutes",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for AutoLockOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoLockOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|o| o.as_str() == s).ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectivitySettings {
    pub wifi_enabled: bool,
    pub wifi_network: String,
    pub bluetooth_enabled: bool,
    pub airplane_mode: bool,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            wifi_enabled: true,
            wifi_network: "Home Wi-Fi".to_string(),
            bluetooth_enabled: true,
            airplane_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub show_previews: ShowPreviewOption,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_previews: ShowPreviewOption::WhenUnlocked,
        }
    }
}

/// Round and clamp a number to a 0 - 100 percentage.
///
/// Returns `None` for NaN and infinities.
pub fn percent_from_f64(value: f64) -> Option<u8> {
    value
        .is_finite()
        .then(|| value.round().clamp(0.0, 100.0) as u8)
}

fn deserialize_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    percent_from_f64(value)
        .ok_or_else(|| serde::de::Error::custom(format!("{} is not a finite percentage", value)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundSettings {
    pub enabled: bool,
    pub vibrate_on_ring: bool,
    pub vibrate_on_silent: bool,
    /// Percentage, 0 - 100
    #[serde(deserialize_with = "deserialize_percent")]
    pub volume: u8,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            vibrate_on_ring: true,
            vibrate_on_silent: false,
            volume: 65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    /// Percentage, 0 - 100
    #[serde(deserialize_with = "deserialize_percent")]
    pub brightness: u8,
    pub night_shift: bool,
    /// Percentage, 0 - 100
    #[serde(deserialize_with = "deserialize_percent")]
    pub text_size: u8,
    pub auto_lock: AutoLockOption,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            brightness: 75,
            night_shift: false,
            text_size: 55,
            auto_lock: AutoLockOption::TwoMinutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    pub background_app_refresh: bool,
    pub date_time_automatic: bool,
    pub keyboard_clicks: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            background_app_refresh: true,
            date_time_automatic: true,
            keyboard_clicks: true,
        }
    }
}

/// Quiet hours window, stored as `HH:MM` strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub start: String,
    pub end: String,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            start: "22:00".to_string(),
            end: "07:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoNotDisturbSettings {
    pub enabled: bool,
    pub schedule: Arc<Schedule>,
}

/// The complete settings tree.
///
/// Sections sit behind `Arc` so that a reducer step can reuse every section it
/// did not touch. Cloning a `SettingsState` is therefore a handful of reference
/// count bumps, and `Arc::ptr_eq` on a section tells whether it changed.
///
/// Equality is structural (deep), independent of sharing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsState {
    pub connectivity: Arc<ConnectivitySettings>,
    pub notifications: Arc<NotificationSettings>,
    pub sounds: Arc<SoundSettings>,
    pub display: Arc<DisplaySettings>,
    pub general: Arc<GeneralSettings>,
    pub do_not_disturb: Arc<DoNotDisturbSettings>,
}

/// Top-level sections of [`SettingsState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Connectivity,
    Notifications,
    Sounds,
    Display,
    General,
    DoNotDisturb,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Self::Connectivity,
        Self::Notifications,
        Self::Sounds,
        Self::Display,
        Self::General,
        Self::DoNotDisturb,
    ];

    /// Key used in dotted paths and in the serialized blob
    pub fn key(&self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Notifications => "notifications",
            Self::Sounds => "sounds",
            Self::Display => "display",
            Self::General => "general",
            Self::DoNotDisturb => "doNotDisturb",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Values the view layer derives from settings on every change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    /// Brightness as a 0.0 - 1.0 factor
    pub brightness: f32,
    pub sounds_on: bool,
    pub do_not_disturb_on: bool,
}

impl SettingsState {
    /// Sections whose shared pointer differs between `self` and `other`
    pub fn changed_sections(&self, other: &SettingsState) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|section| !self.shares_section(other, *section))
            .collect()
    }

    fn shares_section(&self, other: &SettingsState, section: Section) -> bool {
        match section {
            Section::Connectivity => Arc::ptr_eq(&self.connectivity, &other.connectivity),
            Section::Notifications => Arc::ptr_eq(&self.notifications, &other.notifications),
            Section::Sounds => Arc::ptr_eq(&self.sounds, &other.sounds),
            Section::Display => Arc::ptr_eq(&self.display, &other.display),
            Section::General => Arc::ptr_eq(&self.general, &other.general),
            Section::DoNotDisturb => Arc::ptr_eq(&self.do_not_disturb, &other.do_not_disturb),
        }
    }

    pub fn presentation(&self) -> Presentation {
        Presentation {
            brightness: f32::from(self.display.brightness) / 100.0,
            sounds_on: self.sounds.enabled,
            do_not_disturb_on: self.do_not_disturb.enabled,
        }
    }
}
