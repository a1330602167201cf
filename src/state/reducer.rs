//! Settings reducer.
//!
//! Every mutation of [`SettingsState`] is an explicit [`SettingsAction`]. Toggle
//! targets and set targets are closed enums, so a well-typed action cannot name
//! a field that does not exist and [`reduce`] never fails. Free-form input
//! (dotted paths and string values from a UI or the CLI) is validated once,
//! when it is parsed into these enums.

use crate::models::{AutoLockOption, SettingsState, ShowPreviewOption, percent_from_f64};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors from turning free-form input into settings actions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Unknown settings field: {0}")]
    UnknownField(String),

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidValue {
        field: SettingField,
        value: String,
        reason: String,
    },
}

/// Boolean leaf fields that can be flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleField {
    WifiEnabled,
    BluetoothEnabled,
    AirplaneMode,
    NotificationsEnabled,
    SoundsEnabled,
    VibrateOnRing,
    VibrateOnSilent,
    NightShift,
    BackgroundAppRefresh,
    DateTimeAutomatic,
    KeyboardClicks,
    DoNotDisturbEnabled,
}

impl ToggleField {
    pub const ALL: [ToggleField; 12] = [
        Self::WifiEnabled,
        Self::BluetoothEnabled,
        Self::AirplaneMode,
        Self::NotificationsEnabled,
        Self::SoundsEnabled,
        Self::VibrateOnRing,
        Self::VibrateOnSilent,
        Self::NightShift,
        Self::BackgroundAppRefresh,
        Self::DateTimeAutomatic,
        Self::KeyboardClicks,
        Self::DoNotDisturbEnabled,
    ];

    /// Dotted path of the field in the serialized tree
    pub fn path(&self) -> &'static str {
        match self {
            Self::WifiEnabled => "connectivity.wifiEnabled",
            Self::BluetoothEnabled => "connectivity.bluetoothEnabled",
            Self::AirplaneMode => "connectivity.airplaneMode",
            Self::NotificationsEnabled => "notifications.enabled",
            Self::SoundsEnabled => "sounds.enabled",
            Self::VibrateOnRing => "sounds.vibrateOnRing",
            Self::VibrateOnSilent => "sounds.vibrateOnSilent",
            Self::NightShift => "display.nightShift",
            Self::BackgroundAppRefresh => "general.backgroundAppRefresh",
            Self::DateTimeAutomatic => "general.dateTimeAutomatic",
            Self::KeyboardClicks => "general.keyboardClicks",
            Self::DoNotDisturbEnabled => "doNotDisturb.enabled",
        }
    }

    /// Read the current value of the field
    pub fn get(&self, state: &SettingsState) -> bool {
        match self {
            Self::WifiEnabled => state.connectivity.wifi_enabled,
            Self::BluetoothEnabled => state.connectivity.bluetooth_enabled,
            Self::AirplaneMode => state.connectivity.airplane_mode,
            Self::NotificationsEnabled => state.notifications.enabled,
            Self::SoundsEnabled => state.sounds.enabled,
            Self::VibrateOnRing => state.sounds.vibrate_on_ring,
            Self::VibrateOnSilent => state.sounds.vibrate_on_silent,
            Self::NightShift => state.display.night_shift,
            Self::BackgroundAppRefresh => state.general.background_app_refresh,
            Self::DateTimeAutomatic => state.general.date_time_automatic,
            Self::KeyboardClicks => state.general.keyboard_clicks,
            Self::DoNotDisturbEnabled => state.do_not_disturb.enabled,
        }
    }
}

impl fmt::Display for ToggleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ToggleField {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.path() == s)
            .ok_or_else(|| SettingsError::UnknownField(s.to_string()))
    }
}

/// Leaf fields that take a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingField {
    WifiNetwork,
    ShowPreviews,
    Volume,
    Brightness,
    TextSize,
    AutoLock,
    ScheduleStart,
    ScheduleEnd,
}

impl SettingField {
    pub const ALL: [SettingField; 8] = [
        Self::WifiNetwork,
        Self::ShowPreviews,
        Self::Volume,
        Self::Brightness,
        Self::TextSize,
        Self::AutoLock,
        Self::ScheduleStart,
        Self::ScheduleEnd,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::WifiNetwork => "connectivity.wifiNetwork",
            Self::ShowPreviews => "notifications.showPreviews",
            Self::Volume => "sounds.volume",
            Self::Brightness => "display.brightness",
            Self::TextSize => "display.textSize",
            Self::AutoLock => "display.autoLock",
            Self::ScheduleStart => "doNotDisturb.schedule.start",
            Self::ScheduleEnd => "doNotDisturb.schedule.end",
        }
    }

    /// Whether the field stores a 0 - 100 percentage
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Volume | Self::Brightness | Self::TextSize)
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for SettingField {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.path() == s)
            .ok_or_else(|| SettingsError::UnknownField(s.to_string()))
    }
}

/// A typed new value for one settable leaf
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    WifiNetwork(String),
    ShowPreviews(ShowPreviewOption),
    Volume(u8),
    Brightness(u8),
    TextSize(u8),
    AutoLock(AutoLockOption),
    ScheduleStart(String),
    ScheduleEnd(String),
}

impl SettingUpdate {
    pub fn field(&self) -> SettingField {
        match self {
            Self::WifiNetwork(_) => SettingField::WifiNetwork,
            Self::ShowPreviews(_) => SettingField::ShowPreviews,
            Self::Volume(_) => SettingField::Volume,
            Self::Brightness(_) => SettingField::Brightness,
            Self::TextSize(_) => SettingField::TextSize,
            Self::AutoLock(_) => SettingField::AutoLock,
            Self::ScheduleStart(_) => SettingField::ScheduleStart,
            Self::ScheduleEnd(_) => SettingField::ScheduleEnd,
        }
    }

    /// Build an update from a raw string value.
    ///
    /// Numeric fields accept any finite number (`"40"`, `"40.6"`, `"1e1"`),
    /// rounded and clamped to 0 - 100. Enum fields accept their serialized
    /// names. Text and time fields are stored as given.
    pub fn parse(field: SettingField, raw: &str) -> Result<Self, SettingsError> {
        let invalid = |reason: &str| SettingsError::InvalidValue {
            field,
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let update = match field {
            SettingField::WifiNetwork => Self::WifiNetwork(raw.to_string()),
            SettingField::ScheduleStart => Self::ScheduleStart(raw.to_string()),
            SettingField::ScheduleEnd => Self::ScheduleEnd(raw.to_string()),
            SettingField::ShowPreviews => Self::ShowPreviews(
                raw.parse::<ShowPreviewOption>()
                    .map_err(|_| invalid("expected always, when-unlocked or never"))?,
            ),
            SettingField::AutoLock => Self::AutoLock(
                raw.parse::<AutoLockOption>()
                    .map_err(|_| invalid("expected 1-minute, 2-minutes, 5-minutes or never"))?,
            ),
            SettingField::Volume | SettingField::Brightness | SettingField::TextSize => {
                let number: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid("expected a number"))?;
                let percent =
                    percent_from_f64(number).ok_or_else(|| invalid("expected a finite number"))?;
                match field {
                    SettingField::Volume => Self::Volume(percent),
                    SettingField::Brightness => Self::Brightness(percent),
                    _ => Self::TextSize(percent),
                }
            }
        };

        Ok(update)
    }

    /// Parse a dotted path and raw value in one step
    pub fn from_path(path: &str, raw: &str) -> Result<Self, SettingsError> {
        Self::parse(path.parse()?, raw)
    }
}

/// Actions accepted by [`reduce`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    Toggle(ToggleField),
    Set(SettingUpdate),
    Hydrate(SettingsState),
}

/// Apply an action, returning the next state.
///
/// The input is never modified. Sections the action does not touch are shared
/// with the input (`Arc::ptr_eq` holds for them); the touched section, and for
/// schedule updates the nested schedule, is a fresh allocation.
pub fn reduce(state: &SettingsState, action: SettingsAction) -> SettingsState {
    match action {
        SettingsAction::Hydrate(next) => next,
        SettingsAction::Toggle(field) => toggle(state, field),
        SettingsAction::Set(update) => set(state, update),
    }
}

fn toggle(state: &SettingsState, field: ToggleField) -> SettingsState {
    let mut next = state.clone();

    match field {
        ToggleField::WifiEnabled => flip(&mut Arc::make_mut(&mut next.connectivity).wifi_enabled),
        ToggleField::BluetoothEnabled => {
            flip(&mut Arc::make_mut(&mut next.connectivity).bluetooth_enabled)
        }
        ToggleField::AirplaneMode => flip(&mut Arc::make_mut(&mut next.connectivity).airplane_mode),
        ToggleField::NotificationsEnabled => {
            flip(&mut Arc::make_mut(&mut next.notifications).enabled)
        }
        ToggleField::SoundsEnabled => flip(&mut Arc::make_mut(&mut next.sounds).enabled),
        ToggleField::VibrateOnRing => flip(&mut Arc::make_mut(&mut next.sounds).vibrate_on_ring),
        ToggleField::VibrateOnSilent => {
            flip(&mut Arc::make_mut(&mut next.sounds).vibrate_on_silent)
        }
        ToggleField::NightShift => flip(&mut Arc::make_mut(&mut next.display).night_shift),
        ToggleField::BackgroundAppRefresh => {
            flip(&mut Arc::make_mut(&mut next.general).background_app_refresh)
        }
        ToggleField::DateTimeAutomatic => {
            flip(&mut Arc::make_mut(&mut next.general).date_time_automatic)
        }
        ToggleField::KeyboardClicks => flip(&mut Arc::make_mut(&mut next.general).keyboard_clicks),
        ToggleField::DoNotDisturbEnabled => {
            flip(&mut Arc::make_mut(&mut next.do_not_disturb).enabled)
        }
    }

    next
}

fn set(state: &SettingsState, update: SettingUpdate) -> SettingsState {
    let mut next = state.clone();

    match update {
        SettingUpdate::WifiNetwork(v) => Arc::make_mut(&mut next.connectivity).wifi_network = v,
        SettingUpdate::ShowPreviews(v) => Arc::make_mut(&mut next.notifications).show_previews = v,
        SettingUpdate::Volume(v) => Arc::make_mut(&mut next.sounds).volume = v.min(100),
        SettingUpdate::Brightness(v) => Arc::make_mut(&mut next.display).brightness = v.min(100),
        SettingUpdate::TextSize(v) => Arc::make_mut(&mut next.display).text_size = v.min(100),
        SettingUpdate::AutoLock(v) => Arc::make_mut(&mut next.display).auto_lock = v,
        SettingUpdate::ScheduleStart(v) => {
            let dnd = Arc::make_mut(&mut next.do_not_disturb);
            Arc::make_mut(&mut dnd.schedule).start = v;
        }
        SettingUpdate::ScheduleEnd(v) => {
            let dnd = Arc::make_mut(&mut next.do_not_disturb);
            Arc::make_mut(&mut dnd.schedule).end = v;
        }
    }

    next
}

fn flip(value: &mut bool) {
    *value = !*value;
}
