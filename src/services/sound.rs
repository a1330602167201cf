//! Procedural UI sound cues.
//!
//! Each [`SoundCue`] maps to a short [`ToneProfile`]: one oscillator through a
//! linear attack/decay envelope. [`SoundManager`] renders a cue once, caches
//! the buffer, and hands it to an [`AudioSink`] with a gain derived from the
//! current settings.

use crate::metrics::Metrics;
use crate::state::SettingsStore;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Time to reach full gain, in seconds
pub const ATTACK_SECONDS: f64 = 0.01;

/// Extra oscillator time after the envelope reaches its floor
pub const TAIL_SECONDS: f64 = 0.02;

/// Envelope value at the end of the decay
const ENVELOPE_FLOOR: f64 = 0.0001;

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("Unknown sound cue: {0}")]
    UnknownCue(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Audio output failed: {0}")]
    Output(String),
}

/// Named UI cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Lock,
    Unlock,
    Tap,
    Notification,
}

impl SoundCue {
    pub const ALL: [SoundCue; 4] = [Self::Lock, Self::Unlock, Self::Tap, Self::Notification];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Tap => "tap",
            Self::Notification => "notification",
        }
    }

    pub fn profile(&self) -> ToneProfile {
        match self {
            Self::Lock => ToneProfile::new(220.0, Waveform::Triangle, 0.22, 0.28),
            Self::Unlock => ToneProfile::new(494.0, Waveform::Sine, 0.32, 0.24),
            Self::Tap => ToneProfile::new(660.0, Waveform::Square, 0.08, 0.18),
            Self::Notification => ToneProfile::new(880.0, Waveform::Triangle, 0.45, 0.25),
        }
    }
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundCue {
    type Err = SoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cue| cue.as_str() == s)
            .ok_or_else(|| SoundError::UnknownCue(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
}

impl Waveform {
    /// Oscillator value in [-1, 1] at `phase` cycles
    pub fn sample(&self, phase: f64) -> f64 {
        let p = phase.rem_euclid(1.0);
        match self {
            Self::Sine => (TAU * p).sin(),
            Self::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneProfile {
    pub frequency: f64,
    pub waveform: Waveform,
    /// Envelope length in seconds
    pub duration: f64,
    /// Peak gain
    pub gain: f64,
}

impl ToneProfile {
    pub const fn new(frequency: f64, waveform: Waveform, duration: f64, gain: f64) -> Self {
        Self {
            frequency,
            waveform,
            duration,
            gain,
        }
    }

    /// Envelope value at `t` seconds.
    ///
    /// Rises linearly from 0 to `gain` over the attack, falls linearly to the
    /// floor at `duration`, stays at the floor through the tail.
    pub fn envelope(&self, t: f64) -> f64 {
        if t <= 0.0 {
            0.0
        } else if t < ATTACK_SECONDS {
            self.gain * t / ATTACK_SECONDS
        } else if t < self.duration {
            let progress = (t - ATTACK_SECONDS) / (self.duration - ATTACK_SECONDS);
            self.gain + (ENVELOPE_FLOOR - self.gain) * progress
        } else {
            ENVELOPE_FLOOR
        }
    }

    /// Total rendered length in seconds
    pub fn total_seconds(&self) -> f64 {
        self.duration + TAIL_SECONDS
    }
}

/// Render a tone to mono samples at full volume
pub fn synthesize(profile: &ToneProfile, sample_rate: u32) -> Vec<f32> {
    let rate = f64::from(sample_rate);
    let count = (profile.total_seconds() * rate).round() as usize;

    (0..count)
        .map(|i| {
            let t = i as f64 / rate;
            let value = profile.waveform.sample(profile.frequency * t) * profile.envelope(t);
            value as f32
        })
        .collect()
}

/// One rendered cue ready for output
#[derive(Debug, Clone)]
pub struct Playback {
    pub cue: SoundCue,
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
    /// Volume multiplier in [0, 1]
    pub gain: f32,
}

impl Playback {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Samples with the gain applied
    pub fn scaled_samples(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s * self.gain).collect()
    }

    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .fold(0.0_f32, |peak, s| peak.max(s.abs()))
            * self.gain
    }
}

/// Audio output seam
#[cfg_attr(test, mockall::automock)]
pub trait AudioSink: Send + Sync {
    fn play(&self, playback: &Playback) -> Result<(), SoundError>;
}

/// Sink that only logs what it would play
#[derive(Debug, Default)]
pub struct LogSink;

impl AudioSink for LogSink {
    fn play(&self, playback: &Playback) -> Result<(), SoundError> {
        tracing::info!(
            "Playing cue {} ({} samples at {} Hz, {:.2}s, gain {:.2}, peak {:.3})",
            playback.cue,
            playback.samples.len(),
            playback.sample_rate,
            playback.duration_secs(),
            playback.gain,
            playback.peak()
        );
        Ok(())
    }
}

/// Sink that keeps every playback in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    played: Mutex<Vec<Playback>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<Playback> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, playback: &Playback) -> Result<(), SoundError> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(playback.clone());
        Ok(())
    }
}

/// Plays cues according to the current sound and do-not-disturb settings
pub struct SoundManager {
    store: SettingsStore,
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
    buffers: Mutex<HashMap<SoundCue, Arc<[f32]>>>,
    metrics: Arc<Metrics>,
}

impl SoundManager {
    pub fn new(
        store: SettingsStore,
        sink: Arc<dyn AudioSink>,
        sample_rate: u32,
    ) -> Result<Self, SoundError> {
        if sample_rate == 0 {
            return Err(SoundError::InvalidSampleRate(sample_rate));
        }

        let metrics = Arc::clone(store.metrics());
        Ok(Self {
            store,
            sink,
            sample_rate,
            buffers: Mutex::default(),
            metrics,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Volume multiplier for `cue` under the current settings, `None` when muted
    pub fn gain_for(&self, cue: SoundCue) -> Option<f32> {
        self.store.read(|state| {
            if !state.sounds.enabled {
                return None;
            }
            if cue == SoundCue::Notification && state.do_not_disturb.enabled {
                return None;
            }
            Some(f32::from(state.sounds.volume) / 100.0)
        })
    }

    /// Play a cue.
    ///
    /// # Returns
    /// `false` when the cue was muted by settings
    pub fn play(&self, cue: SoundCue) -> Result<bool, SoundError> {
        let Some(gain) = self.gain_for(cue) else {
            tracing::debug!("Cue {} muted", cue);
            return Ok(false);
        };

        let playback = Playback {
            cue,
            samples: self.buffer(cue),
            sample_rate: self.sample_rate,
            gain,
        };
        self.sink.play(&playback)?;
        self.metrics.record_cue_played();
        Ok(true)
    }

    /// Play a cue by name
    pub fn play_named(&self, name: &str) -> Result<bool, SoundError> {
        self.play(name.parse()?)
    }

    /// Number of cues rendered so far
    pub fn cached_cues(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn buffer(&self, cue: SoundCue) -> Arc<[f32]> {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        let samples = buffers
            .entry(cue)
            .or_insert_with(|| synthesize(&cue.profile(), self.sample_rate).into());
        Arc::clone(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStorage, SettingsPersistence};
    use crate::state::{SettingUpdate, ToggleField};

    fn store() -> SettingsStore {
        SettingsStore::new(SettingsPersistence::new(Arc::new(MemoryStorage::new())))
    }

    #[test]
    fn test_parse_cue() {
        assert_eq!("tap".parse::<SoundCue>().unwrap(), SoundCue::Tap);
        assert!(matches!(
            "chime".parse::<SoundCue>(),
            Err(SoundError::UnknownCue(name)) if name == "chime"
        ));
    }

    #[test]
    fn test_envelope_shape() {
        let profile = SoundCue::Lock.profile();
        assert_eq!(profile.envelope(0.0), 0.0);
        assert!((profile.envelope(0.005) - 0.14).abs() < 1e-9);
        assert!((profile.envelope(ATTACK_SECONDS) - 0.28).abs() < 1e-9);
        assert!(profile.envelope(0.1) < 0.28);
        assert_eq!(profile.envelope(0.22), ENVELOPE_FLOOR);
        assert_eq!(profile.envelope(0.23), ENVELOPE_FLOOR);
    }

    #[test]
    fn test_synthesize_length_and_peak() {
        let profile = SoundCue::Tap.profile();
        let samples = synthesize(&profile, 1000);

        // 0.08s tone + 0.02s tail
        assert_eq!(samples.len(), 100);
        let peak = samples.iter().fold(0.0_f32, |p, s| p.max(s.abs()));
        assert!(peak <= 0.18 + 1e-6);
        assert!(peak > 0.1);
    }

    #[test]
    fn test_waveforms_stay_in_range() {
        for waveform in [Waveform::Sine, Waveform::Square, Waveform::Triangle] {
            for i in 0..100 {
                let v = waveform.sample(i as f64 / 37.0);
                assert!((-1.0..=1.0).contains(&v), "{waveform:?} out of range: {v}");
            }
        }
        assert_eq!(Waveform::Triangle.sample(0.5), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
    }

    #[test]
    fn test_volume_scales_gain() {
        let store = store();
        store.set(SettingUpdate::Volume(40));
        let sink = Arc::new(RecordingSink::new());
        let manager = SoundManager::new(store, sink.clone(), 8000).unwrap();

        assert!(manager.play(SoundCue::Unlock).unwrap());

        let played = sink.played();
        assert_eq!(played.len(), 1);
        assert!((played[0].gain - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_muted_when_sounds_disabled() {
        let store = store();
        store.toggle(ToggleField::SoundsEnabled);

        let mut sink = MockAudioSink::new();
        sink.expect_play().never();
        let manager = SoundManager::new(store, Arc::new(sink), 8000).unwrap();

        assert!(!manager.play(SoundCue::Tap).unwrap());
        assert_eq!(manager.cached_cues(), 0);
    }

    #[test]
    fn test_notification_muted_under_do_not_disturb() {
        let store = store();
        store.toggle(ToggleField::DoNotDisturbEnabled);
        let sink = Arc::new(RecordingSink::new());
        let manager = SoundManager::new(store, sink.clone(), 8000).unwrap();

        assert!(!manager.play(SoundCue::Notification).unwrap());
        assert!(manager.play(SoundCue::Tap).unwrap());
        assert_eq!(sink.played().len(), 1);
    }

    #[test]
    fn test_buffers_cached_per_cue() {
        let sink = Arc::new(RecordingSink::new());
        let manager = SoundManager::new(store(), sink.clone(), 8000).unwrap();

        manager.play(SoundCue::Tap).unwrap();
        manager.play(SoundCue::Tap).unwrap();
        manager.play(SoundCue::Lock).unwrap();

        let played = sink.played();
        assert!(Arc::ptr_eq(&played[0].samples, &played[1].samples));
        assert_eq!(manager.cached_cues(), 2);
    }

    #[test]
    fn test_sink_error_propagates() {
        let mut sink = MockAudioSink::new();
        sink.expect_play()
            .times(1)
            .returning(|_| Err(SoundError::Output("device lost".to_string())));
        let manager = SoundManager::new(store(), Arc::new(sink), 8000).unwrap();

        assert!(matches!(manager.play(SoundCue::Lock), Err(SoundError::Output(_))));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let result = SoundManager::new(store(), Arc::new(LogSink), 0);
        assert!(matches!(result, Err(SoundError::InvalidSampleRate(0))));
    }
}
