//! Audio system using Web Audio API
//!
//! Procedurally generated sound effects - no external files needed! Each
//! effect is a short sequence of enveloped oscillator tones.

use crate::sim::GameEvent;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Energy orb picked up
    OrbCollect,
    /// Robot ran into a hazard
    HazardHit,
    /// Every orb collected
    LevelComplete,
    GameOver,
    /// Boost engaged
    Boost,
    /// Autopilot engaged
    Autopilot,
    /// Boost and autopilot overlapping
    Overdrive,
}

/// Oscillator waveform (mirrors `web_sys::OscillatorType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

/// One enveloped oscillator note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub freq: f32,
    /// Exponential pitch glide target, if any
    pub glide_to: Option<f32>,
    pub wave: Wave,
    /// Peak gain before volume scaling
    pub gain: f32,
    /// Start offset (seconds)
    pub delay: f64,
    /// Decay length (seconds)
    pub decay: f64,
}

const fn tone(freq: f32, wave: Wave, gain: f32, delay: f64, decay: f64) -> Tone {
    Tone {
        freq,
        glide_to: None,
        wave,
        gain,
        delay,
        decay,
    }
}

const fn glide(freq: f32, to: f32, wave: Wave, gain: f32, decay: f64) -> Tone {
    Tone {
        freq,
        glide_to: Some(to),
        wave,
        gain,
        delay: 0.0,
        decay,
    }
}

const ORB_COLLECT: &[Tone] = &[
    tone(880.0, Wave::Sine, 0.25, 0.0, 0.08),
    tone(1320.0, Wave::Sine, 0.2, 0.05, 0.1),
];
const HAZARD_HIT: &[Tone] = &[
    glide(220.0, 55.0, Wave::Sawtooth, 0.35, 0.25),
    tone(110.0, Wave::Square, 0.15, 0.02, 0.2),
];
const LEVEL_COMPLETE: &[Tone] = &[
    tone(523.0, Wave::Triangle, 0.3, 0.0, 0.3),
    tone(659.0, Wave::Triangle, 0.3, 0.12, 0.3),
    tone(784.0, Wave::Triangle, 0.3, 0.24, 0.3),
    tone(1047.0, Wave::Triangle, 0.3, 0.36, 0.5),
];
const GAME_OVER: &[Tone] = &[
    tone(392.0, Wave::Sine, 0.3, 0.0, 0.3),
    tone(330.0, Wave::Sine, 0.3, 0.2, 0.3),
    tone(262.0, Wave::Sine, 0.3, 0.4, 0.3),
    glide(196.0, 98.0, Wave::Sine, 0.3, 0.6),
];
const BOOST: &[Tone] = &[glide(200.0, 800.0, Wave::Triangle, 0.3, 0.25)];
const AUTOPILOT: &[Tone] = &[
    tone(660.0, Wave::Square, 0.12, 0.0, 0.08),
    tone(990.0, Wave::Square, 0.12, 0.1, 0.08),
];
const OVERDRIVE: &[Tone] = &[
    glide(300.0, 1200.0, Wave::Sawtooth, 0.2, 0.35),
    glide(450.0, 1800.0, Wave::Triangle, 0.15, 0.35),
];

impl SoundEffect {
    /// The tones making up this effect
    pub fn tones(&self) -> &'static [Tone] {
        match self {
            SoundEffect::OrbCollect => ORB_COLLECT,
            SoundEffect::HazardHit => HAZARD_HIT,
            SoundEffect::LevelComplete => LEVEL_COMPLETE,
            SoundEffect::GameOver => GAME_OVER,
            SoundEffect::Boost => BOOST,
            SoundEffect::Autopilot => AUTOPILOT,
            SoundEffect::Overdrive => OVERDRIVE,
        }
    }

    /// Effect to play for a level event, if any
    pub fn for_event(event: &GameEvent) -> Option<SoundEffect> {
        match event {
            GameEvent::OrbCollected { .. } => Some(SoundEffect::OrbCollect),
            GameEvent::HazardHit { .. } => Some(SoundEffect::HazardHit),
            GameEvent::LevelComplete { .. } => Some(SoundEffect::LevelComplete),
            GameEvent::GameOver { .. } => Some(SoundEffect::GameOver),
            GameEvent::BoostChanged(true) => Some(SoundEffect::Boost),
            GameEvent::AutopilotChanged(true) => Some(SoundEffect::Autopilot),
            GameEvent::OverdriveChanged(true) => Some(SoundEffect::Overdrive),
            _ => None,
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, AudioContextState, OscillatorType};

    use super::{SoundEffect, Tone, Wave};
    use crate::settings::Settings;

    impl From<Wave> for OscillatorType {
        fn from(wave: Wave) -> Self {
            match wave {
                Wave::Sine => OscillatorType::Sine,
                Wave::Triangle => OscillatorType::Triangle,
                Wave::Square => OscillatorType::Square,
                Wave::Sawtooth => OscillatorType::Sawtooth,
            }
        }
    }

    /// Audio manager for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        volume: f32,
        /// Muted by the window losing focus (separate from the user's mute)
        blurred: bool,
    }

    impl AudioManager {
        pub fn new(settings: &Settings) -> Self {
            // May fail outside a secure context
            let ctx = match AudioContext::new() {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    log::warn!("Failed to create AudioContext - audio disabled: {e:?}");
                    None
                }
            };
            Self {
                ctx,
                volume: settings.effective_volume(),
                blurred: false,
            }
        }

        /// Pick up volume and mute changes
        pub fn apply_settings(&mut self, settings: &Settings) {
            self.volume = settings.effective_volume();
        }

        /// Silence effects while the window is unfocused
        pub fn set_blurred(&mut self, blurred: bool) {
            self.blurred = blurred;
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx
                && let Err(e) = ctx.resume()
            {
                log::warn!("Failed to resume audio: {e:?}");
            }
        }

        /// Suspend the context while the page is hidden
        pub fn suspend(&self) {
            if let Some(ctx) = &self.ctx
                && let Err(e) = ctx.suspend()
            {
                log::warn!("Failed to suspend audio: {e:?}");
            }
        }

        /// Release the audio context
        pub fn close(&mut self) {
            if let Some(ctx) = self.ctx.take()
                && let Err(e) = ctx.close()
            {
                log::warn!("Failed to close audio context: {e:?}");
            }
        }

        /// Play a sound effect
        pub fn play(&self, effect: SoundEffect) {
            if self.blurred || self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Browsers start contexts suspended until a user gesture
            if ctx.state() == AudioContextState::Suspended {
                self.resume();
            }

            for tone in effect.tones() {
                if play_tone(ctx, tone, self.volume).is_none() {
                    log::debug!("Dropped tone for {effect:?}");
                }
            }
        }
    }

    /// Schedule one oscillator with an exponential decay envelope
    fn play_tone(ctx: &AudioContext, tone: &Tone, volume: f32) -> Option<()> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;
        osc.set_type(tone.wave.into());
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        let t = ctx.current_time() + tone.delay;
        let end = t + tone.decay;
        osc.frequency().set_value_at_time(tone.freq, t).ok()?;
        if let Some(to) = tone.glide_to {
            osc.frequency()
                .exponential_ramp_to_value_at_time(to, end)
                .ok()?;
        }
        gain.gain().set_value_at_time(tone.gain * volume, t).ok()?;
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, end)
            .ok()?;

        osc.start_with_when(t).ok()?;
        osc.stop_with_when(end + 0.05).ok()
    }
}
