//! Procedural 8-bit style sound effects.
//!
//! Everything here is a pure function of its arguments and produces mono
//! signed 16-bit samples at [`SAMPLE_RATE`].

use std::f32::consts::TAU;

use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SAMPLE_RATE: u32 = 44_100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Noise,
}

/// Linear fade in over `attack` samples and fade out over the last `release` samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub attack: usize,
    pub release: usize,
}

impl Envelope {
    pub const fn fade_out(release: usize) -> Self {
        Self { attack: 0, release }
    }

    pub const fn fade(attack: usize, release: usize) -> Self {
        Self { attack, release }
    }

    fn gain(&self, i: usize, n: usize) -> f32 {
        if i < self.attack {
            i as f32 / self.attack as f32
        } else if self.release > 0 && i + self.release > n {
            (n - i) as f32 / self.release as f32
        } else {
            1.0
        }
    }
}

fn sample_count(duration: f32) -> Result<usize> {
    ensure!(
        duration.is_finite() && duration >= 0.0,
        "invalid duration {duration}"
    );
    Ok((SAMPLE_RATE as f32 * duration) as usize)
}

fn check_volume(volume: f32) -> Result<()> {
    ensure!((0.0..=1.0).contains(&volume), "volume {volume} out of range");
    Ok(())
}

fn check_freq(freq: f32) -> Result<()> {
    ensure!(freq.is_finite() && freq > 0.0, "invalid frequency {freq}");
    Ok(())
}

fn clamp_sample(v: f32) -> i16 {
    v.clamp(-32767.0, 32767.0) as i16
}

/// A single voice of `wave` at `freq` Hz.
pub fn tone(freq: f32, duration: f32, volume: f32, wave: Waveform, env: Envelope) -> Result<Vec<i16>> {
    check_freq(freq)?;
    check_volume(volume)?;
    let n = sample_count(duration)?;
    let amplitude = 32767.0 * volume;
    let period = SAMPLE_RATE as f32 / freq;
    // Noise is seeded from the pitch so the same call gives the same clip
    let mut rng = StdRng::seed_from_u64(freq.to_bits() as u64);

    Ok((0..n)
        .map(|i| {
            let phase = (i as f32 % period) / period;
            let v = match wave {
                Waveform::Sine => amplitude * (TAU * freq * i as f32 / SAMPLE_RATE as f32).sin(),
                Waveform::Square => {
                    if phase < 0.5 {
                        amplitude
                    } else {
                        -amplitude
                    }
                }
                Waveform::Saw => amplitude * 2.0 * phase - amplitude,
                Waveform::Noise => rng.gen_range(-amplitude..=amplitude),
            };
            clamp_sample(v * env.gain(i, n))
        })
        .collect())
}

/// Sine voices mixed at equal level, sharing `volume` between them.
pub fn chord(freqs: &[f32], duration: f32, volume: f32, env: Envelope) -> Result<Vec<i16>> {
    ensure!(!freqs.is_empty(), "chord needs at least one note");
    for &f in freqs {
        check_freq(f)?;
    }
    check_volume(volume)?;
    let n = sample_count(duration)?;
    let amplitude = 32767.0 * volume / freqs.len() as f32;

    Ok((0..n)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let v: f32 = freqs.iter().map(|f| amplitude * (TAU * f * t).sin()).sum();
            clamp_sample(v * env.gain(i, n))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_length_follows_duration() {
        let clip = tone(400.0, 0.05, 0.2, Waveform::Square, Envelope::fade_out(500)).unwrap();
        assert_eq!(clip.len(), 2205);
        let clip = chord(&[523.0, 659.0, 784.0], 0.4, 0.3, Envelope::fade_out(1000)).unwrap();
        assert_eq!(clip.len(), 17640);
    }

    #[test]
    fn samples_stay_within_amplitude() {
        let amp = (32767.0 * 0.3) as i16 + 1;
        for wave in [Waveform::Sine, Waveform::Square, Waveform::Saw, Waveform::Noise] {
            let clip = tone(150.0, 0.1, 0.3, wave, Envelope::fade_out(500)).unwrap();
            assert!(clip.iter().all(|s| s.abs() <= amp), "{wave:?} exceeded amplitude");
        }
    }

    #[test]
    fn square_starts_high_then_flips() {
        let clip = tone(441.0, 0.01, 0.5, Waveform::Square, Envelope::fade_out(0)).unwrap();
        // 100 samples per period
        assert!(clip[10] > 0);
        assert!(clip[60] < 0);
    }

    #[test]
    fn envelope_ramps_to_silence() {
        let clip = tone(220.0, 0.08, 0.4, Waveform::Square, Envelope::fade(500, 500)).unwrap();
        assert_eq!(clip[0], 0);
        assert!(clip.last().unwrap().abs() < 100);
        let mid = clip[clip.len() / 2].abs();
        assert!(mid > 10_000);
    }

    #[test]
    fn chord_fades_in_and_out() {
        let env = Envelope::fade((SAMPLE_RATE / 2) as usize, SAMPLE_RATE as usize);
        let clip = chord(&[261.63, 329.63, 392.0, 493.88], 3.0, 0.4, env).unwrap();
        assert_eq!(clip[0], 0);
        assert!(clip[..50].iter().all(|s| s.abs() < 200));
        assert!(clip[clip.len() - 50..].iter().all(|s| s.abs() < 200));
    }

    #[test]
    fn noise_is_deterministic() {
        let a = tone(100.0, 0.05, 0.3, Waveform::Noise, Envelope::fade_out(500)).unwrap();
        let b = tone(100.0, 0.05, 0.3, Waveform::Noise, Envelope::fade_out(500)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(tone(0.0, 0.1, 0.3, Waveform::Sine, Envelope::fade_out(0)).is_err());
        assert!(tone(440.0, -1.0, 0.3, Waveform::Sine, Envelope::fade_out(0)).is_err());
        assert!(tone(440.0, 0.1, 1.5, Waveform::Sine, Envelope::fade_out(0)).is_err());
        assert!(chord(&[], 0.1, 0.3, Envelope::fade_out(0)).is_err());
        assert!(chord(&[440.0, f32::NAN], 0.1, 0.3, Envelope::fade_out(0)).is_err());
    }
}
