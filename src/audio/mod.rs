pub mod synth;

use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use anyhow::Result;

/// Something that can start playing a mono clip and return immediately.
pub trait Playback {
    fn play(&self, samples: &[i16]) -> Result<()>;
}

/// Shared handle to the audio device. Empty when no device could be opened
/// or sound is disabled; every bank built from it is then silent.
#[derive(Clone, Default)]
pub struct AudioOut(Option<Rc<dyn Playback>>);

impl AudioOut {
    pub fn muted() -> Self {
        Self(None)
    }

    pub fn from_playback(playback: Rc<dyn Playback>) -> Self {
        Self(Some(playback))
    }

    /// Opens the default output device, falling back to silence.
    pub fn open() -> Self {
        match speaker::Speaker::open() {
            Ok(speaker) => {
                log::info!("audio output opened");
                Self::from_playback(Rc::new(speaker))
            }
            Err(err) => {
                log::warn!("audio unavailable, continuing without sound: {err:#}");
                Self::muted()
            }
        }
    }

    pub fn is_muted(&self) -> bool {
        self.0.is_none()
    }
}

#[cfg(feature = "audio")]
mod speaker {
    use anyhow::{Context, Result};
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Source};

    use super::synth::SAMPLE_RATE;
    use super::Playback;

    pub struct Speaker {
        // Dropping the stream stops all output
        _stream: OutputStream,
        handle: OutputStreamHandle,
    }

    impl Speaker {
        pub fn open() -> Result<Self> {
            let (stream, handle) =
                OutputStream::try_default().context("opening default output device")?;
            Ok(Self {
                _stream: stream,
                handle,
            })
        }
    }

    impl Playback for Speaker {
        fn play(&self, samples: &[i16]) -> Result<()> {
            let source = SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec());
            self.handle.play_raw(source.convert_samples())?;
            Ok(())
        }
    }
}

#[cfg(not(feature = "audio"))]
mod speaker {
    use anyhow::{bail, Result};

    use super::Playback;

    pub enum Speaker {}

    impl Speaker {
        pub fn open() -> Result<Self> {
            bail!("built without the `audio` feature")
        }
    }

    impl Playback for Speaker {
        fn play(&self, _samples: &[i16]) -> Result<()> {
            match *self {}
        }
    }
}

/// Pre-synthesised clips for one game, keyed by the game's own sound enum.
pub struct SoundBank<K> {
    out: AudioOut,
    clips: HashMap<K, Vec<i16>>,
}

impl<K: Copy + Eq + Hash + std::fmt::Debug> SoundBank<K> {
    /// Synthesises every clip up front, unless the output is muted. A clip
    /// that fails to synthesise is logged and left out; playing it later
    /// does nothing.
    pub fn new<F>(out: &AudioOut, clips: F) -> Self
    where
        F: FnOnce() -> Vec<(K, Result<Vec<i16>>)>,
    {
        if out.is_muted() {
            return Self {
                out: AudioOut::muted(),
                clips: HashMap::new(),
            };
        }
        let clips = clips()
            .into_iter()
            .filter_map(|(key, clip)| match clip {
                Ok(samples) => Some((key, samples)),
                Err(err) => {
                    log::warn!("could not synthesise {key:?}: {err:#}");
                    None
                }
            })
            .collect();
        Self {
            out: out.clone(),
            clips,
        }
    }

    pub fn play(&self, key: K) {
        let (Some(out), Some(samples)) = (&self.out.0, self.clips.get(&key)) else {
            return;
        };
        if let Err(err) = out.play(samples) {
            log::debug!("playing {key:?} failed: {err:#}");
        }
    }
}


#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::testing::Recorder;
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Sfx {
        Beep,
        Broken,
    }

    #[test]
    fn plays_through_the_device() {
        let recorder = Rc::new(Recorder::default());
        let out = AudioOut::from_playback(recorder.clone());
        let bank = SoundBank::new(&out, || vec![(Sfx::Beep, Ok(vec![0; 64]))]);
        bank.play(Sfx::Beep);
        bank.play(Sfx::Beep);
        assert_eq!(*recorder.played.borrow(), vec![64, 64]);
    }

    #[test]
    fn failed_clip_becomes_a_no_op() {
        let recorder = Rc::new(Recorder::default());
        let out = AudioOut::from_playback(recorder.clone());
        let bank = SoundBank::new(&out, || {
            vec![(Sfx::Beep, Ok(vec![1; 8])), (Sfx::Broken, Err(anyhow!("no")))]
        });
        bank.play(Sfx::Broken);
        bank.play(Sfx::Beep);
        assert_eq!(*recorder.played.borrow(), vec![8]);
    }

    #[test]
    fn muted_output_is_silent() {
        let bank: SoundBank<Sfx> =
            SoundBank::new(&AudioOut::muted(), || panic!("muted banks skip synthesis"));
        bank.play(Sfx::Beep);
        assert!(bank.clips.is_empty());
    }
}
