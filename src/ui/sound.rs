/// Sound engine: procedural chiptune cues via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::feedback::SoundCue;

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use log::debug;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::sim::feedback::SoundCue;

    pub(super) const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_start: Arc<Vec<u8>>,
        sfx_goal: Arc<Vec<u8>>,
        sfx_complete: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    debug!("no audio output: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_start: Arc::new(make_wav(&gen_start())),
                sfx_goal: Arc::new(make_wav(&gen_goal())),
                sfx_complete: Arc::new(make_wav(&gen_complete())),
            })
        }

        pub fn play(&self, cue: SoundCue) {
            let buf = match cue {
                SoundCue::Start => &self.sfx_start,
                SoundCue::Goal => &self.sfx_goal,
                SoundCue::LevelComplete => &self.sfx_complete,
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Play a list of (frequency, seconds) notes with a soft square tone.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                // Sine + 3rd harmonic for a retro feel
                let wave = (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.7
                    + (t * freq * 3.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Game start: rising two-note call G4→D5
    pub(super) fn gen_start() -> Vec<f32> {
        notes(&[(392.0, 0.08), (587.0, 0.14)], 0.25)
    }

    /// Crate on goal: short bright chime C6→G6
    pub(super) fn gen_goal() -> Vec<f32> {
        notes(&[(1047.0, 0.05), (1568.0, 0.09)], 0.25)
    }

    /// Level complete: ascending fanfare C5→E5→G5→C6 with a held last note
    pub(super) fn gen_complete() -> Vec<f32> {
        let mut samples = notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1)], 0.3);
        let last_freq = 1047.0_f32;
        let n = (SAMPLE_RATE as f32 * 0.3) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            let wave = (t * last_freq * 2.0 * std::f32::consts::PI).sin() * 0.6
                + (t * last_freq * 2.0 * 2.0 * std::f32::consts::PI).sin() * 0.3
                + (t * last_freq * 3.0 * 2.0 * std::f32::consts::PI).sin() * 0.1;
            samples.push(wave * env * 0.3);
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    /// 16-bit mono PCM at `SAMPLE_RATE`, as rodio's WAV decoder expects.
    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        const HEADER_LEN: usize = 44;
        const BYTES_PER_SAMPLE: u32 = 2;

        let data_len = samples.len() as u32 * BYTES_PER_SAMPLE;
        let mut buf = Vec::with_capacity(HEADER_LEN + data_len as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(HEADER_LEN as u32 - 8 + data_len).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt: PCM, 1 channel, rate, byte rate, block align, bits
        buf.extend_from_slice(b"fmt ");
        for field in [16u32, 1 | (1 << 16), SAMPLE_RATE, SAMPLE_RATE * BYTES_PER_SAMPLE] {
            buf.extend_from_slice(&field.to_le_bytes());
        }
        buf.extend_from_slice(&(BYTES_PER_SAMPLE as u16).to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());
        buf.extend(
            samples
                .iter()
                .flat_map(|s| ((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes()),
        );

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: SoundCue) {}
}

/// Play a cue if an engine is available.
pub fn play_cue(engine: Option<&SoundEngine>, cue: SoundCue) {
    if let Some(sfx) = engine {
        sfx.play(cue);
    }
}
