use std::io::Cursor;

/// Media type of the cleaned audio returned by the transform service.
pub const OUTPUT_MEDIA_TYPE: &str = "audio/wav";

/// Basic facts about a WAV payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
}

impl AudioInfo {
    /// Read the WAV header of `data`. Returns `None` when the payload is not a
    /// readable WAV file.
    pub fn probe(data: &[u8]) -> Option<Self> {
        match hound::WavReader::new(Cursor::new(data)) {
            Ok(reader) => {
                let spec = reader.spec();
                // `duration` is in frames, i.e. samples per channel
                let frames = reader.duration();
                Some(Self {
                    sample_rate: spec.sample_rate,
                    channels: spec.channels,
                    duration_secs: frames as f64 / spec.sample_rate.max(1) as f64,
                })
            }
            Err(e) => {
                log::warn!("Processed audio is not a readable WAV: {e}");
                None
            }
        }
    }
}

/// Mono 16-bit PCM WAV of `frames` frames of a low sawtooth.
#[cfg(test)]
pub(crate) fn pcm_wav(sample_rate: u32, frames: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for n in 0..frames {
        writer.write_sample((n % 256) as i16 * 64).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}
