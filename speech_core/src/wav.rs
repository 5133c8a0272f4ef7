use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};

use crate::error::Result;

/// Decoded PCM audio, interleaved when `channels > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct WavClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl WavClip {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Encode mono f32 samples in [-1.0, 1.0] as a 16-bit PCM WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Encode mono f32 samples as WAV and return Base64.
pub fn encode_wav_base64(samples: &[f32], sample_rate: u32) -> Result<String> {
    Ok(general_purpose::STANDARD.encode(encode_wav(samples, sample_rate)?))
}

/// Parse a WAV file into normalized f32 samples.
pub fn decode_wav(bytes: &[u8]) -> Result<WavClip> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };
    Ok(WavClip {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Decode a Base64 WAV payload, returning the raw file bytes and the clip.
pub fn decode_wav_base64(encoded: &str) -> Result<(Vec<u8>, WavClip)> {
    let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
    let clip = decode_wav(&bytes)?;
    Ok((bytes, clip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpeechError;

    #[test]
    fn test_encoded_header_and_length() {
        let bytes = encode_wav(&[0.0; 100], 22_050).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 200);
    }

    #[test]
    fn test_decode_reports_duration() {
        let samples = vec![0.5f32; 22_050];
        let encoded = encode_wav_base64(&samples, 22_050).unwrap();
        let (bytes, clip) = decode_wav_base64(&encoded).unwrap();

        assert!(!bytes.is_empty());
        assert_eq!(clip.sample_rate, 22_050);
        assert_eq!(clip.channels, 1);
        assert_eq!(clip.duration_ms(), 1000);
        assert!((clip.samples[0] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        let clip = decode_wav(&encode_wav(&[2.0, -2.0], 8_000).unwrap()).unwrap();
        assert!(clip.samples[0] > 0.99);
        assert!(clip.samples[1] < -0.99);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(decode_wav(b"not a wav"), Err(SpeechError::Audio(_))));
        assert!(matches!(
            decode_wav_base64("%%%"),
            Err(SpeechError::Base64(_))
        ));
    }
}
