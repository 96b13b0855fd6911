//! Audio file decoding to a mono analysis buffer

use crate::error::AnalysisError;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Sample rate every extractor works at
pub const ANALYSIS_SAMPLE_RATE: u32 = 44100;

/// Decodes a file into mono f32 samples at [`ANALYSIS_SAMPLE_RATE`]
pub struct MonoLoader {
    target_sample_rate: u32,
}

impl Default for MonoLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoLoader {
    pub fn new() -> Self {
        Self {
            target_sample_rate: ANALYSIS_SAMPLE_RATE,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Track length from the container header, when it declares one
    pub fn duration(&self, path: &Path) -> Result<Option<f32>, AnalysisError> {
        let format = Self::open(path)?;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(AnalysisError::NoAudioTrack)?;
        let params = &track.codec_params;
        Ok(match (params.n_frames, params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => Some(frames as f32 / rate as f32),
            _ => None,
        })
    }

    fn open(path: &Path) -> Result<Box<dyn FormatReader>, AnalysisError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AnalysisError::Decode(e.to_string()))?;
        Ok(probed.format)
    }

    /// Decode the whole file, downmix and resample
    pub fn load(&self, path: &Path) -> Result<Vec<f32>, AnalysisError> {
        let mut format = Self::open(path)?;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(AnalysisError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let source_rate = codec_params.sample_rate.unwrap_or(ANALYSIS_SAMPLE_RATE);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AnalysisError::Decode(e.to_string()))?;

        let mut mono: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(symphonia::core::errors::Error::ResetRequired) => break,
                Err(e) => return Err(AnalysisError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            // Corrupt packets are skipped rather than failing the whole file
            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                    tracing::trace!("skipping undecodable packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(AnalysisError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            mono.extend(
                sample_buf
                    .samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }

        if mono.is_empty() {
            return Err(AnalysisError::NoAudioTrack);
        }

        if source_rate != self.target_sample_rate {
            self.resample(&mono, source_rate)
        } else {
            Ok(mono)
        }
    }

    fn resample(&self, samples: &[f32], source_rate: u32) -> Result<Vec<f32>, AnalysisError> {
        use rubato::{FftFixedInOut, Resampler};

        let mut resampler = FftFixedInOut::<f32>::new(
            source_rate as usize,
            self.target_sample_rate as usize,
            1024,
            1,
        )
        .map_err(|e| AnalysisError::Decode(e.to_string()))?;

        let chunk_size = resampler.input_frames_next();
        let expected = (samples.len() as u64 * self.target_sample_rate as u64
            / source_rate as u64) as usize;
        let mut output = Vec::with_capacity(expected + chunk_size);

        for chunk in samples.chunks(chunk_size) {
            let resampled = if chunk.len() == chunk_size {
                resampler.process(&[chunk], None)
            } else {
                let mut padded = chunk.to_vec();
                padded.resize(chunk_size, 0.0);
                resampler.process(&[padded.as_slice()], None)
            }
            .map_err(|e| AnalysisError::Decode(e.to_string()))?;

            if let Some(channel) = resampled.into_iter().next() {
                output.extend(channel);
            }
        }

        output.truncate(expected);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = MonoLoader::new();
        let err = loader
            .load(Path::new("/nonexistent/beatlens/track.flac"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }

    #[test]
    fn test_resample_length() {
        let loader = MonoLoader::new();
        let samples = vec![0.25f32; 48000];
        let out = loader.resample(&samples, 48000).unwrap();
        assert_eq!(out.len(), 44100);
    }

    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_wav_duration_and_load() {
        let path = std::env::temp_dir().join(format!("beatlens-loader-{}.wav", std::process::id()));
        let samples: Vec<i16> = (0..8000)
            .map(|i| ((i as f32 * 0.1).sin() * 8000.0) as i16)
            .collect();
        write_wav(&path, 8000, &samples);

        let loader = MonoLoader::new();
        let duration = loader.duration(&path).unwrap().unwrap();
        assert!((duration - 1.0).abs() < 1e-3);

        let mono = loader.load(&path).unwrap();
        assert!((mono.len() as i64 - 44100).abs() < 441);

        let _ = std::fs::remove_file(&path);
    }
}
