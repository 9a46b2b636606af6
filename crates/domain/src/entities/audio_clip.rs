//! Mono 16-bit PCM clip with the loudness math used during assembly

use crate::errors::DomainError;

const FULL_SCALE: f64 = 32768.0;

/// Decoded mono PCM audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    /// Silence of the given length
    pub fn silent(sample_rate: u32, duration_ms: u64) -> Self {
        let len = usize::try_from(u64::from(sample_rate) * duration_ms / 1000).unwrap_or(0);
        Self::new(vec![0; len], sample_rate)
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Append another clip; empty clips are accepted at any rate
    pub fn append(&mut self, other: &Self) -> Result<(), DomainError> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            self.sample_rate = other.sample_rate;
        } else if self.sample_rate != other.sample_rate {
            return Err(DomainError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: other.sample_rate,
            });
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Join clips in order
    pub fn concat<'a>(
        sample_rate: u32,
        clips: impl IntoIterator<Item = &'a Self>,
    ) -> Result<Self, DomainError> {
        let mut out = Self::empty(sample_rate);
        for clip in clips {
            out.append(clip)?;
        }
        Ok(out)
    }

    fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .samples
            .iter()
            .map(|s| {
                let v = f64::from(*s);
                v * v
            })
            .sum();
        (sum / self.samples.len() as f64).sqrt()
    }

    /// RMS loudness relative to full scale; negative infinity for silence
    pub fn dbfs(&self) -> f64 {
        let rms = self.rms();
        if rms == 0.0 {
            f64::NEG_INFINITY
        } else {
            20.0 * (rms / FULL_SCALE).log10()
        }
    }

    /// Scale every sample by `gain_db`, clipping at the i16 range
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply_gain(&self, gain_db: f64) -> Self {
        let factor = 10f64.powf(gain_db / 20.0);
        let samples = self
            .samples
            .iter()
            .map(|s| {
                (f64::from(*s) * factor)
                    .round()
                    .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
            })
            .collect();
        Self::new(samples, self.sample_rate)
    }

    /// Peak-normalize so the loudest sample sits `headroom_db` below full scale
    pub fn normalize(&self, headroom_db: f64) -> Self {
        let peak = self
            .samples
            .iter()
            .map(|s| i32::from(*s).abs())
            .max()
            .unwrap_or(0);
        if peak == 0 {
            return self.clone();
        }
        let target = f64::from(i16::MAX) * 10f64.powf(-headroom_db / 20.0);
        let gain_db = 20.0 * (target / f64::from(peak)).log10();
        self.apply_gain(gain_db)
    }

    /// Gain-adjust so the RMS level equals `target_dbfs`; silence is unchanged
    pub fn match_loudness(&self, target_dbfs: f64) -> Self {
        let current = self.dbfs();
        if current.is_infinite() {
            return self.clone();
        }
        self.apply_gain(target_dbfs - current)
    }

    /// Linear fade to silence over the last `duration_ms`
    #[allow(clippy::cast_possible_truncation)]
    pub fn fade_out(&self, duration_ms: u64) -> Self {
        let fade_len = usize::try_from(u64::from(self.sample_rate) * duration_ms / 1000)
            .unwrap_or(usize::MAX)
            .min(self.samples.len());
        if fade_len == 0 {
            return self.clone();
        }
        let start = self.samples.len() - fade_len;
        let mut samples = self.samples.clone();
        for (i, sample) in samples[start..].iter_mut().enumerate() {
            let remaining = (fade_len - i - 1) as f64 / fade_len as f64;
            *sample = (f64::from(*sample) * remaining).round() as i16;
        }
        Self::new(samples, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: i16, len: usize) -> AudioClip {
        let samples = (0..len)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect();
        AudioClip::new(samples, 1000)
    }

    #[test]
    fn duration_from_sample_count() {
        assert_eq!(AudioClip::silent(32000, 1500).duration_ms(), 1500);
        assert_eq!(tone(100, 250).duration_ms(), 250);
    }

    #[test]
    fn append_checks_sample_rate() {
        let mut a = AudioClip::new(vec![1, 2], 1000);
        let b = AudioClip::new(vec![3], 2000);
        assert!(matches!(
            a.append(&b),
            Err(DomainError::SampleRateMismatch { .. })
        ));
        a.append(&AudioClip::empty(44100)).unwrap();
        assert_eq!(a.samples(), &[1, 2]);
    }

    #[test]
    fn append_to_empty_adopts_rate() {
        let mut a = AudioClip::empty(1000);
        a.append(&AudioClip::new(vec![5], 8000)).unwrap();
        assert_eq!(a.sample_rate(), 8000);
    }

    #[test]
    fn concat_preserves_order() {
        let a = AudioClip::new(vec![1], 1000);
        let b = AudioClip::new(vec![2, 3], 1000);
        let joined = AudioClip::concat(1000, [&a, &b]).unwrap();
        assert_eq!(joined.samples(), &[1, 2, 3]);
    }

    #[test]
    fn silence_has_negative_infinite_dbfs() {
        assert!(AudioClip::silent(1000, 10).dbfs().is_infinite());
    }

    #[test]
    fn match_loudness_hits_target() {
        let clip = tone(1000, 1000).match_loudness(-18.0);
        assert!((clip.dbfs() - -18.0).abs() < 0.05);
    }

    #[test]
    fn apply_gain_clips() {
        let loud = tone(30000, 4).apply_gain(12.0);
        assert_eq!(loud.samples()[0], i16::MAX);
        assert_eq!(loud.samples()[1], i16::MIN);
    }

    #[test]
    fn normalize_raises_peak() {
        let clip = tone(1000, 10).normalize(0.1);
        let peak = clip.samples().iter().map(|s| i32::from(*s).abs()).max().unwrap();
        assert!(peak > 32000);
    }

    #[test]
    fn fade_out_ends_silent_and_keeps_head() {
        let clip = tone(1000, 2000).fade_out(1000);
        assert_eq!(clip.duration_ms(), 2000);
        assert_eq!(clip.samples()[0], 1000);
        assert_eq!(*clip.samples().last().unwrap(), 0);
    }

    #[test]
    fn fade_longer_than_clip_covers_whole_clip() {
        let clip = tone(1000, 10).fade_out(60_000);
        assert_eq!(*clip.samples().last().unwrap(), 0);
        assert!(clip.samples()[0].abs() < 1000);
    }
}
