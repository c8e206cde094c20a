/// Gain applied to the RMS of a sample block before clamping to `[0, 1]`.
pub const RMS_GAIN: f32 = 10.0;

/// Map a block of samples in `[-1, 1]` to a level: `min(1, rms * 10)`.
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples
        .iter()
        .filter(|s| s.is_finite())
        .map(|s| s * s)
        .sum();
    let rms = (sum_sq / samples.len() as f32).sqrt();
    (rms * RMS_GAIN).min(1.0)
}

/// Turns raw source levels into renderer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelConditioner {
    /// Multiplier applied to every raw level.
    pub sensitivity: f32,
    /// Scaled levels at or below this become zero.
    pub noise_gate: f32,
}

impl Default for LevelConditioner {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            noise_gate: 0.01,
        }
    }
}

impl LevelConditioner {
    /// Scale by sensitivity, gate, then cap at 1. Non-finite or negative input yields zero.
    pub fn apply(&self, raw: f32) -> f32 {
        let scaled = raw * self.sensitivity;
        if !scaled.is_finite() || scaled <= self.noise_gate.max(0.0) {
            return 0.0;
        }
        scaled.min(1.0)
    }
}

/// Mono samples per level update for captured audio.
pub const CAPTURE_BLOCK: usize = 1024;

/// Average interleaved frames down to one mono sample each. A trailing partial frame is dropped.
pub fn downmix_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    let channels = channels.max(1);
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Cuts a mono sample stream into fixed-size blocks and reports [`rms_level`] per block.
#[derive(Clone, Debug)]
pub struct BlockMeter {
    block: usize,
    pending: Vec<f32>,
}

impl BlockMeter {
    /// Meter reporting once every `block` samples (at least one).
    pub fn new(block: usize) -> Self {
        let block = block.max(1);
        Self {
            block,
            pending: Vec::with_capacity(block * 2),
        }
    }

    /// Append samples and call `emit` once for every completed block.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(f32)) {
        self.pending.extend_from_slice(samples);
        let mut start = 0;
        while self.pending.len() - start >= self.block {
            emit(rms_level(&self.pending[start..start + self.block]));
            start += self.block;
        }
        self.pending.drain(..start);
    }

    /// Samples waiting for the next block.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/level.rs"]
mod tests;
