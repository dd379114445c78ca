//! Pulse frame construction.
//!
//! A job becomes a program of identical 100 ms frames. Each frame carries a
//! four-slot frequency vector and a four-slot amplitude vector; only one
//! amplitude slot is non-zero so every frame is a single spike.

use crate::config::PulseLimits;
use serde::{Deserialize, Serialize};

/// Amplitude slot that carries the spike.
pub const SPIKE_SLOT: usize = 1;

/// One 100 ms instruction unit for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseFrame {
    pub frequency: [u32; 4],
    pub amplitude: [u32; 4],
}

impl PulseFrame {
    fn spike(amplitude: u32, frequency: u32) -> Self {
        let mut amp = [0; 4];
        amp[SPIKE_SLOT] = amplitude;
        Self {
            frequency: [frequency; 4],
            amplitude: amp,
        }
    }

    /// The non-zero amplitude of this frame, if any.
    pub fn peak(&self) -> u32 {
        self.amplitude.iter().copied().max().unwrap_or(0)
    }
}

/// Build the frame program for one pulse. Out-of-range inputs are clamped,
/// never rejected.
pub fn build(amplitude: u32, frequency: u32, copies: u32, limits: &PulseLimits) -> Vec<PulseFrame> {
    let frame = PulseFrame::spike(limits.clamp_amp(amplitude), limits.clamp_freq(frequency));
    vec![frame; limits.clamp_copies(copies) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> PulseLimits {
        PulseLimits::default()
    }

    #[test]
    fn builds_one_frame_per_copy() {
        let frames = build(30, 20, 5, &limits());
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| *f == frames[0]));
        assert_eq!(frames[0].frequency, [20, 20, 20, 20]);
        assert_eq!(frames[0].amplitude, [0, 30, 0, 0]);
    }

    #[test]
    fn exactly_one_amplitude_slot_is_set() {
        for amp in [1, 50, 100] {
            let frame = build(amp, 10, 1, &limits())[0];
            let nonzero: Vec<_> = frame.amplitude.iter().filter(|a| **a != 0).collect();
            assert_eq!(nonzero, vec![&amp]);
        }
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let frames = build(250, 900, 1000, &limits());
        assert_eq!(frames.len(), 100);
        assert_eq!(frames[0].peak(), 100);
        assert_eq!(frames[0].frequency, [200; 4]);

        let frames = build(10, 10, 0, &limits());
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn narrower_limits_are_honoured() {
        let narrow = PulseLimits {
            freq_max: 80,
            copies_min: 2,
            copies_max: 10,
        };
        let frames = build(40, 150, 50, &narrow);
        assert_eq!(frames.len(), 10);
        assert_eq!(frames[0].frequency, [80; 4]);
        assert_eq!(build(40, 10, 1, &narrow).len(), 2);
    }

    #[test]
    fn zero_amplitude_frames_carry_no_spike() {
        let frames = build(0, 20, 3, &limits());
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].peak(), 0);
    }
}
