use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;

const C5: f32 = 523.25;
const E5: f32 = 659.25;
const G5: f32 = 783.99;

const TONE_SECS: f32 = 0.5;
const ATTACK_SECS: f32 = 0.05;
const PEAK_GAIN: f32 = 0.3;
const FLOOR_GAIN: f32 = 0.01;
/// The second chord starts this long after the first.
const SECOND_CHORD_OFFSET_SECS: f32 = 0.2;

/// Two-chord notification chime: C5+E5, then E5+G5 200 ms later.
pub struct Chime {
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
    volume: f32,
}

impl Chime {
    pub fn new(volume: f32) -> Self {
        let total_secs = SECOND_CHORD_OFFSET_SECS + TONE_SECS;
        Self {
            sample_rate: SAMPLE_RATE,
            num_sample: 0,
            total_samples: (total_secs * SAMPLE_RATE as f32).round() as usize,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn sample_at(&self, t: f32) -> f32 {
        let first = chord(t, C5, E5);
        let second = chord(t - SECOND_CHORD_OFFSET_SECS, E5, G5);
        (first + second) * self.volume
    }
}

/// 50 ms linear attack to the peak, then exponential decay to the floor at 0.5 s.
fn envelope(t: f32) -> f32 {
    if !(0.0..TONE_SECS).contains(&t) {
        0.0
    } else if t < ATTACK_SECS {
        PEAK_GAIN * t / ATTACK_SECS
    } else {
        let progress = (t - ATTACK_SECS) / (TONE_SECS - ATTACK_SECS);
        PEAK_GAIN * (FLOOR_GAIN / PEAK_GAIN).powf(progress)
    }
}

fn chord(t: f32, low: f32, high: f32) -> f32 {
    let gain = envelope(t);
    if gain == 0.0 {
        return 0.0;
    }
    // Halved so each chord peaks at the envelope gain.
    gain * 0.5 * ((2.0 * PI * low * t).sin() + (2.0 * PI * high * t).sin())
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / self.sample_rate as f32;
        self.num_sample += 1;
        Some(self.sample_at(t))
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / self.sample_rate as f32,
        ))
    }
}
