use std::f32::consts::PI;

/// Beat tone of a point target: a cosine whose phase advances by
/// `range_bin` cycles across a ramp and `doppler_bin` cycles across a frame.
pub fn beat_tone(
    sample: usize,
    ramp: usize,
    samples: usize,
    ramps: usize,
    range_bin: f32,
    doppler_bin: f32,
) -> f32 {
    let fast = range_bin * sample as f32 / samples.max(1) as f32;
    let slow = doppler_bin * ramp as f32 / ramps.max(1) as f32;
    (2.0 * PI * (fast + slow)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_starts_at_unit_amplitude() {
        assert!((beat_tone(0, 0, 64, 16, 5.0, 2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tone_completes_integer_cycles_per_ramp() {
        let first = beat_tone(0, 3, 64, 16, 4.0, 1.0);
        let wrapped = beat_tone(64, 3, 64, 16, 4.0, 1.0);
        assert!((first - wrapped).abs() < 1e-4);
    }
}
