//! Pre-computed sine samples for the PWM modulator.

/// Number of samples in [SINE_HIGH_TIME_NS].
pub const SAMPLE_COUNT: usize = 50;

/// One full period of `0.5 + 0.5·sin(θ)` expressed as PWM high times in
/// nanoseconds, sampled at [SAMPLE_COUNT] evenly spaced points for the
/// reference 1 kHz carrier (1 000 000 ns period).
pub const SINE_HIGH_TIME_NS: [u32; SAMPLE_COUNT] = [
    500_000, 562_667, 624_345, 684_062, 740_877, 793_893, 842_274, 885_257, 922_164, 952_414,
    975_528, 991_144, 999_013, 999_013, 991_144, 975_528, 952_414, 922_164, 885_257, 842_274,
    793_893, 740_877, 684_062, 624_345, 562_667, 500_000, 437_333, 375_655, 315_938, 259_123,
    206_107, 157_726, 114_743, 77_836, 47_586, 24_472, 8_856, 987, 987, 8_856, 24_472, 47_586,
    77_836, 114_743, 157_726, 206_107, 259_123, 315_938, 375_655, 437_333,
];
