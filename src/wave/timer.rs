//! # Square-wave timer parameters
//!
//! ## Overview
//! Resolves a requested (frequency, duty cycle, prescaler) triple into the
//! interval and match counts a timer channel needs to output that waveform.
//! [resolve] is a pure function over immutable inputs; it performs no
//! register access and may be called from any context.
//!
//! The count registers are 16 bits wide, and intervals shorter than a few
//! ticks degenerate into unusable waveforms, so both resolved counts must
//! lie in `[4, 65535]`. A request outside that window is a configuration
//! error, never a crash.

use fugit::HertzU32;

/// Prescaler divisor per prescaler field value.
///
/// Indices `0..=15` divide the peripheral clock by `2^(index + 1)`; index 16
/// ([PRESCALER_OFF]) disables prescaling. Kept as a table so no powers are
/// computed at run time.
pub const PRESCALER_DIVISORS: [u32; 17] = [
    2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536, 1,
];

/// Prescaler field value meaning "no prescaling".
pub const PRESCALER_OFF: u8 = 16;

const COUNT_MIN: u64 = 4;
const COUNT_MAX: u64 = 65535;

/// Timer parameter errors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Resolved interval or match count falls outside `[4, 65535]`.
    OutOfRange,
    /// Duty cycle above 100 %.
    Duty,
    /// Prescaler field value outside the divisor table.
    Prescaler,
}

/// Timer parameter configuration
pub mod config {
    use fugit::HertzU32;

    /// Requested output for one square-wave channel.
    #[derive(Debug, Clone, Copy, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Config {
        /// Frequency the channel should output on its waveform pin.
        pub frequency: HertzU32,
        /// Duty cycle of the output wave as a percentage, `0..=100`.
        pub duty_pct: u8,
        /// Prescaler field value, `0..=16`. See
        /// [PRESCALER_DIVISORS](super::PRESCALER_DIVISORS).
        pub prescaler: u8,
    }
}

/// Register values resolved from a [`config::Config`].
///
/// Derived deterministically by [resolve] and never mutated afterwards; a
/// new request produces a whole new program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Program {
    /// Interval count: ticks per waveform period.
    pub interval: u16,
    /// Match count: tick at which the output toggles.
    pub match_count: u16,
    /// Prescaler field value the counts were resolved against.
    pub prescaler: u8,
}

/// Resolve `config` against the peripheral clock.
///
/// `interval = pclk / (divisor × frequency)` and
/// `match = interval × duty / 100`, both with truncating division, so the
/// produced duty cycle is never above the requested percentage. Very small
/// duty cycles can push the match count under the minimum and are rejected
/// the same way an over-long interval is.
pub fn resolve(pclk: HertzU32, config: &config::Config) -> Result<Program, Error> {
    if config.duty_pct > 100 {
        return Err(Error::Duty);
    }

    let divisor = *PRESCALER_DIVISORS
        .get(usize::from(config.prescaler))
        .ok_or(Error::Prescaler)?;

    let ticks_per_period = u64::from(divisor) * u64::from(config.frequency.to_Hz());
    if ticks_per_period == 0 {
        // Zero frequency has no representable period.
        return Err(Error::OutOfRange);
    }

    let interval = u64::from(pclk.to_Hz()) / ticks_per_period;
    if !(COUNT_MIN..=COUNT_MAX).contains(&interval) {
        return Err(Error::OutOfRange);
    }

    let match_count = interval * u64::from(config.duty_pct) / 100;
    if !(COUNT_MIN..=COUNT_MAX).contains(&match_count) {
        return Err(Error::OutOfRange);
    }

    Ok(Program {
        interval: interval as u16,
        match_count: match_count as u16,
        prescaler: config.prescaler,
    })
}
