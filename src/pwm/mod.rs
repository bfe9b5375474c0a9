//! # Table-driven PWM modulation
//!
//! ## Overview
//! A fast tick interrupt paces playback of a fixed high-time table through
//! a PWM carrier channel. The interrupt does the minimum possible work: it
//! raises the [TickFlag]. The foreground loop calls [`Modulator::poll`],
//! which consumes the flag, commits the next table sample to the carrier's
//! match register and advances the table cursor by the stride of the
//! currently selected [Profile](select::Profile).
//!
//! ## Ownership
//! The flag is the only datum written from interrupt context; the cursor
//! and the table belong to the foreground. That strict single-writer split
//! over a single boolean is the whole concurrency protocol; no further
//! locking is involved. The flag saturates: a tick that fires while one is
//! already pending is a missed tick, which the design accepts.

use fugit::HertzU32;
use portable_atomic::{AtomicBool, Ordering};

use self::select::ProfileSelect;
use crate::regs::{RegisterAccess, TimerLayout};

pub mod select;
pub mod sine;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Modulator errors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The sample table is empty.
    EmptyTable,
}

/// Tick-pending flag shared between the tick interrupt and the foreground
/// loop.
pub struct TickFlag(AtomicBool);

impl TickFlag {
    /// A lowered flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Signal a tick. The only operation interrupt context may perform on
    /// shared state.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True while a tick is pending.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn lower(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for TickFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback object to register for the tick-source interrupt.
pub struct TickHandler<'a> {
    flag: &'a TickFlag,
}

impl<'a> TickHandler<'a> {
    /// A handler raising `flag`.
    pub const fn new(flag: &'a TickFlag) -> Self {
        Self { flag }
    }

    /// Invoked by the interrupt dispatcher when the tick source fires.
    pub fn on_tick(&self) {
        self.flag.raise();
    }
}

/// Carrier configuration
pub mod config {
    use fugit::HertzU32;

    /// Carrier timer settings for the [Modulator](super::Modulator).
    #[derive(Debug, Clone, Copy, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Config {
        /// Clock feeding the carrier timer.
        pub carrier_clock: HertzU32,
        /// Carrier period in nanoseconds. The sample table must stay below
        /// it.
        pub period_ns: u32,
    }
}

/// Steps a PWM carrier's duty cycle through a sample table, one sample per
/// tick.
pub struct Modulator<'a, R: RegisterAccess> {
    regs: R,
    layout: TimerLayout,
    samples: &'a [u32],
    cursor: usize,
    tick: &'a TickFlag,
    select: &'a ProfileSelect,
    config: config::Config,
}

impl<'a, R: RegisterAccess> Modulator<'a, R> {
    /// Bind a carrier channel to a sample table and its pacing inputs.
    pub fn new(
        regs: R,
        layout: TimerLayout,
        samples: &'a [u32],
        tick: &'a TickFlag,
        select: &'a ProfileSelect,
        config: config::Config,
    ) -> Result<Self, Error> {
        if samples.is_empty() {
            return Err(Error::EmptyTable);
        }

        Ok(Self {
            regs,
            layout,
            samples,
            cursor: 0,
            tick,
            select,
            config,
        })
    }

    /// Current table cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn ticks_from_ns(&self, ns: u32) -> u32 {
        (u64::from(ns) * u64::from(self.config.carrier_clock.to_Hz()) / NANOS_PER_SEC) as u32
    }

    /// Program the carrier period and the first sample, then start the
    /// waveform.
    pub fn configure(&mut self) {
        self.cursor = 0;

        let period = self.ticks_from_ns(self.config.period_ns);
        self.regs.write_register(self.layout.interval, period);
        self.regs.write_register(
            self.layout.match0,
            self.ticks_from_ns(self.samples[self.cursor]),
        );

        let masks = self.layout.masks;
        let control = (masks.interval_mode | masks.match_mode | masks.counter_reset)
            & !(masks.counter_disable | masks.waveform_enable);
        self.regs
            .write_register(self.layout.counter_control, control);

        info!(
            "carrier configured: period={} ticks, {} samples",
            period,
            self.samples.len()
        );
    }

    fn set_waveform_output(&mut self, enable: bool) {
        let mask = self.layout.masks.waveform_enable;
        let control = self.regs.read_register(self.layout.counter_control);
        // Active low: setting the bit disables the output.
        let control = if enable {
            control & !mask
        } else {
            control | mask
        };
        self.regs
            .write_register(self.layout.counter_control, control);
    }

    /// Consume a pending tick, if any.
    ///
    /// Returns `false` without touching the hardware when no tick is
    /// pending. Otherwise commits the sample under the cursor: the output
    /// is disabled for the duration of the match write so the carrier
    /// never runs against a torn value, then re-enabled; the flag is
    /// lowered and the cursor advances by the selected profile's stride,
    /// wrapping at the table end.
    pub fn poll(&mut self) -> bool {
        if !self.tick.is_raised() {
            return false;
        }

        let stride = self.select.get().stride;

        self.set_waveform_output(false);
        self.regs.write_register(
            self.layout.match0,
            self.ticks_from_ns(self.samples[self.cursor]),
        );
        self.set_waveform_output(true);

        self.tick.lower();
        self.cursor = (self.cursor + stride) % self.samples.len();

        true
    }
}
