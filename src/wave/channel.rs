//! # Square-wave channels
//!
//! ## Overview
//! A [Channel] owns the register handle of one timer channel and the program
//! committed to it. [configure] programs a whole group of channels
//! all-or-nothing; [run] then watches their interval events under an
//! explicit [PollBudget] so a silent timer turns into
//! [`Error::HardwareTimeout`] instead of an endless spin.

use embedded_hal::pwm;
use fugit::HertzU32;
use heapless::Vec;

use crate::{
    regs::{RegisterAccess, TimerLayout},
    wave::timer::{self, config, Program, PRESCALER_OFF},
};

/// Most channels a single [configure] call will stage.
pub const MAX_CHANNELS: usize = 8;

/// Channel errors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Parameter resolution failed for one channel; no channel was
    /// committed.
    Configuration {
        /// Index of the failing channel within the configure call.
        channel: usize,
        /// The parameter error that rejected it.
        source: timer::Error,
    },
    /// A channel did not raise its interval event within the poll budget.
    HardwareTimeout {
        /// Index of the first channel still short of its event target.
        channel: usize,
    },
    /// Spec and channel slices differ in length.
    LengthMismatch,
    /// More channels than one configure call can stage.
    Capacity,
    /// The channel has no committed program yet.
    NotConfigured,
}

/// Bounded polling policy for [run].
///
/// An explicit parameter rather than a built-in constant so tests can drive
/// the loop deterministically against a fake peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollBudget {
    /// Interval events to observe per channel before [run] returns.
    pub target_events: u32,
    /// Total poll iterations allowed before the run is declared dead.
    pub max_polls: u32,
}

impl PollBudget {
    /// A budget with the given event target and poll ceiling.
    pub const fn new(target_events: u32, max_polls: u32) -> Self {
        Self {
            target_events,
            max_polls,
        }
    }

    /// The bring-up self-test budget: 256 waveform periods per channel with
    /// a generous poll ceiling.
    pub const fn self_test() -> Self {
        Self::new(0xFF, 1 << 20)
    }
}

/// One square-wave channel of the timer family.
pub struct Channel<R: RegisterAccess> {
    regs: R,
    layout: TimerLayout,
    program: Option<Program>,
    events: u32,
}

impl<R: RegisterAccess> Channel<R> {
    /// Wrap a channel register handle.
    pub fn new(regs: R, layout: TimerLayout) -> Self {
        Self {
            regs,
            layout,
            program: None,
            events: 0,
        }
    }

    /// The committed program, if the channel has been configured.
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Interval events observed by [run] since the last configure.
    pub fn events(&self) -> u32 {
        self.events
    }

    /// Write a resolved program to the hardware.
    ///
    /// Register order follows the peripheral's programming model: prescaler
    /// first, then the counts, then the counter control word that enables
    /// the waveform output (active low) in interval + match mode with a
    /// reset pulse, and finally the interval-event interrupt enable.
    fn commit(&mut self, program: Program) {
        let masks = self.layout.masks;

        let clock = if program.prescaler < PRESCALER_OFF {
            ((u32::from(program.prescaler) << masks.prescaler_shift) & masks.prescaler_value)
                | masks.prescaler_enable
        } else {
            0
        };
        self.regs.write_register(self.layout.clock_control, clock);

        self.regs
            .write_register(self.layout.interval, u32::from(program.interval));
        self.regs
            .write_register(self.layout.match0, u32::from(program.match_count));

        let control = (masks.interval_mode | masks.match_mode | masks.counter_reset)
            & !(masks.counter_disable | masks.waveform_enable);
        self.regs
            .write_register(self.layout.counter_control, control);

        self.regs
            .write_register(self.layout.interrupt_enable, masks.interval_event);

        self.program = Some(program);
        self.events = 0;
    }

    /// Observe the status register once, clearing whatever was raised.
    fn poll_event(&mut self) {
        let status = self.regs.read_register(self.layout.interrupt_status);
        // Write-1-to-clear: hand the observed flags straight back.
        self.regs
            .write_register(self.layout.interrupt_status, status);

        if status & self.layout.masks.interval_event != 0 {
            self.events += 1;
        }
    }
}

/// Program a group of channels from their specs, all-or-nothing.
///
/// Every spec is resolved against `pclk` before any register write, so a
/// rejected channel aborts the whole call with
/// [`Error::Configuration`] and leaves all channels exactly as they were.
pub fn configure<R: RegisterAccess>(
    pclk: HertzU32,
    specs: &[config::Config],
    channels: &mut [Channel<R>],
) -> Result<(), Error> {
    if specs.len() != channels.len() {
        return Err(Error::LengthMismatch);
    }

    let mut programs: Vec<Program, MAX_CHANNELS> = Vec::new();
    for (index, spec) in specs.iter().enumerate() {
        let program = timer::resolve(pclk, spec).map_err(|source| Error::Configuration {
            channel: index,
            source,
        })?;
        programs.push(program).map_err(|_| Error::Capacity)?;
    }

    for (index, (channel, program)) in channels.iter_mut().zip(programs).enumerate() {
        channel.commit(program);
        debug!(
            "wave channel {}: interval={} match={} prescaler={}",
            index, program.interval, program.match_count, program.prescaler
        );
    }

    info!("{} wave channels programmed", channels.len());
    Ok(())
}

/// Watch the channels' interval events until every channel has seen
/// `budget.target_events` of them.
///
/// Status flags are cleared by writing the observed value back
/// (write-1-to-clear). The loop is strictly bounded by `budget.max_polls`;
/// a channel that stays silent past the ceiling fails the run with
/// [`Error::HardwareTimeout`].
pub fn run<R: RegisterAccess>(
    channels: &mut [Channel<R>],
    budget: &PollBudget,
) -> Result<(), Error> {
    let mut polls = 0;
    loop {
        if channels
            .iter()
            .all(|channel| channel.events >= budget.target_events)
        {
            return Ok(());
        }

        if polls == budget.max_polls {
            let channel = channels
                .iter()
                .position(|channel| channel.events < budget.target_events)
                .unwrap_or(0);
            error!("wave channel {} silent after {} polls", channel, polls);
            return Err(Error::HardwareTimeout { channel });
        }
        polls += 1;

        for channel in channels.iter_mut() {
            if channel.events < budget.target_events {
                channel.poll_event();
            }
        }
    }
}

impl pwm::Error for Error {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

impl<R: RegisterAccess> pwm::ErrorType for Channel<R> {
    type Error = Error;
}

impl<R: RegisterAccess> pwm::SetDutyCycle for Channel<R> {
    fn max_duty_cycle(&self) -> u16 {
        self.program.map(|program| program.interval).unwrap_or(0)
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let Some(program) = self.program.as_mut() else {
            return Err(Error::NotConfigured);
        };
        program.match_count = duty.min(program.interval);
        let match_count = program.match_count;

        self.regs
            .write_register(self.layout.match0, u32::from(match_count));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::pwm::SetDutyCycle;
    use fugit::RateExtU32;

    use super::*;

    const LAYOUT: TimerLayout = TimerLayout::triple_timer();

    struct FakeRegs {
        writes: Vec<(u32, u32), 64>,
        raise_event: bool,
    }

    impl FakeRegs {
        fn new(raise_event: bool) -> Self {
            Self {
                writes: Vec::new(),
                raise_event,
            }
        }
    }

    impl RegisterAccess for FakeRegs {
        fn write_register(&mut self, offset: u32, value: u32) {
            self.writes.push((offset, value)).unwrap();
        }

        fn read_register(&self, offset: u32) -> u32 {
            if offset == LAYOUT.interrupt_status && self.raise_event {
                LAYOUT.masks.interval_event
            } else {
                0
            }
        }
    }

    fn pclk() -> HertzU32 {
        333_500_000.Hz()
    }

    fn spec(frequency: u32, duty_pct: u8, prescaler: u8) -> config::Config {
        config::Config {
            frequency: frequency.Hz(),
            duty_pct,
            prescaler,
        }
    }

    #[test]
    fn configure_commits_the_full_register_sequence() {
        let mut channels = [Channel::new(FakeRegs::new(false), LAYOUT)];

        configure(pclk(), &[spec(100_000, 50, 1)], &mut channels).unwrap();

        // Prescaler index 1, enabled: (1 << 1) | enable bit.
        assert_eq!(
            channels[0].regs.writes,
            [
                (LAYOUT.clock_control, 0x3),
                (LAYOUT.interval, 833),
                (LAYOUT.match0, 416),
                (LAYOUT.counter_control, 0x1A),
                (LAYOUT.interrupt_enable, 0x1),
            ]
        );
        assert_eq!(
            channels[0].program(),
            Some(&Program {
                interval: 833,
                match_count: 416,
                prescaler: 1,
            })
        );
    }

    #[test]
    fn configure_without_prescaling_zeroes_clock_control() {
        let mut channels = [Channel::new(FakeRegs::new(false), LAYOUT)];

        configure(pclk(), &[spec(1_000_000, 50, PRESCALER_OFF)], &mut channels).unwrap();

        assert_eq!(channels[0].regs.writes[0], (LAYOUT.clock_control, 0));
    }

    #[test]
    fn configure_is_all_or_nothing() {
        let mut channels = [
            Channel::new(FakeRegs::new(false), LAYOUT),
            Channel::new(FakeRegs::new(false), LAYOUT),
        ];

        // Second channel resolves to an interval beyond 16 bits.
        let result = configure(
            pclk(),
            &[spec(100_000, 50, 1), spec(10, 50, 6)],
            &mut channels,
        );

        assert_eq!(
            result,
            Err(Error::Configuration {
                channel: 1,
                source: timer::Error::OutOfRange,
            })
        );
        assert!(channels[0].regs.writes.is_empty());
        assert!(channels[1].regs.writes.is_empty());
        assert!(channels[0].program().is_none());
    }

    #[test]
    fn configure_rejects_mismatched_lengths() {
        let mut channels = [Channel::new(FakeRegs::new(false), LAYOUT)];

        let result = configure(pclk(), &[], &mut channels);

        assert_eq!(result, Err(Error::LengthMismatch));
    }

    #[test]
    fn run_counts_events_and_clears_status() {
        let mut channels = [
            Channel::new(FakeRegs::new(true), LAYOUT),
            Channel::new(FakeRegs::new(true), LAYOUT),
        ];
        configure(
            pclk(),
            &[spec(100_000, 50, 1), spec(100_000, 25, 1)],
            &mut channels,
        )
        .unwrap();

        run(&mut channels, &PollBudget::new(3, 10)).unwrap();

        for channel in &channels {
            assert_eq!(channel.events(), 3);
            // Observed status is written straight back to clear it.
            assert!(channel
                .regs
                .writes
                .iter()
                .any(|write| *write == (LAYOUT.interrupt_status, LAYOUT.masks.interval_event)));
        }
    }

    #[test]
    fn run_times_out_on_a_silent_channel() {
        let mut channels = [
            Channel::new(FakeRegs::new(true), LAYOUT),
            Channel::new(FakeRegs::new(false), LAYOUT),
        ];
        configure(
            pclk(),
            &[spec(100_000, 50, 1), spec(100_000, 50, 1)],
            &mut channels,
        )
        .unwrap();

        let result = run(&mut channels, &PollBudget::new(3, 8));

        assert_eq!(result, Err(Error::HardwareTimeout { channel: 1 }));
        assert_eq!(channels[0].events(), 3);
        assert_eq!(channels[1].events(), 0);
    }

    #[test]
    fn run_with_zero_budget_returns_immediately() {
        let mut channels = [Channel::new(FakeRegs::new(false), LAYOUT)];

        run(&mut channels, &PollBudget::new(0, 0)).unwrap();
    }

    #[test]
    fn set_duty_cycle_rewrites_the_match_register() {
        let mut channels = [Channel::new(FakeRegs::new(false), LAYOUT)];
        configure(pclk(), &[spec(100_000, 50, 1)], &mut channels).unwrap();

        assert_eq!(channels[0].max_duty_cycle(), 833);

        channels[0].set_duty_cycle(100).unwrap();
        assert_eq!(
            channels[0].regs.writes.last(),
            Some(&(LAYOUT.match0, 100))
        );

        // Requests above the period clamp to it.
        channels[0].set_duty_cycle(u16::MAX).unwrap();
        assert_eq!(
            channels[0].regs.writes.last(),
            Some(&(LAYOUT.match0, 833))
        );
    }

    #[test]
    fn set_duty_cycle_requires_a_program() {
        let mut channel = Channel::new(FakeRegs::new(false), LAYOUT);

        assert_eq!(channel.set_duty_cycle(10), Err(Error::NotConfigured));
        assert_eq!(channel.max_duty_cycle(), 0);
    }
}
