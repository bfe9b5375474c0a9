//! # Waveform generation for triple-timer SoC peripherals
//!
//! ## Overview
//! This driver generates periodic waveforms from the triple-timer-counter
//! family found on SoC (processor + programmable logic) platforms:
//!
//! - [wave] programs up to [`wave::channel::MAX_CHANNELS`] independent
//!   square-wave channels from requested (frequency, duty cycle) pairs,
//!   resolving prescaler, interval and match register values and bounding
//!   its run loop so a dead timer surfaces as an error instead of a hang.
//! - [pwm] replays a fixed table of pre-computed high-times through a PWM
//!   carrier channel, paced by a fast tick interrupt. A selector input
//!   (switches) picks the synthesized frequency by changing the tick reload
//!   value and the table stride.
//!
//! The crate never touches memory-mapped I/O itself: the board layer
//! supplies a [`regs::RegisterAccess`] implementation per channel base
//! address together with a [`regs::TimerLayout`] describing the register
//! offsets and masks of its timer family.
//!
//! ## Example
//!
//! ```rust,ignore
//! let layout = TimerLayout::triple_timer();
//! let mut channels = [
//!     Channel::new(Mmio::new(TTC0_BASE_0), layout),
//!     Channel::new(Mmio::new(TTC0_BASE_1), layout),
//!     Channel::new(Mmio::new(TTC0_BASE_2), layout),
//! ];
//!
//! // Three square waves from one preset group.
//! let specs = wave::preset_group(6).unwrap();
//! wave::channel::configure(PCLK, specs, &mut channels)?;
//! wave::channel::run(&mut channels, &PollBudget::self_test())?;
//!
//! // Sine PWM, stepped by the tick interrupt.
//! static TICK: TickFlag = TickFlag::new();
//! static SELECT: ProfileSelect = ProfileSelect::new(select::FALLBACK);
//!
//! let mut modulator = Modulator::new(
//!     Mmio::new(CARRIER_BASE),
//!     layout,
//!     &sine::SINE_HIGH_TIME_NS,
//!     &TICK,
//!     &SELECT,
//!     pwm::config::Config {
//!         carrier_clock: 100u32.MHz(),
//!         period_ns: 1_000_000,
//!     },
//! )?;
//! modulator.configure();
//!
//! loop {
//!     modulator.poll();
//! }
//! ```
//!
//! ## Feature Flags
#![doc = document_features::document_features!()]
#![deny(missing_docs)]
#![no_std]

// MUST be the first module
mod fmt;

pub mod pwm;
pub mod regs;
pub mod wave;
