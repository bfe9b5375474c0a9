//! # Square-wave generation
//!
//! ## Overview
//! Drives independent square-wave channels of one timer family. Each channel
//! gets its own prescaler, interval and match register values resolved from a
//! requested (frequency, duty cycle) pair by [timer::resolve], then committed
//! through the channel's [`RegisterAccess`](crate::regs::RegisterAccess)
//! handle by [channel::configure].
//!
//! ## Configuration
//! Configuration is all-or-nothing: every channel's parameters are resolved
//! before any register is written, so a failing channel leaves the whole
//! group untouched. After configuration, [channel::run] observes the
//! channels' interval events for a caller-bounded number of polls, doubling
//! as a liveness self-test.

use fugit::HertzU32;

use self::timer::config::Config;

pub mod channel;
pub mod timer;

/// Ready-made channel settings, grouped three at a time (one group per
/// counter block). Whether a preset actually resolves depends on the
/// peripheral clock; the low-frequency group at offset 0 needs a slower
/// clock than the reference platform provides.
pub static PRESETS: [Config; 15] = [
    Config { frequency: HertzU32::Hz(10), duty_pct: 50, prescaler: 6 },
    Config { frequency: HertzU32::Hz(10), duty_pct: 25, prescaler: 6 },
    Config { frequency: HertzU32::Hz(10), duty_pct: 75, prescaler: 6 },
    Config { frequency: HertzU32::Hz(100), duty_pct: 50, prescaler: 3 },
    Config { frequency: HertzU32::Hz(200), duty_pct: 25, prescaler: 2 },
    Config { frequency: HertzU32::Hz(400), duty_pct: 12, prescaler: 1 },
    Config { frequency: HertzU32::Hz(500), duty_pct: 50, prescaler: 1 },
    Config { frequency: HertzU32::Hz(1_000), duty_pct: 50, prescaler: 0 },
    Config { frequency: HertzU32::Hz(5_000), duty_pct: 50, prescaler: 16 },
    Config { frequency: HertzU32::Hz(10_000), duty_pct: 50, prescaler: 16 },
    Config { frequency: HertzU32::Hz(50_000), duty_pct: 50, prescaler: 16 },
    Config { frequency: HertzU32::Hz(100_000), duty_pct: 50, prescaler: 16 },
    Config { frequency: HertzU32::Hz(500_000), duty_pct: 50, prescaler: 16 },
    Config { frequency: HertzU32::Hz(1_000_000), duty_pct: 50, prescaler: 16 },
    Config { frequency: HertzU32::Hz(5_000_000), duty_pct: 50, prescaler: 16 },
];

/// Three consecutive presets starting at `offset`, or `None` when the window
/// would leave [PRESETS].
pub fn preset_group(offset: usize) -> Option<&'static [Config]> {
    PRESETS.get(offset..offset.checked_add(3)?)
}
