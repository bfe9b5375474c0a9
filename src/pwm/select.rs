//! # Tick-rate profiles and the frequency-select handler
//!
//! ## Overview
//! The modulator synthesizes several output frequencies from one fixed
//! table by changing how fast the tick interrupt fires and how far the
//! table cursor advances per tick. A [Profile] carries both knobs; the
//! selector input (switches) picks one.
//!
//! The two highest-frequency profiles read only every 5th sample. At those
//! tick rates the interrupt service time cannot keep up with full-table
//! replay, so the table is deliberately undersampled; the lower-frequency
//! profiles consult every sample.

use core::cell::Cell;

use critical_section::Mutex;

/// One tick-source setting: how fast playback ticks and how far the table
/// cursor moves per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Profile {
    /// Reload value for the tick-source timer.
    pub reload: u32,
    /// Table cursor advance per tick. Must divide the table length so the
    /// cursor keeps returning to its starting sample.
    pub stride: usize,
}

/// Selector → profile table for the reference platform: 333.5 MHz
/// peripheral clock, tick prescaler fixed at 1, 50-sample table.
///
/// Reload values follow `pclk / (2 × samples_per_second) − 1`:
///
/// | selector | output | samples per period | reload |
/// |---|---|---|---|
/// | 0 | 60 Hz | 50 | 55582 |
/// | 1 | 100 Hz | 50 | 33349 |
/// | 2 | 500 Hz | 10 | 33349 |
/// | 3 | 1 kHz | 10 | 16674 |
pub const PROFILES: [Profile; 4] = [
    Profile {
        reload: 55_582,
        stride: 1,
    },
    Profile {
        reload: 33_349,
        stride: 1,
    },
    Profile {
        reload: 33_349,
        stride: 5,
    },
    Profile {
        reload: 16_674,
        stride: 5,
    },
];

/// Profile used for selector values outside the table: the slowest output
/// (1 Hz, every sample).
pub const FALLBACK: Profile = Profile {
    reload: 3_334_999,
    stride: 1,
};

/// Map a selector reading to its profile.
///
/// Unrecognized values silently fall back to `fallback` rather than
/// erroring; the selector is free-running hardware input and a stray value
/// must not take the waveform down.
pub fn profile_for(profiles: &[Profile], fallback: Profile, selector: u8) -> Profile {
    profiles
        .get(usize::from(selector))
        .copied()
        .unwrap_or(fallback)
}

/// Currently selected playback profile.
///
/// Written by the selector interrupt, read by the foreground modulator;
/// the critical section makes the handoff a single word swap.
pub struct ProfileSelect(Mutex<Cell<Profile>>);

impl ProfileSelect {
    /// A cell seeded with the boot-time profile.
    pub const fn new(initial: Profile) -> Self {
        Self(Mutex::new(Cell::new(initial)))
    }

    /// Latest published profile.
    pub fn get(&self) -> Profile {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    pub(crate) fn set(&self, profile: Profile) {
        critical_section::with(|cs| self.0.borrow(cs).set(profile));
    }
}

/// Minimal control the handler needs over the tick-source timer.
pub trait TickTimer {
    /// Start the timer.
    fn start(&mut self);

    /// Stop the timer.
    fn stop(&mut self);

    /// Load the value the timer reloads from.
    fn load_value(&mut self, reload: u32);
}

impl<T: TickTimer + ?Sized> TickTimer for &mut T {
    fn start(&mut self) {
        T::start(self);
    }

    fn stop(&mut self) {
        T::stop(self);
    }

    fn load_value(&mut self, reload: u32) {
        T::load_value(self, reload);
    }
}

/// Control over the selector interrupt source at the interrupt controller.
pub trait InterruptControl {
    /// Unmask the source.
    fn enable(&mut self);

    /// Mask the source.
    fn disable(&mut self);

    /// Clear the source's pending status.
    fn clear(&mut self);
}

impl<I: InterruptControl + ?Sized> InterruptControl for &mut I {
    fn enable(&mut self) {
        I::enable(self);
    }

    fn disable(&mut self) {
        I::disable(self);
    }

    fn clear(&mut self) {
        I::clear(self);
    }
}

/// Current selector reading (switches or equivalent).
pub trait SelectorInput {
    /// Read the selector value.
    fn read(&self) -> u8;
}

impl<S: SelectorInput + ?Sized> SelectorInput for &S {
    fn read(&self) -> u8 {
        S::read(self)
    }
}

/// Callback object for the selector-change interrupt.
///
/// Owns the tick-source timer and the interrupt-source control; it never
/// touches the PWM carrier timer or the table cursor, only the tick
/// cadence.
pub struct SelectorHandler<'a, T, I, S> {
    timer: T,
    irq: I,
    input: S,
    profiles: &'a [Profile],
    fallback: Profile,
    select: &'a ProfileSelect,
}

impl<'a, T, I, S> SelectorHandler<'a, T, I, S>
where
    T: TickTimer,
    I: InterruptControl,
    S: SelectorInput,
{
    /// Bundle the collaborators and the profile table.
    pub fn new(
        timer: T,
        irq: I,
        input: S,
        profiles: &'a [Profile],
        fallback: Profile,
        select: &'a ProfileSelect,
    ) -> Self {
        Self {
            timer,
            irq,
            input,
            profiles,
            fallback,
            select,
        }
    }

    /// Invoked by the interrupt dispatcher on a selector-input change.
    ///
    /// Masks the source, re-reads the selector, publishes the matching
    /// profile and re-paces the tick timer around it, then clears and
    /// unmasks the source. Returns the freshly-read selector value so the
    /// caller can mirror it (to LEDs, a console).
    pub fn on_selector_change(&mut self) -> u8 {
        self.irq.disable();

        let value = self.input.read();
        if usize::from(value) >= self.profiles.len() {
            warn!("unrecognized selector {}, using fallback profile", value);
        }
        let profile = profile_for(self.profiles, self.fallback, value);
        self.select.set(profile);
        debug!(
            "selector {} -> reload={} stride={}",
            value, profile.reload, profile.stride
        );

        self.timer.stop();
        self.timer.load_value(profile.reload);
        self.timer.start();

        self.irq.clear();
        self.irq.enable();

        value
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use heapless::Vec;

    use super::*;
    use crate::pwm::sine;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        IrqDisable,
        Read,
        Stop,
        Load(u32),
        Start,
        Clear,
        IrqEnable,
    }

    struct Log(RefCell<Vec<Event, 16>>);

    impl Log {
        fn new() -> Self {
            Self(RefCell::new(Vec::new()))
        }

        fn push(&self, event: Event) {
            self.0.borrow_mut().push(event).unwrap();
        }
    }

    struct FakeTimer<'a>(&'a Log);

    impl TickTimer for FakeTimer<'_> {
        fn start(&mut self) {
            self.0.push(Event::Start);
        }

        fn stop(&mut self) {
            self.0.push(Event::Stop);
        }

        fn load_value(&mut self, reload: u32) {
            self.0.push(Event::Load(reload));
        }
    }

    struct FakeIrq<'a>(&'a Log);

    impl InterruptControl for FakeIrq<'_> {
        fn enable(&mut self) {
            self.0.push(Event::IrqEnable);
        }

        fn disable(&mut self) {
            self.0.push(Event::IrqDisable);
        }

        fn clear(&mut self) {
            self.0.push(Event::Clear);
        }
    }

    struct FakeSelector<'a> {
        log: &'a Log,
        value: u8,
    }

    impl SelectorInput for FakeSelector<'_> {
        fn read(&self) -> u8 {
            self.log.push(Event::Read);
            self.value
        }
    }

    fn handler<'a>(
        log: &'a Log,
        value: u8,
        select: &'a ProfileSelect,
    ) -> SelectorHandler<'a, FakeTimer<'a>, FakeIrq<'a>, FakeSelector<'a>> {
        SelectorHandler::new(
            FakeTimer(log),
            FakeIrq(log),
            FakeSelector { log, value },
            &PROFILES,
            FALLBACK,
            select,
        )
    }

    #[test]
    fn known_selector_maps_through_the_table() {
        let log = Log::new();
        let select = ProfileSelect::new(FALLBACK);

        let value = handler(&log, 2, &select).on_selector_change();

        assert_eq!(value, 2);
        assert_eq!(select.get(), PROFILES[2]);
        assert_eq!(select.get().stride, 5);
    }

    #[test]
    fn unknown_selector_falls_back_to_slowest_profile() {
        let log = Log::new();
        let select = ProfileSelect::new(PROFILES[0]);

        handler(&log, 7, &select).on_selector_change();

        assert_eq!(select.get(), FALLBACK);
        assert!(log.0.borrow().contains(&Event::Load(FALLBACK.reload)));
    }

    #[test]
    fn handler_follows_disable_service_clear_enable_order() {
        let log = Log::new();
        let select = ProfileSelect::new(FALLBACK);

        handler(&log, 1, &select).on_selector_change();

        assert_eq!(
            log.0.borrow().as_slice(),
            [
                Event::IrqDisable,
                Event::Read,
                Event::Stop,
                Event::Load(PROFILES[1].reload),
                Event::Start,
                Event::Clear,
                Event::IrqEnable,
            ]
        );
    }

    #[test]
    fn profile_strides_divide_the_table() {
        for profile in PROFILES.iter().chain([FALLBACK].iter()) {
            assert_eq!(sine::SAMPLE_COUNT % profile.stride, 0);
        }
    }

    #[test]
    fn reload_values_match_the_reference_clock() {
        const PCLK: u64 = 333_500_000;
        let samples_per_second = [3_000u64, 5_000, 5_000, 10_000];

        for (profile, ticks) in PROFILES.iter().zip(samples_per_second) {
            assert_eq!(u64::from(profile.reload), PCLK / (2 * ticks) - 1);
        }
        assert_eq!(u64::from(FALLBACK.reload), PCLK / (2 * 50) - 1);
    }
}
