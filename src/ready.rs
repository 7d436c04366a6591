//! Data-ready (DRDY) notification sources.
//!
//! The ADS1256 pulls DRDY low when a conversion result is available and
//! drives it high again once the result has been read. The drivers wait for
//! one notification before each dependent transaction. A notification that
//! arrives while nobody is waiting must be kept for the next wait, and
//! waiting must consume it.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;

/// Source of DRDY notifications for [`crate::Ads1256`]
pub trait DataReady {
    type Error;

    /// Consume a pending notification
    ///
    /// Returns `Ok(true)` when a notification was pending, `Ok(false)`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns the source's error if DRDY cannot be sampled
    fn take_ready(&mut self) -> Result<bool, Self::Error>;
}

/// Source of DRDY notifications for [`crate::Ads1256Async`]
#[allow(async_fn_in_trait)]
pub trait AsyncDataReady {
    type Error;

    /// Wait until a notification is pending, then consume it
    ///
    /// Returns immediately if the notification arrived before the call.
    ///
    /// # Errors
    ///
    /// Returns the source's error if DRDY cannot be observed
    async fn wait_ready(&mut self) -> Result<(), Self::Error>;
}

/// Single-slot flag set from an edge interrupt and consumed by the driver
///
/// Put it in a `static`, call [`ReadyFlag::signal`] from the DRDY
/// falling-edge handler and hand `&FLAG` to the driver.
///
/// ```
/// use ads1256::ReadyFlag;
///
/// static DRDY: ReadyFlag = ReadyFlag::new();
///
/// // interrupt handler
/// DRDY.signal();
///
/// assert!(DRDY.take());
/// assert!(!DRDY.take());
/// ```
#[derive(Debug, Default)]
pub struct ReadyFlag {
    ready: AtomicBool,
}

impl ReadyFlag {
    /// Create a flag in the "not ready" state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
        }
    }

    /// Record a falling edge
    pub fn signal(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Test and clear in one atomic step
    ///
    /// An edge that lands between a plain load and store would be lost; the
    /// swap cannot lose it.
    pub fn take(&self) -> bool {
        self.ready.swap(false, Ordering::AcqRel)
    }

    /// Look at the flag without consuming it
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl DataReady for &ReadyFlag {
    type Error = Infallible;

    fn take_ready(&mut self) -> Result<bool, Infallible> {
        Ok(self.take())
    }
}

/// Async counterpart of [`ReadyFlag`]
///
/// Raise the signal from the DRDY edge handler (or a task awaiting the
/// edge). A signal raised before the driver starts waiting is latched and
/// consumed by the next wait.
impl<M: RawMutex> AsyncDataReady for &Signal<M, ()> {
    type Error = Infallible;

    async fn wait_ready(&mut self) -> Result<(), Infallible> {
        self.wait().await;
        Ok(())
    }
}

/// DRDY level polling for the blocking driver
///
/// For platforms without pin interrupts. A low level counts as ready: DRDY
/// only returns high once a result has been read, so a low level is never
/// missed between two polls, whatever the poll interval. After commands that
/// do not read data (RREG, WREG, SELFCAL completion) the line stays low and
/// the next wait passes at once.
#[derive(Debug)]
pub struct PolledReady<P> {
    pin: P,
}

impl<P: InputPin> PolledReady<P> {
    /// Wrap the DRDY input
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Release the pin
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin> DataReady for PolledReady<P> {
    type Error = P::Error;

    fn take_ready(&mut self) -> Result<bool, P::Error> {
        self.pin.is_low()
    }
}

/// DRDY level waiting for the async driver
///
/// Same rule as [`PolledReady`], through [`Wait::wait_for_low`], which
/// returns at once when the line is already low. An edge that happened
/// before the call is therefore still seen.
#[derive(Debug)]
pub struct PinReady<P> {
    pin: P,
}

impl<P: Wait> PinReady<P> {
    /// Wrap the DRDY input
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Release the pin
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: Wait> AsyncDataReady for PinReady<P> {
    type Error = P::Error;

    async fn wait_ready(&mut self) -> Result<(), P::Error> {
        self.pin.wait_for_low().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn flag_is_consumed_once() {
        let flag = ReadyFlag::new();
        assert!(!flag.take());

        flag.signal();
        flag.signal();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn flag_reference_is_a_ready_source() {
        let flag = ReadyFlag::new();
        let mut source = &flag;
        assert_eq!(source.take_ready(), Ok(false));
        flag.signal();
        assert_eq!(source.take_ready(), Ok(true));
        assert_eq!(source.take_ready(), Ok(false));
    }

    #[test]
    fn polled_source_follows_the_level() {
        let expectations = [
            Transaction::get(State::High),
            Transaction::get(State::Low),
            Transaction::get(State::Low),
            Transaction::get(State::High),
        ];
        let mut source = PolledReady::new(PinMock::new(&expectations));

        assert_eq!(source.take_ready(), Ok(false));
        assert_eq!(source.take_ready(), Ok(true));
        assert_eq!(source.take_ready(), Ok(true));
        assert_eq!(source.take_ready(), Ok(false));

        source.release().done();
    }

    #[test]
    fn signal_raised_before_waiting_is_kept() {
        let drdy = Signal::<NoopRawMutex, ()>::new();
        let mut source = &drdy;

        drdy.signal(());
        assert!(embassy_futures::poll_once(source.wait_ready()).is_ready());
        assert!(!drdy.signaled());
        assert!(embassy_futures::poll_once(source.wait_ready()).is_pending());
    }
}
