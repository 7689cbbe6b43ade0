//! Retry policies for transient failures.
//!
//! A [`Retryer`] is consulted by the invocation pipeline each time an attempt
//! fails with a retryable error. Retryers are stateful: the client keeps a
//! prototype and every call works on its own [`Retryer::clone_box`] copy, so
//! concurrent calls never share attempt counters.

use crate::{Error, Result};
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Decides whether a failed attempt is retried, and sleeps before it is.
pub trait Retryer: Send + Sync {
    /// Returns `Ok(())` (possibly after sleeping) if the call should be
    /// attempted again, or gives `error` back to propagate it.
    fn continue_or_propagate(&mut self, error: Error) -> Result<()>;

    /// A copy with fresh per-call state.
    fn clone_box(&self) -> Box<dyn Retryer>;
}

/// What the pipeline surfaces once retries are exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionPropagationPolicy {
    /// Surface the retryable error itself.
    #[default]
    None,
    /// Surface the retryable error's cause, when it has one.
    Unwrap,
}

/// The sleep of a backoff was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sleep interrupted")]
pub struct Interrupted;

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`, or returns early with [`Interrupted`].
    fn sleep(&self, duration: Duration) -> std::result::Result<(), Interrupted>;
}

/// Sleeps with [`std::thread::sleep`]; never interrupted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) -> std::result::Result<(), Interrupted> {
        std::thread::sleep(duration);
        Ok(())
    }
}

/// A sleeper that can be interrupted from another thread.
///
/// Interruption is sticky: once [`interrupt`](Self::interrupt) is called, the
/// pending sleep and every later one return [`Interrupted`] until
/// [`reset`](Self::reset).
///
/// # Examples
///
/// ```
/// use courier::retry::{InterruptHandle, Sleeper};
/// use std::time::Duration;
///
/// let handle = InterruptHandle::new();
/// let remote = handle.clone();
/// std::thread::spawn(move || remote.interrupt());
///
/// assert!(handle.sleep(Duration::from_secs(30)).is_err());
/// ```
#[derive(Clone, Default)]
pub struct InterruptHandle {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts the current sleep and all later ones.
    pub fn interrupt(&self) {
        let (flag, condvar) = &*self.state;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    pub fn is_interrupted(&self) -> bool {
        *self.state.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the interrupted flag.
    pub fn reset(&self) {
        *self.state.0.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

impl Sleeper for InterruptHandle {
    fn sleep(&self, duration: Duration) -> std::result::Result<(), Interrupted> {
        let (flag, condvar) = &*self.state;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = condvar
            .wait_timeout_while(guard, duration, |interrupted| !*interrupted)
            .unwrap_or_else(PoisonError::into_inner);
        if *guard {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptHandle")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Exponential backoff: the default retry policy.
///
/// After failed attempt `n` the policy sleeps `period * 1.5^(n-1)`, capped at
/// `max_period`, and gives up once `max_attempts` attempts have failed. A
/// server-requested retry instant is honored instead, capped at `max_period`;
/// an instant already in the past retries immediately.
///
/// # Examples
///
/// ```
/// use courier::retry::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff::default();
/// assert_eq!(backoff.period(), Duration::from_millis(100));
/// assert_eq!(backoff.max_period(), Duration::from_secs(1));
/// assert_eq!(backoff.max_attempts(), 5);
/// ```
pub struct Backoff {
    period: Duration,
    max_period: Duration,
    max_attempts: u32,
    attempt: u32,
    slept_for: Duration,
    jitter: bool,
    sleeper: Arc<dyn Sleeper>,
    clock: fn() -> SystemTime,
}

impl Backoff {
    /// Creates a policy sleeping on the current thread.
    pub fn new(period: Duration, max_period: Duration, max_attempts: u32) -> Self {
        Self {
            period,
            max_period,
            max_attempts,
            attempt: 1,
            slept_for: Duration::ZERO,
            jitter: false,
            sleeper: Arc::new(ThreadSleeper),
            clock: SystemTime::now,
        }
    }

    /// Sleeps through `sleeper` instead of the current thread.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Scales each computed interval by a random factor in `0.5..=1.0`.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Uses `clock` to measure server-requested retry instants.
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn max_period(&self) -> Duration {
        self.max_period
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The number of the attempt currently being made, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total time spent sleeping so far.
    pub fn slept_for(&self) -> Duration {
        self.slept_for
    }

    /// The interval after the current attempt fails.
    fn next_max_interval(&self) -> Duration {
        let cap = self.max_period.as_nanos();
        let mut nanos = self.period.as_nanos();
        for _ in 1..self.attempt {
            if nanos == 0 || nanos >= cap {
                break;
            }
            nanos = nanos * 3 / 2;
        }
        if nanos >= cap {
            return self.max_period;
        }
        Duration::from_nanos(nanos as u64)
    }

    fn fresh(&self) -> Self {
        Self {
            period: self.period,
            max_period: self.max_period,
            max_attempts: self.max_attempts,
            attempt: 1,
            slept_for: Duration::ZERO,
            jitter: self.jitter,
            sleeper: self.sleeper.clone(),
            clock: self.clock,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(1), 5)
    }
}

impl Retryer for Backoff {
    fn continue_or_propagate(&mut self, error: Error) -> Result<()> {
        if self.attempt >= self.max_attempts {
            return Err(error);
        }

        let interval = match error.retry_after() {
            Some(at) => match at.duration_since((self.clock)()) {
                Ok(wait) => wait.min(self.max_period),
                Err(_) => {
                    self.attempt += 1;
                    return Ok(());
                }
            },
            None if self.jitter => self
                .next_max_interval()
                .mul_f64(rand::thread_rng().gen_range(0.5..=1.0)),
            None => self.next_max_interval(),
        };
        self.attempt += 1;

        tracing::debug!(
            attempt = self.attempt,
            delay_ms = interval.as_millis() as u64,
            error = %error,
            "Backing off before retry"
        );

        if self.sleeper.sleep(interval).is_err() {
            tracing::debug!(attempt = self.attempt, "Backoff interrupted");
            return Err(error);
        }
        self.slept_for += interval;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Retryer> {
        Box::new(self.fresh())
    }
}

impl Clone for Backoff {
    fn clone(&self) -> Self {
        self.fresh()
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("period", &self.period)
            .field("max_period", &self.max_period)
            .field("max_attempts", &self.max_attempts)
            .field("attempt", &self.attempt)
            .field("slept_for", &self.slept_for)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl Retryer for NeverRetry {
    fn continue_or_propagate(&mut self, error: Error) -> Result<()> {
        Err(error)
    }

    fn clone_box(&self) -> Box<dyn Retryer> {
        Box::new(NeverRetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> std::result::Result<(), Interrupted> {
            self.sleeps.lock().unwrap().push(duration);
            Ok(())
        }
    }

    fn transient() -> Error {
        Error::retryable("connection reset", Method::GET, None, Some(Error::Timeout))
    }

    fn fixed_now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(10_000)
    }

    #[test]
    fn test_default_backoff_sequence() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut backoff = Backoff::default().with_sleeper(sleeper.clone());

        for _ in 0..4 {
            backoff.continue_or_propagate(transient()).unwrap();
        }
        let err = backoff.continue_or_propagate(transient()).unwrap_err();
        assert!(matches!(err, Error::Retryable { .. }));

        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(150),
                Duration::from_millis(225),
                Duration::from_micros(337_500),
            ]
        );
        assert_eq!(backoff.attempt(), 5);
        assert_eq!(backoff.slept_for(), Duration::from_micros(812_500));
    }

    #[test]
    fn test_intervals_are_monotonic_and_capped() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500), 10)
            .with_sleeper(sleeper.clone());

        while backoff.continue_or_propagate(transient()).is_ok() {}

        let sleeps = sleeper.sleeps.lock().unwrap();
        assert_eq!(sleeps.len(), 9);
        assert!(sleeps.windows(2).all(|w| w[0] <= w[1]));
        assert!(sleeps.iter().all(|d| *d <= Duration::from_millis(500)));
        assert_eq!(*sleeps.last().unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_after_is_honored_and_capped() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut backoff = Backoff::default()
            .with_sleeper(sleeper.clone())
            .with_clock(fixed_now);

        let soon = Error::retryable(
            "503",
            Method::GET,
            Some(fixed_now() + Duration::from_millis(400)),
            None,
        );
        backoff.continue_or_propagate(soon).unwrap();

        let late = Error::retryable(
            "503",
            Method::GET,
            Some(fixed_now() + Duration::from_secs(30)),
            None,
        );
        backoff.continue_or_propagate(late).unwrap();

        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_millis(400), Duration::from_secs(1)]
        );
    }

    #[test]
    fn test_elapsed_retry_after_retries_immediately() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut backoff = Backoff::default()
            .with_sleeper(sleeper.clone())
            .with_clock(fixed_now);

        let past = Error::retryable(
            "503",
            Method::GET,
            Some(fixed_now() - Duration::from_secs(5)),
            None,
        );
        backoff.continue_or_propagate(past).unwrap();

        assert!(sleeper.sleeps.lock().unwrap().is_empty());
        assert_eq!(backoff.attempt(), 2);
    }

    #[test]
    fn test_interrupt_propagates_the_failure() {
        let handle = InterruptHandle::new();
        let mut backoff = Backoff::new(Duration::from_secs(30), Duration::from_secs(30), 5)
            .with_sleeper(Arc::new(handle.clone()));

        let remote = handle.clone();
        let interrupter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.interrupt();
        });

        let err = backoff.continue_or_propagate(transient()).unwrap_err();
        interrupter.join().unwrap();

        assert!(matches!(err.into_cause(), Error::Timeout));
        assert!(handle.is_interrupted());
        assert_eq!(backoff.slept_for(), Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut backoff = Backoff::default()
            .with_sleeper(sleeper.clone())
            .with_jitter(true);
        backoff.continue_or_propagate(transient()).unwrap();

        let slept = sleeper.sleeps.lock().unwrap()[0];
        assert!(slept >= Duration::from_millis(50) && slept <= Duration::from_millis(100));
    }

    #[test]
    fn test_clones_do_not_share_attempts() {
        struct NoSleep;
        impl Sleeper for NoSleep {
            fn sleep(&self, _: Duration) -> std::result::Result<(), Interrupted> {
                Ok(())
            }
        }

        let prototype: Arc<dyn Retryer> =
            Arc::new(Backoff::default().with_sleeper(Arc::new(NoSleep)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let prototype = prototype.clone();
                std::thread::spawn(move || {
                    let mut retryer = prototype.clone_box();
                    let mut retries = 0;
                    while retryer.continue_or_propagate(transient()).is_ok() {
                        retries += 1;
                    }
                    retries
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 4);
        }
    }

    #[test]
    fn test_never_retry() {
        let mut retryer = NeverRetry;
        assert!(retryer.continue_or_propagate(transient()).is_err());
    }
}
