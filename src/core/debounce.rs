//! One-shot notification debouncer.
//!
//! Background caching can insert dozens of frames per second; listeners only
//! need to hear about it once per interval. The first `trigger()` arms a timer,
//! further triggers while armed are dropped, and when the timer runs out the
//! callback fires once and the debouncer disarms.
//!
//! Unlike a resetting debounce, later triggers do not push the deadline back:
//! a steady stream of insertions still produces one notification per interval.
//!
//! The timer runs on its own thread, independent of any UI loop.

use crossbeam_channel::{after, bounded, select, Sender};
use log::trace;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct Debouncer {
    interval: Duration,
    armed: Arc<AtomicBool>,
    arm_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("interval", &self.interval)
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl Debouncer {
    /// Create a debouncer that calls `on_fire` at most once per `interval`.
    pub fn new<F>(interval: Duration, on_fire: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let armed = Arc::new(AtomicBool::new(false));
        let (arm_tx, arm_rx) = bounded::<()>(1);

        let timer_armed = Arc::clone(&armed);
        let handle = thread::Builder::new()
            .name("framecmp-debounce".into())
            .spawn(move || {
                while arm_rx.recv().is_ok() {
                    let timer = after(interval);
                    select! {
                        recv(timer) -> _ => {
                            timer_armed.store(false, Ordering::Release);
                            trace!("Debouncer fired after {}ms", interval.as_millis());
                            on_fire();
                        }
                        recv(arm_rx) -> msg => {
                            // Owner dropped while armed: exit without firing
                            if msg.is_err() {
                                break;
                            }
                        }
                    }
                }
            })
            .expect("Failed to spawn debounce thread");

        Self {
            interval,
            armed,
            arm_tx: Some(arm_tx),
            handle: Some(handle),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the timer unless it is already running. Returns true if this call armed it.
    pub fn trigger(&self) -> bool {
        if self
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if let Some(tx) = &self.arm_tx {
            let _ = tx.send(());
        }
        true
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        // Closing the channel stops the timer thread
        self.arm_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(interval_ms: u64) -> (Debouncer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let debouncer = Debouncer::new(Duration::from_millis(interval_ms), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (debouncer, count)
    }

    #[test]
    fn test_no_trigger_no_fire() {
        let (_debouncer, count) = counting(10);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_burst_fires_once() {
        let (debouncer, count) = counting(50);
        assert!(debouncer.trigger());
        assert!(!debouncer.trigger());
        assert!(!debouncer.trigger());
        assert!(debouncer.is_armed());

        thread::sleep(Duration::from_millis(250));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_armed());
    }

    #[test]
    fn test_rearms_after_fire() {
        let (debouncer, count) = counting(20);
        debouncer.trigger();
        thread::sleep(Duration::from_millis(150));
        assert!(debouncer.trigger());
        thread::sleep(Duration::from_millis(150));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_while_armed() {
        let (debouncer, count) = counting(10_000);
        debouncer.trigger();
        drop(debouncer);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
