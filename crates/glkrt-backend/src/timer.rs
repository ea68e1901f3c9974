#![forbid(unsafe_code)]

//! Background thread that posts timer signals at a fixed interval.

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use glkrt_core::RawSignal;

/// Shared stop flag the timer thread waits on.
#[derive(Clone)]
struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Wait for a stop or the timeout. Returns `true` if stopped.
    fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let Ok(stopped) = lock.lock() else {
            return true;
        };
        if *stopped {
            return true;
        }
        match cvar.wait_timeout_while(stopped, duration, |stopped| !*stopped) {
            Ok((stopped, _)) => *stopped,
            Err(_) => true,
        }
    }

    fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        if let Ok(mut stopped) = lock.lock() {
            *stopped = true;
        }
        cvar.notify_all();
    }
}

/// A running timer. Dropping it stops the thread without joining.
pub struct TimerThread {
    interval: Duration,
    stop: StopSignal,
    thread: Option<thread::JoinHandle<()>>,
}

impl TimerThread {
    /// Start posting [`RawSignal::timer`] to `sender` every `interval`.
    #[must_use]
    pub fn spawn(interval: Duration, sender: mpsc::Sender<RawSignal>) -> Self {
        let stop = StopSignal::new();
        let signal = stop.clone();
        let thread = thread::spawn(move || {
            loop {
                if signal.wait_timeout(interval) {
                    break;
                }
                if sender.send(RawSignal::timer()).is_err() {
                    break;
                }
            }
        });
        tracing::debug!(target: "glkrt.event", interval_ms = interval.as_millis() as u64, "timer started");
        Self {
            interval,
            stop,
            thread: Some(thread),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.stop.stop();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        tracing::debug!(target: "glkrt.event", "timer stopped");
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glkrt_core::EventType;

    #[test]
    fn timer_posts_signals_until_stopped() {
        let (tx, rx) = mpsc::channel();
        let timer = TimerThread::spawn(Duration::from_millis(5), tx);
        let first = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("timer fires");
        assert_eq!(first.kind, EventType::Timer);
        assert!(first.window.is_none());
        assert_eq!(timer.interval(), Duration::from_millis(5));
        timer.stop();
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn stop_signal_wakes_waiter() {
        let signal = StopSignal::new();
        let waiter = signal.clone();
        let handle = thread::spawn(move || waiter.wait_timeout(Duration::from_secs(10)));
        signal.stop();
        assert!(handle.join().expect("join"));
    }
}
