use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Tuning for a [`LockWatcher`].
#[derive(Clone, Copy, Debug)]
pub struct LockWatcherOptions {
    /// How often to probe the lock.
    pub check_interval: Duration,
    /// How long an acquisition may take before it is logged as stuck.
    pub log_timeout: Duration,
}

impl Default for LockWatcherOptions {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            log_timeout: Duration::from_secs(1),
        }
    }
}

/// Counters exposed by a [`LockWatcher`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockWatcherStats {
    pub num_rlock_timeouts: u64,
    pub num_wlock_timeouts: u64,
    pub waiting_for_rlock: bool,
    pub waiting_for_wlock: bool,
}

/// Periodic lock-liveness probe.
///
/// A background thread repeatedly try-acquires the watched reader/writer
/// lock in both modes and logs a warning when an acquisition exceeds the
/// configured timeout, which usually means some caller is sitting on the
/// lock. This is an operational diagnostic only: the store functions
/// identically without a watcher.
pub struct LockWatcher {
    stats: Arc<Mutex<LockWatcherStats>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LockWatcher {
    /// Spawn a watcher over `lock`.
    pub fn spawn<T: Send + Sync + 'static>(
        lock: Arc<RwLock<T>>,
        options: LockWatcherOptions,
    ) -> Self {
        let stats = Arc::new(Mutex::new(LockWatcherStats::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stats = Arc::clone(&stats);
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::Acquire) {
                sleep_until_stopped(options.check_interval, &thread_stop);
                if thread_stop.load(Ordering::Acquire) {
                    break;
                }
                probe_read(&lock, &options, &thread_stats);
                probe_write(&lock, &options, &thread_stats);
            }
        });
        Self {
            stats,
            stop,
            handle: Some(handle),
        }
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> LockWatcherStats {
        *self.stats.lock().expect("lock poisoned")
    }

    /// Ask the probe thread to stop. Idempotent; also done on drop.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

impl Drop for LockWatcher {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Sleep granularity for probe retries and stop checks.
const PROBE_STEP: Duration = Duration::from_millis(5);

fn sleep_until_stopped(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if stop.load(Ordering::Acquire) {
            return;
        }
        thread::sleep(PROBE_STEP.min(deadline - Instant::now()));
    }
}

fn probe_read<T>(
    lock: &RwLock<T>,
    options: &LockWatcherOptions,
    stats: &Mutex<LockWatcherStats>,
) {
    let deadline = Instant::now() + options.log_timeout;
    loop {
        if lock.try_read().is_ok() {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(PROBE_STEP);
    }
    {
        let mut s = stats.lock().expect("lock poisoned");
        s.num_rlock_timeouts += 1;
        s.waiting_for_rlock = true;
    }
    warn!(timeout = ?options.log_timeout, "timed out getting read lock");
    while lock.try_read().is_err() {
        thread::sleep(PROBE_STEP);
    }
    stats.lock().expect("lock poisoned").waiting_for_rlock = false;
    info!("eventually got read lock");
}

fn probe_write<T>(
    lock: &RwLock<T>,
    options: &LockWatcherOptions,
    stats: &Mutex<LockWatcherStats>,
) {
    // try_write only, so the probe never blocks future read lockers.
    let deadline = Instant::now() + options.log_timeout;
    loop {
        if lock.try_write().is_ok() {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(PROBE_STEP);
    }
    {
        let mut s = stats.lock().expect("lock poisoned");
        s.num_wlock_timeouts += 1;
        s.waiting_for_wlock = true;
    }
    warn!(timeout = ?options.log_timeout, "timed out getting write lock");
    while lock.try_write().is_err() {
        thread::sleep(PROBE_STEP);
    }
    stats.lock().expect("lock poisoned").waiting_for_wlock = false;
    info!("eventually got write lock");
}
