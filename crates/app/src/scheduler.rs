//! Frame rendering worker.

use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use anyhow::Context;
use ledscene_core::types::StripId;

use crate::{driver::StripDriver, registry::Registry, render::render_frame, state::DeviceState};

/// Print the rendering statistics every this many frames.
const STATS_PERIOD: usize = 10_000;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs the body at a fixed period until it breaks.
///
/// Sleeps for the remainder of the period after each iteration, an overrun
/// iteration is followed by the next one immediately.
pub fn run_periodic<F>(period: Duration, mut body: F)
where
    F: FnMut() -> ControlFlow<()>,
{
    loop {
        let started = Instant::now();
        if body().is_break() {
            break;
        }

        if let Some(remaining) = period.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Suspended,
    Stopped,
}

struct Shared<D> {
    /// Held for the whole duration of a frame.
    driver: Mutex<D>,
    run_state: Mutex<RunState>,
    wakeup: Condvar,
    frames: AtomicU64,
}

impl<D> Shared<D> {
    fn run_state(&self) -> RunState {
        *lock(&self.run_state)
    }

    fn set_run_state(&self, state: RunState) {
        *lock(&self.run_state) = state;
        self.wakeup.notify_all();
    }

    /// Blocks while suspended, returns false once stopped.
    fn wait_for_work(&self) -> bool {
        let mut state = lock(&self.run_state);
        while *state == RunState::Suspended {
            state = self
                .wakeup
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *state == RunState::Running
    }
}

/// Handle to the rendering worker thread.
///
/// The worker renders the selected scene once per period while running. The
/// worker thread is stopped and joined when the handle is dropped.
pub struct Scheduler<D: StripDriver> {
    shared: Arc<Shared<D>>,
    worker: Option<JoinHandle<()>>,
}

impl<D: StripDriver> Scheduler<D> {
    /// Spawns the rendering worker.
    pub fn start(
        driver: D,
        registry: Arc<Mutex<Registry>>,
        state: Arc<DeviceState>,
        period: Duration,
        running: bool,
    ) -> anyhow::Result<Self> {
        let shared = Arc::new(Shared {
            driver: Mutex::new(driver),
            run_state: Mutex::new(if running {
                RunState::Running
            } else {
                RunState::Suspended
            }),
            wakeup: Condvar::new(),
            frames: AtomicU64::new(0),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("rendering".to_owned())
            .spawn(move || render_loop(&worker_shared, &registry, &state, period))
            .context("Unable to spawn rendering thread")?;

        log::info!(
            "Rendering started with {}ms period",
            period.as_secs_f32() * 1_000_f32
        );
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Parks the worker.
    ///
    /// Returns after the frame in flight, if any, has been shown.
    pub fn suspend(&self) {
        if self.shared.run_state() == RunState::Running {
            log::debug!("Suspending rendering");
            self.shared.set_run_state(RunState::Suspended);
        }
        drop(lock(&self.shared.driver));
    }

    /// Wakes the worker up.
    pub fn resume(&self) {
        if self.shared.run_state() == RunState::Suspended {
            log::debug!("Resuming rendering");
            self.shared.set_run_state(RunState::Running);
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.run_state() == RunState::Running
    }

    /// Pushes the power state of the given strips to the driver.
    pub fn apply_power(&self, power: impl IntoIterator<Item = (StripId, bool)>) {
        let mut driver = lock(&self.shared.driver);
        for (strip, enabled) in power {
            driver.set_power(strip, enabled);
        }
    }

    /// Runs the closure with exclusive access to the driver, no frame is
    /// rendered meanwhile.
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut lock(&self.shared.driver))
    }

    /// Total number of rendered frames.
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }
}

impl<D: StripDriver> Drop for Scheduler<D> {
    fn drop(&mut self) {
        self.shared.set_run_state(RunState::Stopped);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Rendering thread panicked");
            }
        }
    }
}

fn render_loop<D: StripDriver>(
    shared: &Shared<D>,
    registry: &Mutex<Registry>,
    state: &DeviceState,
    period: Duration,
) {
    let mut stats = RenderingStats::new(period);
    run_periodic(period, || {
        if !shared.wait_for_work() {
            return ControlFlow::Break(());
        }

        let started = Instant::now();
        {
            let mut driver = lock(&shared.driver);
            // Suspension might have happened while waiting for the driver.
            if shared.run_state() != RunState::Running {
                return ControlFlow::Continue(());
            }

            let batch = render_frame(&mut lock(registry));
            driver.set_brightness(state.brightness());
            for (strip, enabled) in &batch.power {
                driver.set_power(*strip, *enabled);
            }
            if let Err(err) = driver.show(&batch.frames) {
                log::error!("Unable to show frame: {err:?}");
            }
        }
        shared.frames.fetch_add(1, Ordering::Relaxed);

        stats.update(started.elapsed());
        if stats.total_frames % STATS_PERIOD == 0 {
            stats.show();
        }
        ControlFlow::Continue(())
    });

    log::info!("Rendering finished");
    if stats.total_frames > 0 {
        stats.show();
    }
}

#[derive(Default)]
struct RenderingStats {
    period: Duration,

    total_frames: usize,
    laggy_frames: usize,
    max_rendering_time: Duration,
    total_rendering_time: Duration,
}

impl RenderingStats {
    fn new(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    fn show(&self) {
        log::info!("Print statistics snapshot");
        log::info!(
            "-> Laggy frames {} of {} [{}%]",
            self.laggy_frames,
            self.total_frames,
            (self.laggy_frames as f64 / self.total_frames as f64 * 100_f64)
        );
        log::info!(
            "-> Max frame rendering duration is {}ms",
            self.max_rendering_time.as_secs_f32() * 1_000_f32
        );

        let average_rendering_time = self.total_rendering_time / self.total_frames as u32;
        log::info!(
            "-> Average frame rendering duration is {}ms",
            average_rendering_time.as_secs_f32() * 1_000_f32
        );
    }

    fn update(&mut self, rendering_time: Duration) {
        self.total_frames += 1;
        self.max_rendering_time = std::cmp::max(self.max_rendering_time, rendering_time);
        self.total_rendering_time += rendering_time;
        if rendering_time > self.period {
            self.laggy_frames += 1;
        }
    }
}
