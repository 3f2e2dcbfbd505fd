//! # Run Loop
//!
//! A coarse polling loop: wake every `poll_seconds`, redraw when the refresh
//! interval has elapsed, go back to sleep. One build at a time, no overlap.
//!
//! Failures never stop the loop. A failed build or a sink error is logged,
//! the status indicator turns to [`Status::Error`], and the next poll tries
//! again.

use std::thread;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::ScheduleConfig;
use crate::dashboard::{BuildError, Dashboard};
use crate::display::{DisplayError, DisplaySink, Status, StatusIndicator};

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("display failed: {0}")]
    Display(#[from] DisplayError),
}

/// Decides when the next redraw is due.
#[derive(Clone, Debug)]
pub struct RefreshSchedule {
    interval: Duration,
    last_drawn: Option<DateTime<Utc>>,
}

impl RefreshSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_drawn: None,
        }
    }

    /// Due when nothing has been drawn yet or `interval` has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_drawn {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_drawn = Some(now);
    }

    pub fn last_drawn(&self) -> Option<DateTime<Utc>> {
        self.last_drawn
    }
}

pub struct Runner {
    dashboard: Box<dyn Dashboard>,
    sink: Box<dyn DisplaySink>,
    indicator: Box<dyn StatusIndicator>,
    schedule: RefreshSchedule,
    poll: std::time::Duration,
    clear_first: bool,
}

impl Runner {
    pub fn new(
        dashboard: Box<dyn Dashboard>,
        sink: Box<dyn DisplaySink>,
        indicator: Box<dyn StatusIndicator>,
        schedule: &ScheduleConfig,
    ) -> Self {
        Self {
            dashboard,
            sink,
            indicator,
            schedule: RefreshSchedule::new(Duration::minutes(schedule.update_interval_minutes)),
            poll: std::time::Duration::from_secs(schedule.poll_seconds),
            clear_first: schedule.clear_before_display,
        }
    }

    pub fn schedule(&self) -> &RefreshSchedule {
        &self.schedule
    }

    /// Build one frame and push it to the sink.
    pub fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<(), CycleError> {
        self.indicator.set(Status::Busy);
        match self.draw() {
            Ok(()) => {
                self.schedule.mark(now);
                self.indicator.set(Status::Idle);
                Ok(())
            }
            Err(e) => {
                tracing::error!(dashboard = self.dashboard.name(), error = %e, "refresh failed");
                self.indicator.set(Status::Error);
                Err(e)
            }
        }
    }

    /// Run a cycle if one is due. Returns whether a redraw was attempted.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if !self.schedule.is_due(now) {
            return false;
        }
        // Errors are already logged and shown on the indicator
        let _ = self.run_cycle(now);
        true
    }

    pub fn run_forever(&mut self) -> ! {
        tracing::info!(
            dashboard = self.dashboard.name(),
            poll_seconds = self.poll.as_secs(),
            "entering refresh loop"
        );
        loop {
            self.tick(Utc::now());
            thread::sleep(self.poll);
        }
    }

    fn draw(&mut self) -> Result<(), CycleError> {
        tracing::info!(dashboard = self.dashboard.name(), "building frame");
        let frame = self.dashboard.build_images()?;
        self.sink.init()?;
        if self.clear_first {
            self.sink.clear()?;
        }
        self.sink.display(&frame.primary, &frame.accent)?;
        self.sink.sleep()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::LayerPair;
    use crate::raster::{LayerError, RasterLayer, BLACK};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct CountingDashboard {
        builds: Rc<Cell<usize>>,
        fail: bool,
    }

    impl Dashboard for CountingDashboard {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn build_images(&mut self) -> Result<LayerPair, BuildError> {
            self.builds.set(self.builds.get() + 1);
            if self.fail {
                return Err(LayerError::DimensionMismatch {
                    left: (1, 1),
                    right: (2, 2),
                }
                .into());
            }
            Ok(LayerPair::masked(RasterLayer::filled(4, 4, BLACK), RasterLayer::new(4, 4))?)
        }
    }

    struct RecordingSink {
        frames: Rc<RefCell<Vec<usize>>>,
        calls: Rc<RefCell<Vec<&'static str>>>,
        fail: bool,
    }

    impl DisplaySink for RecordingSink {
        fn init(&mut self) -> Result<(), DisplayError> {
            self.calls.borrow_mut().push("init");
            Ok(())
        }

        fn clear(&mut self) -> Result<(), DisplayError> {
            self.calls.borrow_mut().push("clear");
            Ok(())
        }

        fn display(&mut self, primary: &RasterLayer, _accent: &RasterLayer) -> Result<(), DisplayError> {
            self.calls.borrow_mut().push("display");
            if self.fail {
                return Err(DisplayError::Device("panel busy".into()));
            }
            self.frames.borrow_mut().push(primary.ink_count());
            Ok(())
        }

        fn sleep(&mut self) -> Result<(), DisplayError> {
            self.calls.borrow_mut().push("sleep");
            Ok(())
        }
    }

    struct SharedIndicator(Rc<RefCell<Vec<Status>>>);

    impl StatusIndicator for SharedIndicator {
        fn set(&mut self, status: Status) {
            self.0.borrow_mut().push(status);
        }
    }

    struct Harness {
        runner: Runner,
        builds: Rc<Cell<usize>>,
        frames: Rc<RefCell<Vec<usize>>>,
        calls: Rc<RefCell<Vec<&'static str>>>,
        statuses: Rc<RefCell<Vec<Status>>>,
    }

    fn harness(build_fails: bool, sink_fails: bool) -> Harness {
        harness_with_clear(build_fails, sink_fails, true)
    }

    fn harness_with_clear(build_fails: bool, sink_fails: bool, clear: bool) -> Harness {
        let builds = Rc::new(Cell::new(0));
        let frames = Rc::new(RefCell::new(Vec::new()));
        let calls = Rc::new(RefCell::new(Vec::new()));
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let runner = Runner::new(
            Box::new(CountingDashboard {
                builds: builds.clone(),
                fail: build_fails,
            }),
            Box::new(RecordingSink {
                frames: frames.clone(),
                calls: calls.clone(),
                fail: sink_fails,
            }),
            Box::new(SharedIndicator(statuses.clone())),
            &ScheduleConfig {
                update_interval_minutes: 10,
                poll_seconds: 30,
                clear_before_display: clear,
            },
        );
        Harness {
            runner,
            builds,
            frames,
            calls,
            statuses,
        }
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-05T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    #[test]
    fn schedule_is_due_until_first_draw_then_after_interval() {
        let mut schedule = RefreshSchedule::new(Duration::minutes(10));
        assert!(schedule.is_due(at(0)));
        schedule.mark(at(0));
        assert!(!schedule.is_due(at(9)));
        assert!(schedule.is_due(at(10)));
    }

    #[test]
    fn tick_redraws_only_when_due() {
        let mut h = harness(false, false);
        assert!(h.runner.tick(at(0)));
        assert!(!h.runner.tick(at(5)));
        assert!(h.runner.tick(at(11)));
        assert_eq!(h.builds.get(), 2);
        assert_eq!(h.frames.borrow().as_slice(), [16, 16]);
        assert_eq!(h.statuses.borrow().last(), Some(&Status::Idle));
    }

    #[test]
    fn sink_failure_sets_error_and_retries_next_poll() {
        let mut h = harness(false, true);
        assert!(h.runner.tick(at(0)));
        assert_eq!(h.statuses.borrow().as_slice(), [Status::Busy, Status::Error]);
        assert!(h.runner.schedule().last_drawn().is_none());
        // Still due on the next poll
        assert!(h.runner.tick(at(1)));
        assert_eq!(h.builds.get(), 2);
    }

    #[test]
    fn build_failure_is_reported() {
        let mut h = harness(true, false);
        let err = h.runner.run_cycle(at(0)).unwrap_err();
        assert!(matches!(err, CycleError::Build(_)));
        assert!(h.frames.borrow().is_empty());
        assert_eq!(h.statuses.borrow().last(), Some(&Status::Error));
    }

    #[test]
    fn panel_is_cleared_between_wake_and_draw() {
        let mut h = harness_with_clear(false, false, true);
        h.runner.run_cycle(at(0)).unwrap();
        assert_eq!(h.calls.borrow().as_slice(), ["init", "clear", "display", "sleep"]);
    }

    #[test]
    fn clearing_can_be_turned_off() {
        let mut h = harness_with_clear(false, false, false);
        h.runner.run_cycle(at(0)).unwrap();
        assert_eq!(h.calls.borrow().as_slice(), ["init", "display", "sleep"]);
    }
}
