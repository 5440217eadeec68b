mod common;

use common::Scored;
use geneforge::algorithm::{AlgorithmController, AlgorithmHooks, AlgorithmState, Observer};
use geneforge::error::{GfError, GfResult};
use geneforge::operators::stop::GenerationLimit;
use geneforge::population::Statistics;
use parking_lot::Mutex;
use rstest::rstest;
use std::sync::Arc;

#[derive(Default)]
struct RecordingHooks {
    calls: Mutex<Vec<&'static str>>,
    fail: Mutex<Option<&'static str>>,
}

impl RecordingHooks {
    fn record(&self, hook: &'static str) -> GfResult<()> {
        self.calls.lock().push(hook);
        if *self.fail.lock() == Some(hook) {
            return Err(GfError::Hook {
                hook,
                reason: "rejected by test".into(),
            });
        }
        Ok(())
    }

    fn take(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.calls.lock())
    }
}

impl AlgorithmHooks for RecordingHooks {
    fn initialize(&self) -> GfResult<()> {
        self.record("initialize")
    }
    fn on_start(&self) -> GfResult<()> {
        self.record("on_start")
    }
    fn on_resume(&self) -> GfResult<()> {
        self.record("on_resume")
    }
    fn on_pause(&self) -> GfResult<()> {
        self.record("on_pause")
    }
    fn on_stop(&self) -> GfResult<()> {
        self.record("on_stop")
    }
}

#[derive(Default)]
struct StateLog(Mutex<Vec<AlgorithmState>>);

impl Observer<Scored> for StateLog {
    fn on_state_changed(&self, state: AlgorithmState, _: &AlgorithmController<Scored>) {
        self.0.lock().push(state);
    }
}

fn setup() -> (AlgorithmController<Scored>, RecordingHooks, Arc<StateLog>) {
    let ctl = AlgorithmController::new();
    let log = Arc::new(StateLog::default());
    ctl.observers().subscribe(log.clone());
    (ctl, RecordingHooks::default(), log)
}

#[test]
fn test_lifecycle_walkthrough() {
    let (ctl, hooks, log) = setup();
    assert_eq!(ctl.state(), AlgorithmState::Uninitialized);

    assert!(!ctl.stop_solving(&hooks).unwrap());
    assert!(hooks.take().is_empty());
    assert!(log.0.lock().is_empty());

    assert!(ctl.start_solving(&hooks, false).unwrap());
    assert_eq!(hooks.take(), vec!["initialize", "on_start"]);
    assert_eq!(ctl.state(), AlgorithmState::Running);

    assert!(ctl.pause_solving(&hooks).unwrap());
    assert_eq!(hooks.take(), vec!["on_pause"]);
    assert_eq!(ctl.state(), AlgorithmState::Paused);

    assert!(ctl.start_solving(&hooks, true).unwrap());
    assert_eq!(hooks.take(), vec!["on_resume"]);
    assert_eq!(ctl.state(), AlgorithmState::Running);

    assert_eq!(
        *log.0.lock(),
        vec![
            AlgorithmState::Running,
            AlgorithmState::Paused,
            AlgorithmState::Running
        ]
    );
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_continue_start_skips_initialize(#[case] stopped_first: bool) {
    let (ctl, hooks, log) = setup();
    if stopped_first {
        ctl.start_solving(&hooks, false).unwrap();
        ctl.stop_solving(&hooks).unwrap();
        hooks.take();
    }
    let notified = log.0.lock().len();

    assert!(ctl.start_solving(&hooks, true).unwrap());
    assert_eq!(hooks.take(), vec!["on_start"]);
    assert_eq!(ctl.state(), AlgorithmState::Running);
    assert_eq!(log.0.lock().len(), notified + 1);
    assert_eq!(log.0.lock().last(), Some(&AlgorithmState::Running));
}

#[rstest]
#[case(AlgorithmState::Running, false)]
#[case(AlgorithmState::Running, true)]
#[case(AlgorithmState::Paused, false)]
fn test_invalid_start_is_silent(#[case] from: AlgorithmState, #[case] continue_from_saved: bool) {
    let (ctl, hooks, log) = setup();
    match from {
        AlgorithmState::Running => {
            ctl.start_solving(&hooks, false).unwrap();
        }
        AlgorithmState::Paused => {
            ctl.start_solving(&hooks, false).unwrap();
            ctl.pause_solving(&hooks).unwrap();
        }
        _ => {}
    }
    hooks.take();
    let notified = log.0.lock().len();

    assert!(!ctl.start_solving(&hooks, continue_from_saved).unwrap());
    assert_eq!(ctl.state(), from);
    assert!(hooks.take().is_empty());
    assert_eq!(log.0.lock().len(), notified);
}

#[test]
fn test_failed_hook_restores_state_without_notifying() {
    let (ctl, hooks, log) = setup();
    ctl.start_solving(&hooks, false).unwrap();
    *hooks.fail.lock() = Some("on_pause");

    let err = ctl.pause_solving(&hooks).unwrap_err();
    assert!(matches!(err, GfError::Hook { hook: "on_pause", .. }));
    assert_eq!(ctl.state(), AlgorithmState::Running);
    assert_eq!(*log.0.lock(), vec![AlgorithmState::Running]);

    *hooks.fail.lock() = Some("initialize");
    ctl.stop_solving(&hooks).unwrap();
    assert!(ctl.start_solving(&hooks, false).is_err());
    assert_eq!(ctl.state(), AlgorithmState::UserStopped);
}

#[test]
fn test_criteria_stop_then_restart_or_resume() {
    let (ctl, hooks, log) = setup();
    ctl.set_stop_criteria(Some(Arc::new(GenerationLimit { limit: 3 })));
    ctl.start_solving(&hooks, false).unwrap();

    let mut stats = Statistics::default();
    stats.generation = 2;
    assert!(!ctl.check_stop_criteria(&stats));
    assert_eq!(ctl.state(), AlgorithmState::Running);

    stats.generation = 3;
    assert!(ctl.check_stop_criteria(&stats));
    assert_eq!(ctl.state(), AlgorithmState::CriteriaStopped);
    // Already stopped: the predicate still reports, nothing is notified twice.
    assert!(ctl.check_stop_criteria(&stats));
    assert_eq!(
        log.0
            .lock()
            .iter()
            .filter(|s| **s == AlgorithmState::CriteriaStopped)
            .count(),
        1
    );

    hooks.take();
    assert!(ctl.start_solving(&hooks, true).unwrap());
    assert_eq!(hooks.take(), vec!["on_resume"]);

    ctl.stop_solving(&hooks).unwrap();
    hooks.take();
    assert!(ctl.start_solving(&hooks, false).unwrap());
    assert_eq!(hooks.take(), vec!["initialize", "on_start"]);
}
