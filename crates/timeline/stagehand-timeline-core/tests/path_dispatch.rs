use approx::assert_abs_diff_eq;
use nalgebra::Point3;
use stagehand_injection::{
    AnimInjection, ClipData, DiagnosticCategory, Injector, InjectorConfig, Phase, PlayOutcome,
};
use stagehand_motion::{FollowerConfig, IntentOutcome, MotionError, PathFollower, PolylinePath};
use stagehand_timeline::{
    ClipLibrary, DispatchError, FollowerId, PathCommand, PathCommandMarker, PathCommandReceiver,
};

const FOLLOWER: FollowerId = FollowerId(0);

fn init_tracing() {
    let default_filter = "stagehand_timeline=debug";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn line(x: f32) -> PolylinePath {
    PolylinePath::new(vec![Point3::new(x, 0.0, 0.0), Point3::new(x, 0.0, 10.0)])
}

fn receiver() -> PathCommandReceiver {
    PathCommandReceiver::new()
        .with_follower(FOLLOWER)
        .with_paths(vec![line(0.0).into_ref(), line(5.0).into_ref()])
}

fn follower() -> PathFollower {
    PathFollower::new(FollowerConfig::default()).with_path(line(0.0).into_ref())
}

fn clips() -> ClipLibrary {
    [ClipData::new("wave", 1.0).into_ref()].into_iter().collect()
}

fn apply(
    rx: &PathCommandReceiver,
    marker: &PathCommandMarker,
    f: &mut PathFollower,
    injector: &mut Injector,
) -> Result<Option<IntentOutcome>, DispatchError> {
    rx.apply(
        FOLLOWER,
        marker,
        f,
        Some(injector as &mut dyn AnimInjection),
        &clips(),
    )
}

/// it should map every motion command onto the follower without touching the injector
#[test]
fn motion_commands_drive_the_follower() -> anyhow::Result<()> {
    init_tracing();
    let rx = receiver();
    let mut f = follower();
    let mut inj = Injector::new(InjectorConfig::default());

    apply(&rx, &PathCommandMarker::new(0.0, PathCommand::SetT).value(0.25), &mut f, &mut inj)?;
    assert_eq!(f.t(), 0.25);

    apply(&rx, &PathCommandMarker::new(0.0, PathCommand::Pause), &mut f, &mut inj)?;
    assert!(f.is_paused());
    apply(&rx, &PathCommandMarker::new(0.0, PathCommand::SetT).value(0.75), &mut f, &mut inj)?;
    assert_eq!(f.t(), 0.25);
    apply(&rx, &PathCommandMarker::new(0.0, PathCommand::WarpToT).value(0.5), &mut f, &mut inj)?;
    assert_eq!(f.t(), 0.5);
    apply(&rx, &PathCommandMarker::new(0.0, PathCommand::Resume), &mut f, &mut inj)?;
    assert!(!f.is_paused());

    apply(&rx, &PathCommandMarker::new(0.0, PathCommand::Stop), &mut f, &mut inj)?;
    assert!(f.is_stopped());
    apply(&rx, &PathCommandMarker::new(0.0, PathCommand::Unstop), &mut f, &mut inj)?;
    assert!(!f.is_stopped());

    let speed = PathCommandMarker::new(0.0, PathCommand::SetSpeedMultiplier).value(-3.0);
    apply(&rx, &speed, &mut f, &mut inj)?;
    assert_eq!(f.state().speed_multiplier, 0.0);

    assert_eq!(inj.phase(), Phase::Idle);
    Ok(())
}

/// it should hot-swap to the indexed path and re-pose at the marker value
#[test]
fn new_spline_swaps_path() -> anyhow::Result<()> {
    init_tracing();
    let rx = receiver();
    let mut f = follower();
    let mut inj = Injector::new(InjectorConfig::default());
    f.pause();

    let marker = PathCommandMarker::new(0.0, PathCommand::NewSpline)
        .path_index(1)
        .value(0.5);
    assert_eq!(apply(&rx, &marker, &mut f, &mut inj)?, None);
    assert_eq!(f.t(), 0.5);
    assert!(!f.is_paused());
    let pose = f.target().expect("target attached");
    assert_abs_diff_eq!(pose.position.x, 5.0, epsilon = 1e-5);
    assert_abs_diff_eq!(pose.position.z, 5.0, epsilon = 1e-5);
    Ok(())
}

/// it should refuse an out-of-range path index and keep the current path
#[test]
fn out_of_range_path_index_is_reported() {
    init_tracing();
    let rx = receiver();
    let mut f = follower();
    let mut inj = Injector::new(InjectorConfig::default());
    f.warp_to_normalized_t(0.3);

    let marker = PathCommandMarker::new(0.0, PathCommand::NewSpline).path_index(9);
    let err = apply(&rx, &marker, &mut f, &mut inj).unwrap_err();
    assert_eq!(err, DispatchError::PathIndexOutOfRange { index: 9, count: 2 });
    assert_eq!(err.category(), DiagnosticCategory::Unreachable);
    assert_eq!(f.t(), 0.3);
}

/// it should pause and start the marker's clip on the subject's injector
#[test]
fn pause_with_clip_injects() -> anyhow::Result<()> {
    init_tracing();
    let rx = receiver();
    let mut f = follower();
    let mut inj = Injector::new(InjectorConfig::default());

    let marker = PathCommandMarker::new(1.0, PathCommand::Pause).clip("wave");
    let outcome = apply(&rx, &marker, &mut f, &mut inj)?;
    assert!(matches!(
        outcome,
        Some(IntentOutcome::Played(PlayOutcome::Started(_)))
    ));
    assert!(f.is_paused());
    assert_eq!(inj.active_clip(), Some("wave"));

    let stop = PathCommandMarker::new(2.0, PathCommand::Resume).stop_injection(true);
    assert_eq!(apply(&rx, &stop, &mut f, &mut inj)?, Some(IntentOutcome::Stopped));
    assert!(!f.is_paused());
    assert!(inj.abort_requested());

    let idle_stop = apply(&rx, &stop, &mut f, &mut Injector::new(InjectorConfig::default()))?;
    assert_eq!(idle_stop, Some(IntentOutcome::NothingToStop));
    Ok(())
}

/// it should resume but refuse to both stop the injection and play a clip
#[test]
fn contradictory_resume_is_refused_after_resuming() {
    init_tracing();
    let rx = receiver();
    let mut f = follower();
    let mut inj = Injector::new(InjectorConfig::default());
    f.pause();

    let marker = PathCommandMarker::new(4.0, PathCommand::Resume)
        .clip("wave")
        .stop_injection(true);
    let err = apply(&rx, &marker, &mut f, &mut inj).unwrap_err();
    assert_eq!(
        err,
        DispatchError::Motion(MotionError::ContradictoryInjection {
            clip: "wave".to_string()
        })
    );
    assert_eq!(err.category(), DiagnosticCategory::InvalidRequest);
    assert_eq!(err.to_diagnostic().source, "dispatch");
    assert!(!f.is_paused());
    assert_eq!(inj.phase(), Phase::Idle);
}

/// it should still apply the motion part when the clip key is unknown
#[test]
fn unknown_clip_applies_motion_only() {
    init_tracing();
    let rx = receiver();
    let mut f = follower();
    let mut inj = Injector::new(InjectorConfig::default());

    let marker = PathCommandMarker::new(0.0, PathCommand::Stop).clip("missing");
    let err = apply(&rx, &marker, &mut f, &mut inj).unwrap_err();
    assert_eq!(
        err,
        DispatchError::UnknownClip {
            key: "missing".to_string()
        }
    );
    assert!(f.is_stopped());
    assert_eq!(inj.phase(), Phase::Idle);
}

/// it should ignore the clip key on commands that do not carry one
#[test]
fn clip_key_is_only_read_by_pause_resume_stop() -> anyhow::Result<()> {
    init_tracing();
    let rx = receiver();
    let mut f = follower();
    let mut inj = Injector::new(InjectorConfig::default());

    let marker = PathCommandMarker::new(0.0, PathCommand::WarpToT)
        .value(0.5)
        .clip("missing");
    assert_eq!(apply(&rx, &marker, &mut f, &mut inj)?, None);
    assert_eq!(f.t(), 0.5);
    Ok(())
}

/// it should report a clip request from a follower that animates no subject
#[test]
fn clip_without_injector_is_reported() {
    init_tracing();
    let rx = receiver();
    let mut f = follower();

    let marker = PathCommandMarker::new(0.0, PathCommand::Pause).clip("wave");
    let err = rx
        .apply(FOLLOWER, &marker, &mut f, None, &clips())
        .unwrap_err();
    assert_eq!(err, DispatchError::MissingInjector(FOLLOWER));
    assert!(f.is_paused());

    let plain = PathCommandMarker::new(0.0, PathCommand::Resume);
    assert_eq!(rx.apply(FOLLOWER, &plain, &mut f, None, &clips()), Ok(None));
}
