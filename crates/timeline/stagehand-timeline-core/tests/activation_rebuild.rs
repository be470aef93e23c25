use stagehand_timeline::{
    ActivationConfig, ActivationMarker, ActivationReceiver, ActivationSink, ActivationStates,
    ActivationTrack, Bindings, ContextId, DispatchError, PlayState, ScrubConfig, ScrubDriver,
    TargetId, TimeSample, Timeline, Track, TrackId,
};

const CTX: ContextId = ContextId(1);

fn init_tracing() {
    let default_filter = "stagehand_timeline=debug";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Track 1 is bound to target 10. Targets 20 and 30 are reached by reference, and
/// target 40 only through track 3's fallback reference.
fn fixture() -> anyhow::Result<(Timeline, Bindings)> {
    let timeline: Timeline = stagehand_test_fixtures::timelines::load("activation-scrub")?;
    let mut bindings = Bindings::new();
    bindings.bind_track(CTX, TrackId(1), TargetId(10));
    for target in [20, 30, 40] {
        bindings.register_target(CTX, TargetId(target));
    }
    Ok((timeline, bindings))
}

fn receiver() -> ActivationReceiver {
    ActivationReceiver::new(ActivationConfig::default(), Some(CTX))
}

/// Deliver every marker in `[0, time]` live, the way uninterrupted playback would.
fn play_to(
    timeline: &Timeline,
    time: f32,
    bindings: &Bindings,
    sink: &mut ActivationStates,
) -> ActivationReceiver {
    let mut rx = receiver();
    for addr in timeline.markers_in(None, time) {
        if let Some(stagehand_timeline::MarkerView::Activation { track, marker }) =
            timeline.marker(addr)
        {
            rx.on_notify(track, marker, PlayState::Playing, bindings, sink)
                .expect("every fixture marker resolves");
        }
    }
    rx
}

/// it should rebuild to the latest marker at or before the time, or the default before any
#[test]
fn rebuild_follows_marker_history() -> anyhow::Result<()> {
    init_tracing();
    let (tl, b) = fixture()?;
    let rx = receiver();
    let target = TargetId(10);
    assert_eq!(rx.plan_rebuild(&tl, 2.0, &b).get(&target), Some(&true));
    assert_eq!(rx.plan_rebuild(&tl, 5.0, &b).get(&target), Some(&false));
    assert_eq!(rx.plan_rebuild(&tl, 0.5, &b).get(&target), Some(&false));
    assert_eq!(rx.plan_rebuild(&tl, 3.0, &b).get(&target), Some(&false));

    let with_default = ActivationReceiver::new(
        ActivationConfig {
            default_active_when_no_marker: true,
            ..ActivationConfig::default()
        },
        Some(CTX),
    );
    assert_eq!(with_default.plan_rebuild(&tl, 0.5, &b).get(&target), Some(&true));
    Ok(())
}

/// it should give the later-authored marker the win when two share a time
#[test]
fn ties_go_to_later_authored_marker() -> anyhow::Result<()> {
    init_tracing();
    let (tl, b) = fixture()?;
    let rx = receiver();
    assert_eq!(rx.plan_rebuild(&tl, 1.9, &b).get(&TargetId(20)), Some(&false));
    assert_eq!(rx.plan_rebuild(&tl, 2.0, &b).get(&TargetId(20)), Some(&true));
    Ok(())
}

/// it should leave targets whose only markers opt out of scrub application untouched
#[test]
fn non_scrub_markers_are_excluded() -> anyhow::Result<()> {
    init_tracing();
    let (tl, b) = fixture()?;
    let mut rx = receiver();
    assert!(!rx.plan_rebuild(&tl, 5.0, &b).contains_key(&TargetId(30)));

    let mut sink = ActivationStates::new();
    sink.set_active(TargetId(30), true);
    let changes = rx.rebuild_to_time(&tl, 5.0, &b, &mut sink);
    assert!(changes.iter().all(|c| c.target != TargetId(30)));
    assert_eq!(sink.get(TargetId(30)), Some(true));
    Ok(())
}

/// it should fall back to the marker's reference when its track is unbound
#[test]
fn unbound_track_falls_back_to_reference() -> anyhow::Result<()> {
    init_tracing();
    let (tl, mut b) = fixture()?;
    let rx = receiver();
    let plan = rx.plan_rebuild(&tl, 4.0, &b);
    assert_eq!(plan.get(&TargetId(40)), Some(&true));

    b.forget_target(CTX, TargetId(40));
    assert!(!rx.plan_rebuild(&tl, 4.0, &b).contains_key(&TargetId(40)));

    b.bind_track(CTX, TrackId(3), TargetId(41));
    let plan = rx.plan_rebuild(&tl, 4.0, &b);
    assert_eq!(plan.get(&TargetId(41)), Some(&true));
    assert!(!plan.contains_key(&TargetId(40)));
    Ok(())
}

/// it should plan without side effects and rebuild to the same state from any prior state
#[test]
fn rebuild_is_pure_and_history_independent() -> anyhow::Result<()> {
    init_tracing();
    let (tl, b) = fixture()?;
    let mut rx = receiver();
    let first = rx.plan_rebuild(&tl, 2.5, &b);
    assert_eq!(first, rx.plan_rebuild(&tl, 2.5, &b));
    assert_eq!(rx.remembered_state(TargetId(10)), None);

    let mut all_on = ActivationStates::new();
    let mut all_off = ActivationStates::new();
    for target in [10, 20, 40] {
        all_on.set_active(TargetId(target), true);
        all_off.set_active(TargetId(target), false);
    }
    rx.rebuild_to_time(&tl, 5.0, &b, &mut all_on);
    rx.rebuild_to_time(&tl, 2.5, &b, &mut all_on);
    rx.rebuild_to_time(&tl, 2.5, &b, &mut all_off);
    for (target, active) in first {
        assert_eq!(all_on.get(target), Some(active), "target {target:?}");
        assert_eq!(all_off.get(target), Some(active), "target {target:?}");
    }
    Ok(())
}

/// it should agree with uninterrupted live playback at every sampled time
#[test]
fn rebuild_matches_live_playback() -> anyhow::Result<()> {
    init_tracing();
    let (tl, b) = fixture()?;
    let rx = receiver();
    for time in [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0] {
        let mut live = ActivationStates::new();
        for target in [10, 20, 40] {
            live.set_active(TargetId(target), false);
        }
        play_to(&tl, time, &b, &mut live);
        for (target, active) in rx.plan_rebuild(&tl, time, &b) {
            assert_eq!(live.get(target), Some(active), "target {target:?} at {time}");
        }
    }
    Ok(())
}

/// it should remember states set by sticky markers, live and on rebuild
#[test]
fn sticky_markers_are_remembered() -> anyhow::Result<()> {
    init_tracing();
    let (tl, b) = fixture()?;
    let mut sink = ActivationStates::new();
    let live = play_to(&tl, 4.0, &b, &mut sink);
    assert_eq!(live.remembered_state(TargetId(10)), Some(false));
    assert_eq!(live.remembered_state(TargetId(20)), Some(true));
    assert_eq!(live.remembered_state(TargetId(40)), None);

    let mut rx = receiver();
    rx.rebuild_to_time(&tl, 2.5, &b, &mut sink);
    assert_eq!(rx.remembered_state(TargetId(10)), Some(true));
    rx.rebuild_to_time(&tl, 5.0, &b, &mut sink);
    assert_eq!(rx.remembered_state(TargetId(10)), Some(false));
    assert_eq!(rx.remembered_state(TargetId(40)), None);
    Ok(())
}

/// it should apply live notifications while evaluating only when both sides allow it
#[test]
fn evaluating_notifications_are_gated() -> anyhow::Result<()> {
    init_tracing();
    let (_, b) = fixture()?;
    let track = TrackId(1);
    let marker = ActivationMarker::activate(1.0);
    let mut sink = ActivationStates::new();

    let mut rx = receiver();
    let change = rx.on_notify(track, &marker, PlayState::Evaluating, &b, &mut sink)?;
    assert_eq!(change.map(|c| c.active), Some(true));

    let opted_out = marker.clone().apply_during_scrub(false);
    let mut sink = ActivationStates::new();
    assert_eq!(
        rx.on_notify(track, &opted_out, PlayState::Evaluating, &b, &mut sink)?,
        None
    );
    assert!(rx
        .on_notify(track, &opted_out, PlayState::Playing, &b, &mut sink)?
        .is_some());

    let mut strict = ActivationReceiver::new(
        ActivationConfig {
            apply_during_scrub: false,
            ..ActivationConfig::default()
        },
        Some(CTX),
    );
    let mut sink = ActivationStates::new();
    assert_eq!(
        strict.on_notify(track, &marker, PlayState::Evaluating, &b, &mut sink)?,
        None
    );
    assert!(sink.is_empty());
    Ok(())
}

/// it should report a marker whose target cannot be resolved
#[test]
fn unresolved_target_is_an_error() -> anyhow::Result<()> {
    init_tracing();
    let (_, b) = fixture()?;
    let mut rx = receiver();
    let mut sink = ActivationStates::new();
    let marker = ActivationMarker::activate(2.0).targeting(TargetId(99));
    let err = rx
        .on_notify(TrackId(1), &marker, PlayState::Playing, &b, &mut sink)
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::TargetUnresolved {
            track: TrackId(1),
            time: 2.0
        }
    );
    assert!(sink.is_empty());
    Ok(())
}

/// it should rebuild only receivers bound to the scrubbed context that allow scrub
#[test]
fn scrub_driver_rebuilds_matching_receivers() {
    init_tracing();
    let tl = Timeline::new("scrub").with_track(Track::Activation(ActivationTrack {
        id: TrackId(1),
        markers: vec![ActivationMarker::activate(1.0)],
    }));
    let mut b = Bindings::new();
    b.bind_track(CTX, TrackId(1), TargetId(10));
    b.bind_track(ContextId(2), TrackId(1), TargetId(11));

    let mut receivers = vec![
        receiver(),
        ActivationReceiver::new(ActivationConfig::default(), Some(ContextId(2))),
        ActivationReceiver::new(
            ActivationConfig {
                apply_during_scrub: false,
                ..ActivationConfig::default()
            },
            Some(CTX),
        ),
    ];
    let mut driver = ScrubDriver::new(&ScrubConfig::default());
    let mut sink = ActivationStates::new();
    let at = TimeSample {
        context: CTX,
        time: 1.5,
    };

    let (sample, changes) = driver
        .tick(&at, &tl, &mut receivers, &b, &mut sink)
        .expect("first poll rebuilds");
    assert_eq!(sample, at);
    assert_eq!(changes.len(), 1);
    assert_eq!(sink.get(TargetId(10)), Some(true));
    assert_eq!(sink.get(TargetId(11)), None);

    assert!(driver.tick(&at, &tl, &mut receivers, &b, &mut sink).is_none());
}
