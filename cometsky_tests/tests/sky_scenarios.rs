//! End-to-end sky behaviour: mode toggles, gestures, edits, persistence.

use cometsky_shared::{persist::{load_records, save_records}, prelude::*};
use cometsky_tests::{comet_at, VIEW};

fn pinned_config() -> SkyConfig {
    SkyConfig {
        start_drifting: false,
        viewport_width: VIEW.width,
        viewport_height: VIEW.height,
        ..Default::default()
    }
}

#[test]
fn starting_to_drift_scatters_only_stationary_comets() {
    let mut sky = CometSky::with_seed(&pinned_config(), 42);
    let still: Vec<CometId> = ["a", "b", "c"]
        .iter()
        .map(|t| sky.submit(t, None).unwrap())
        .collect();
    let mover = sky.submit("d", None).unwrap();
    sky.release_drag(mover, Vec2::new(500.0, 400.0), Vec2::new(100.0, -200.0));
    let mover_velocity = sky.get(mover).unwrap().velocity;
    assert!(!mover_velocity.is_zero());

    sky.queue(SkyEvent::ModeChanged(SimMode::Drifting));
    sky.tick();

    for id in still {
        let v = sky.get(id).unwrap().velocity;
        assert!(!v.is_zero());
        assert!(v.x.abs() <= 0.25 && v.y.abs() <= 0.25, "velocity {v:?} out of range");
    }
    assert_eq!(sky.get(mover).unwrap().velocity, mover_velocity);
}

// Pinning keeps stored velocities (frozen, not cleared). This is the default
// policy; `PinPolicy::Clear` is the alternative reading of "pinned".
#[test]
fn pinned_means_frozen_by_default() {
    let mut sky = CometSky::with_seed(&SkyConfig::default(), 3);
    let id = sky.submit("drifter", None).unwrap();
    let v = sky.get(id).unwrap().velocity;

    sky.set_mode(SimMode::Pinned);
    let p = sky.get(id).unwrap().position;
    for _ in 0..10 {
        sky.tick();
    }
    assert_eq!(sky.get(id).unwrap().position, p);
    assert_eq!(sky.get(id).unwrap().velocity, v);

    sky.set_mode(SimMode::Drifting);
    sky.tick();
    assert_ne!(sky.get(id).unwrap().position, p);
}

#[test]
fn pinned_means_cleared_under_clear_policy() {
    let cfg = SkyConfig {
        pin_policy: PinPolicy::Clear,
        ..Default::default()
    };
    let mut sky = CometSky::with_seed(&cfg, 3);
    let id = sky.submit("drifter", None).unwrap();

    sky.set_mode(SimMode::Pinned);
    assert!(sky.get(id).unwrap().is_stationary());
}

#[test]
fn fling_then_drift_moves_by_injected_velocity() {
    let mut sky = CometSky::with_seed(&SkyConfig::default(), 8);
    let id = sky.submit("fling", None).unwrap();

    sky.queue(SkyEvent::DragReleased {
        id,
        position: Vec2::new(200.0, 200.0),
        release_velocity: Vec2::new(100.0, 0.0),
    });
    for _ in 0..10 {
        sky.tick();
    }
    let c = sky.get(id).unwrap();
    assert!((c.position.x - 203.0).abs() < 1e-3);
    assert_eq!(c.position.y, 200.0);
}

#[test]
fn edits_melts_and_clear_via_events() {
    let mut sky = CometSky::with_seed(&SkyConfig::default(), 1);
    let a = sky.submit("first", Some(CometColor::Green)).unwrap();
    let b = sky.submit("second", None).unwrap();
    sky.submit("third", None).unwrap();

    sky.queue(SkyEvent::Edited {
        id: a,
        text: "first, revised".into(),
    });
    sky.queue(SkyEvent::Melted { id: b });
    sky.tick();

    assert_eq!(sky.len(), 2);
    assert_eq!(sky.get(a).unwrap().text, "first, revised");
    assert!(sky.get(b).is_none());

    sky.queue(SkyEvent::Cleared);
    sky.queue(SkyEvent::Submitted {
        text: "after clear".into(),
        color: None,
    });
    sky.tick();
    assert_eq!(sky.len(), 1);
    assert_eq!(sky.comets()[0].text, "after clear");
}

#[test]
fn constellation_follows_motion() {
    let cfg = SkyConfig {
        viewport_width: VIEW.width,
        viewport_height: VIEW.height,
        ..Default::default()
    };
    let mut sky = CometSky::with_seed(&cfg, 2);
    let a = sky.submit("a", None).unwrap();
    let b = sky.submit("b", None).unwrap();
    sky.release_drag(a, Vec2::new(100.0, 100.0), Vec2::ZERO);
    sky.release_drag(b, Vec2::new(250.0, 100.0), Vec2::new(-1000.0, 0.0));
    assert!((sky.lines()[0].opacity - 0.25).abs() < 1e-6);

    for _ in 0..150 {
        sky.tick();
    }
    assert_eq!(sky.get(a).unwrap().position, Vec2::new(100.0, 100.0));
    let lines = sky.lines();
    assert_eq!(lines.len(), 1);
    assert!((lines[0].opacity - 1.0).abs() < 1e-4);
}

#[test]
fn saved_sky_restores_at_rest() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("comets.json");

    let mut sky = CometSky::with_seed(&SkyConfig::default(), 4);
    sky.submit("keep me", Some(CometColor::Amber))?;
    sky.submit("me too", None)?;
    for _ in 0..5 {
        sky.tick();
    }
    save_records(&path, &sky.records())?;

    let cfg = pinned_config();
    let restored = CometSky::restored(&cfg, load_records(&path)?);
    assert_eq!(restored.len(), 2);
    for (before, after) in sky.comets().iter().zip(restored.comets()) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.text, after.text);
        assert!(before.position.distance(after.position) < 1e-3);
        assert_eq!(before.color, after.color);
        assert!(after.is_stationary());
    }
    Ok(())
}

#[test]
fn stationary_comet_built_by_hand_is_untouched_by_sky_tick() {
    let mut sky = CometSky::with_seed(&SkyConfig::default(), 6);
    let record = cometsky_shared::persist::CometRecord::from(&comet_at(10.0, 10.0, 0.0, 0.0));
    sky.restore(vec![record]);
    for _ in 0..20 {
        sky.tick();
    }
    assert_eq!(sky.comets()[0].position, Vec2::new(10.0, 10.0));
}
