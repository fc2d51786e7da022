mod common;

use common::{Harness, DOC};
use ragepad_lib::config::ForceStopPolicy;
use ragepad_lib::error::PlayerError;
use ragepad_lib::lifecycle::{LifecycleState, RelaunchPolicy};
use ragepad_lib::spl::mutate::{move_category, rename_sound};
use ragepad_lib::spl::Soundlist;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

fn custom_tag(text: &str, player_index: usize) -> Option<String> {
    Soundlist::parse(text).definitions[player_index - 1]
        .attrs
        .get("customTag")
        .map(str::to_string)
}

#[tokio::test(start_paused = true)]
async fn stopped_player_is_edited_then_launched() {
    let h = Harness::new(false);
    let coordinator = h.coordinator();

    coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((rename_sound(text, 1, "Horn")?, ()))
        })
        .await
        .unwrap();

    assert_eq!(h.process.events(), vec!["launch"]);
    assert_eq!(custom_tag(&h.document(), 1).as_deref(), Some("Horn"));
    assert_eq!(coordinator.state(), LifecycleState::Ready);
}

#[tokio::test(start_paused = true)]
async fn running_player_is_stopped_before_the_edit() {
    let h = Harness::new(true);
    let coordinator = h.coordinator();
    let process = h.process.clone();

    coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            assert!(!process.running(), "edited while the player was running");
            Ok((rename_sound(text, 2, "Bro")?, ()))
        })
        .await
        .unwrap();

    assert_eq!(h.process.events(), vec!["stop", "launch"]);
    assert!(h.process.running());
}

#[tokio::test(start_paused = true)]
async fn stubborn_player_is_force_stopped_after_grace_window() {
    let h = Harness::new(true);
    h.process.ignores_graceful.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    let started = Instant::now();
    let was_running = coordinator.ensure_stopped().await.unwrap();

    assert!(was_running);
    assert!(started.elapsed() >= Duration::from_secs(6));
    assert!(started.elapsed() < Duration::from_secs(7));
    assert_eq!(h.process.events(), vec!["stop", "kill"]);
    assert_eq!(coordinator.state(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn survivor_of_force_stop_is_edited_anyway_by_default() {
    let h = Harness::new(true);
    h.process.ignores_graceful.store(true, Ordering::SeqCst);
    h.process.ignores_force.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    let started = Instant::now();
    assert!(coordinator.ensure_stopped().await.unwrap());
    assert!(started.elapsed() >= Duration::from_secs(9));
    assert_eq!(coordinator.state(), LifecycleState::AssumedStopped);
}

#[tokio::test(start_paused = true)]
async fn survivor_of_force_stop_fails_under_strict_policy() {
    let h = Harness::with_policy(true, ForceStopPolicy::Fail);
    h.process.ignores_graceful.store(true, Ordering::SeqCst);
    h.process.ignores_force.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    let result = coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((rename_sound(text, 1, "Never")?, ()))
        })
        .await;

    assert!(matches!(result, Err(PlayerError::ProcessTimeout(_))));
    assert_eq!(h.document(), DOC);
    assert_eq!(h.process.events(), vec!["stop", "kill"]);
}

#[tokio::test(start_paused = true)]
async fn failed_edit_still_relaunches_and_reports_the_edit_error() {
    let h = Harness::new(true);
    let coordinator = h.coordinator();

    let result = coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((rename_sound(text, 42, "Nope")?, ()))
        })
        .await;

    assert!(matches!(
        result,
        Err(PlayerError::IndexOutOfRange { index: 42, count: 3 })
    ));
    assert_eq!(h.process.events(), vec!["stop", "launch"]);
    assert!(h.process.running());
    assert_eq!(h.document(), DOC);
}

#[tokio::test(start_paused = true)]
async fn edit_error_wins_over_relaunch_error() {
    let h = Harness::new(false);
    h.process.launch_fails.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    let result = coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((move_category(text, "Missing", 0)?, ()))
        })
        .await;

    assert!(matches!(result, Err(PlayerError::NotFound { .. })));
    assert_eq!(h.process.events(), vec!["launch"]);
}

#[tokio::test(start_paused = true)]
async fn player_that_never_answers_times_out_after_the_edit() {
    let h = Harness::new(false);
    h.process.never_ready.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    let started = Instant::now();
    let result = coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((rename_sound(text, 3, "Kaboom")?, ()))
        })
        .await;

    assert!(matches!(result, Err(PlayerError::ProcessTimeout(_))));
    assert!(started.elapsed() >= Duration::from_secs(15));
    assert_eq!(coordinator.state(), LifecycleState::TimedOut);
    // The edit itself landed
    assert_eq!(custom_tag(&h.document(), 3).as_deref(), Some("Kaboom"));
}

#[tokio::test(start_paused = true)]
async fn if_was_running_leaves_a_stopped_player_stopped() {
    let h = Harness::new(false);
    let coordinator = h.coordinator();

    coordinator
        .with_player_stopped(RelaunchPolicy::IfWasRunning, |text| {
            Ok((rename_sound(text, 1, "Quiet")?, ()))
        })
        .await
        .unwrap();

    assert!(h.process.events().is_empty());
    assert_eq!(coordinator.state(), LifecycleState::Stopped);
    assert_eq!(custom_tag(&h.document(), 1).as_deref(), Some("Quiet"));
}

#[tokio::test(start_paused = true)]
async fn unchanged_document_is_not_rewritten() {
    let h = Harness::new(false);
    let coordinator = h.coordinator();
    let before = std::fs::metadata(&h.config.document_path)
        .unwrap()
        .modified()
        .unwrap();

    // Memes is already the last visible category
    coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((move_category(text, "Memes", 5)?, ()))
        })
        .await
        .unwrap();

    let after = std::fs::metadata(&h.config.document_path)
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(before, after);
    assert_eq!(h.document(), DOC);
}

#[tokio::test(start_paused = true)]
async fn overlapping_edits_run_one_after_another() {
    let h = Harness::new(true);
    let coordinator = h.coordinator();

    let first = coordinator.with_player_stopped(RelaunchPolicy::Always, |text| {
        Ok((rename_sound(text, 1, "First")?, ()))
    });
    let second = coordinator.with_player_stopped(RelaunchPolicy::Always, |text| {
        Ok((rename_sound(text, 2, "Second")?, ()))
    });
    let (a, b) = tokio::join!(first, second);
    a.unwrap();
    b.unwrap();

    let text = h.document();
    assert_eq!(custom_tag(&text, 1).as_deref(), Some("First"));
    assert_eq!(custom_tag(&text, 2).as_deref(), Some("Second"));
    assert_eq!(h.process.events(), vec!["stop", "launch", "stop", "launch"]);
}

#[tokio::test(start_paused = true)]
async fn start_launches_only_when_needed() {
    let h = Harness::new(true);
    let coordinator = h.coordinator();
    coordinator.start().await.unwrap();
    assert!(h.process.events().is_empty());
    assert_eq!(coordinator.state(), LifecycleState::Ready);

    let h = Harness::new(false);
    let coordinator = h.coordinator();
    coordinator.start().await.unwrap();
    assert_eq!(h.process.events(), vec!["launch"]);
}

#[tokio::test(start_paused = true)]
async fn unreadable_process_table_is_treated_as_running() {
    let h = Harness::with_policy(false, ForceStopPolicy::Fail);
    h.process.query_fails.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    let result = coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((rename_sound(text, 1, "Blind")?, ()))
        })
        .await;

    assert!(matches!(result, Err(PlayerError::ProcessTimeout(_))));
    assert_eq!(h.process.events(), vec!["stop", "kill"]);
    assert_eq!(h.document(), DOC);
}

#[tokio::test(start_paused = true)]
async fn start_reports_an_unreadable_process_table() {
    let h = Harness::new(false);
    h.process.query_fails.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    assert!(matches!(coordinator.start().await, Err(PlayerError::Io(_))));
    assert!(h.process.events().is_empty());
}
