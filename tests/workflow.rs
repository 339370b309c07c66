use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use offside_review::adjustment::UpdatePayload;
use offside_review::decision::{Decision, DecisionAction, SaveStatus};
use offside_review::detection::{DetectionSnapshot, Team, parse_detection_json};
use offside_review::error::{ApiError, Rejection};
use offside_review::pitch::PitchImage;
use offside_review::state::{
    CLASSIFY_ERROR, Command, DECISION_SAVED, Delta, PROCESSING_ERROR, ReviewState, RunAction,
    Screen, UPDATE_SUCCESS, apply_delta,
};
use offside_review::upload::ImageSelection;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_snapshot() -> DetectionSnapshot {
    parse_detection_json(&read_fixture("detection.json")).expect("fixture should parse")
}

fn pitch() -> PitchImage {
    PitchImage {
        path: PathBuf::from("/tmp/pitch-0001.png"),
        content_type: "image/png".to_string(),
        format: Some("Png".to_string()),
        dimensions: Some((1200, 700)),
        size: 2048,
    }
}

fn with_image() -> ReviewState {
    let mut state = ReviewState::default();
    state.image = Some(ImageSelection::from_bytes("frame.jpg", vec![0xFF, 0xD8, 0xFF]).unwrap());
    state
}

/// A state that has finished one detection round.
fn reviewed() -> ReviewState {
    let mut state = with_image();
    state.submit_upload(Instant::now()).unwrap();
    apply_delta(&mut state, Delta::SnapshotReplaced(fixture_snapshot()));
    apply_delta(&mut state, Delta::PitchRendered(pitch()));
    state
}

/// A state whose classification request has come back with `decision`.
fn classified(decision: Decision) -> ReviewState {
    let mut state = classifying();
    apply_delta(
        &mut state,
        Delta::OffsideClassified {
            redirect_url: "/offside/results/12/".to_string(),
            algorithm_decision: decision,
        },
    );
    state
}

/// A state waiting on the classification endpoint.
fn classifying() -> ReviewState {
    let mut state = reviewed();
    state.request_offside().unwrap();
    state.assign_defending_team(Team::A).unwrap();
    assert!(state.classify_in_flight);
    state
}

fn has_toast(state: &ReviewState, message: &str) -> bool {
    state
        .notifications
        .visible(Instant::now())
        .any(|(toast, _)| toast.message == message)
}

#[test]
fn submit_without_image_alerts() {
    let mut state = ReviewState::default();
    let result = state.submit_upload(Instant::now());
    assert_eq!(result, Err(Rejection::NoImageSelected));
    assert_eq!(state.notifications.current_alert(), Some("Please select an image."));
    assert!(state.picker_visible);
    assert!(!state.detection_in_flight);
}

#[test]
fn submit_starts_single_detection() {
    let mut state = with_image();
    let command = state.submit_upload(Instant::now()).unwrap();
    match command {
        Command::Detect(form) => {
            assert_eq!(form.file_name, "frame.jpg");
            assert_eq!(form.mime, "image/jpeg");
            assert_eq!(form.confidence, None);
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert!(!state.picker_visible);
    assert_eq!(state.run_action, RunAction::InProgress);
    assert!(state.progress.is_visible());

    let second = state.run_detection(None, false, Instant::now());
    assert_eq!(second, Err(Rejection::DetectionInFlight));
}

#[test]
fn detection_round_shows_review() {
    let state = reviewed();
    assert_eq!(state.screen, Screen::Review);
    assert!(state.pitch_visible);
    assert!(state.adjustments_open);
    assert!(!state.detection_in_flight);
    assert!(!state.progress.is_visible());
    assert_eq!(state.progress.percent(), 100);
    assert_eq!(state.run_action, RunAction::Hidden);
    assert_eq!(state.snapshot.as_ref().map(|s| s.player_count()), Some(4));
}

#[test]
fn detection_failure_returns_to_picker() {
    let mut state = with_image();
    state.submit_upload(Instant::now()).unwrap();
    apply_delta(
        &mut state,
        Delta::DetectionFailed(ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        }),
    );
    assert_eq!(state.screen, Screen::Picker);
    assert!(state.picker_visible);
    assert!(!state.detection_in_flight);
    assert_eq!(state.run_action, RunAction::Idle);
    assert_eq!(state.notifications.current_alert(), Some(PROCESSING_ERROR));
}

#[test]
fn rerun_at_default_confidence_is_rejected() {
    let mut state = reviewed();
    let result = state.request_rerun(Instant::now());
    assert_eq!(result, Err(Rejection::DefaultConfidence));
    assert_eq!(
        state.notifications.current_alert(),
        Some(Rejection::DefaultConfidence.to_string().as_str())
    );
    assert!(!state.detection_in_flight);
    assert!(state.pitch_visible);
}

#[test]
fn rerun_sends_chosen_confidence() {
    let mut state = reviewed();
    state.adjust_confidence(1);
    let command = state.request_rerun(Instant::now()).unwrap();
    let Command::Detect(form) = command else {
        panic!("expected a detection command");
    };
    let confidence = form.confidence.expect("confidence should be sent");
    assert!((confidence - 0.55).abs() < 1e-9);
    assert!(!state.pitch_visible);
    assert!(!state.adjustments_open);
    assert!(state.detection_in_flight);
}

#[test]
fn confidence_stays_in_range() {
    let mut state = ReviewState::default();
    state.adjust_confidence(-40);
    assert!((state.confidence - 0.05).abs() < 1e-9);
    state.adjust_confidence(40);
    assert!((state.confidence - 0.95).abs() < 1e-9);
}

#[test]
fn applying_adjustments_persists_then_renders() {
    let mut state = reviewed();
    state.open_adjustment_form().unwrap();
    assert_eq!(state.screen, Screen::Adjust);
    state.form.as_mut().unwrap().toggle_delete();

    let commands = state.apply_adjustments(Instant::now()).unwrap();
    assert_eq!(commands.len(), 2);
    match &commands[0] {
        Command::UpdateDetections { snapshot, payload } => {
            assert_eq!(*payload, UpdatePayload::FullSnapshot);
            assert_eq!(snapshot.players_detections.tracker_id, vec![5, 8, 11]);
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert!(matches!(&commands[1], Command::Render(s) if s.player_count() == 3));
    assert_eq!(state.screen, Screen::Review);
    assert!(state.form.is_none());
    assert!(state.detection_in_flight);
    assert!(has_toast(&state, UPDATE_SUCCESS));
}

#[test]
fn missing_goalkeeper_prompts_for_defenders() {
    let mut state = reviewed();
    assert_eq!(state.request_offside(), Ok(None));
    assert_eq!(state.screen, Screen::Defenders);
    assert!(!state.classify_in_flight);

    let command = state.assign_defending_team(Team::B).unwrap();
    let Command::Classify(request) = command else {
        panic!("expected a classification command");
    };
    assert_eq!(request.defending_team, Some(Team::B));
    let body = request.body().unwrap();
    assert_eq!(body["defending_team"], 1);
    assert_eq!(state.screen, Screen::Review);
    assert!(state.classify_in_flight);

    assert_eq!(
        state.request_offside(),
        Err(Rejection::ClassificationInFlight)
    );
}

#[test]
fn goalkeeper_skips_defenders_prompt() {
    let mut state = reviewed();
    if let Some(snapshot) = state.snapshot.as_mut() {
        snapshot.set_goalkeeper(0, true);
    }
    let command = state.request_offside().unwrap();
    let Some(Command::Classify(request)) = command else {
        panic!("expected a classification command");
    };
    assert_eq!(request.defending_team, None);
    assert_eq!(state.screen, Screen::Review);
}

#[test]
fn defenders_cannot_be_assigned_unprompted() {
    let mut state = reviewed();
    assert_eq!(
        state.assign_defending_team(Team::A),
        Err(Rejection::NotAwaitingDefenders)
    );
}

#[test]
fn classification_failure_alerts() {
    let mut state = reviewed();
    state.snapshot.as_mut().unwrap().set_goalkeeper(1, true);
    state.request_offside().unwrap();
    apply_delta(&mut state, Delta::ClassificationFailed(ApiError::MissingRedirect));
    assert!(!state.classify_in_flight);
    assert_eq!(state.notifications.current_alert(), Some(CLASSIFY_ERROR));
    assert_eq!(state.screen, Screen::Review);
}

#[test]
fn decision_is_recorded_once() {
    let mut state = classified(Decision::Offside);
    assert_eq!(state.screen, Screen::Decision);
    assert_eq!(state.redirect_url.as_deref(), Some("/offside/results/12/"));

    let command = state.decide(DecisionAction::Override).unwrap();
    let Command::StoreDecision(record) = command else {
        panic!("expected a store command");
    };
    assert_eq!(record.algorithm_decision, Decision::Offside);
    assert_eq!(record.final_decision, Decision::Onside);

    assert_eq!(
        state.decide(DecisionAction::Confirm),
        Err(Rejection::DecisionAlreadyRecorded)
    );
    let controller = state.decision.as_ref().unwrap();
    assert_eq!(controller.final_text().as_deref(), Some("Final decision: Onside"));
    assert!(!controller.controls_visible);
}

#[test]
fn stored_decision_clears_snapshot() {
    let mut state = classified(Decision::Onside);
    state.decide(DecisionAction::Confirm).unwrap();
    apply_delta(
        &mut state,
        Delta::DecisionStored {
            decision_id: Some(serde_json::json!(42)),
        },
    );
    assert!(state.snapshot.is_none());
    assert!(has_toast(&state, DECISION_SAVED));
    assert_eq!(
        state.decision.as_ref().and_then(|d| d.save_status.clone()),
        Some(SaveStatus::Saved {
            decision_id: Some(serde_json::json!(42))
        })
    );
}

#[test]
fn failed_decision_save_is_not_alerted() {
    let mut state = classified(Decision::Offside);
    state.decide(DecisionAction::Confirm).unwrap();
    apply_delta(
        &mut state,
        Delta::DecisionStoreFailed(ApiError::Status {
            status: 403,
            body: "CSRF verification failed".to_string(),
        }),
    );
    assert_eq!(state.notifications.current_alert(), None);
    assert_eq!(
        state.decision.as_ref().and_then(|d| d.save_status.clone()),
        Some(SaveStatus::Failed)
    );
    assert!(state.snapshot.is_some());
}

#[test]
fn cancel_resets_session_but_keeps_console() {
    let mut state = reviewed();
    state.adjust_confidence(2);
    let logged = state.logs.len();
    state.cancel().unwrap();
    assert_eq!(state.screen, Screen::Picker);
    assert!(state.snapshot.is_none());
    assert!(state.image.is_none());
    assert!(state.picker_visible);
    assert!((state.confidence - 0.5).abs() < 1e-9);
    assert_eq!(state.logs.len(), logged + 1);
}

#[test]
fn cancel_waits_for_detection() {
    let mut state = with_image();
    state.submit_upload(Instant::now()).unwrap();
    assert_eq!(state.cancel(), Err(Rejection::DetectionInFlight));
    assert!(state.detection_in_flight);
}

#[test]
fn cancel_waits_for_classification() {
    let mut state = classifying();
    assert_eq!(state.cancel(), Err(Rejection::ClassificationInFlight));
    assert!(state.snapshot.is_some());

    apply_delta(
        &mut state,
        Delta::OffsideClassified {
            redirect_url: "/offside/results/12/".to_string(),
            algorithm_decision: Decision::Offside,
        },
    );
    assert_eq!(state.screen, Screen::Decision);
    assert!(state.snapshot.is_some());
    assert!(state.decision.is_some());
}

#[test]
fn rerun_and_form_wait_for_classification() {
    let mut state = classifying();
    state.adjust_confidence(1);
    assert_eq!(
        state.request_rerun(Instant::now()),
        Err(Rejection::ClassificationInFlight)
    );
    assert!(!state.detection_in_flight);
    assert_eq!(
        state.open_adjustment_form(),
        Err(Rejection::ClassificationInFlight)
    );
    assert_eq!(state.screen, Screen::Review);

    apply_delta(
        &mut state,
        Delta::OffsideClassified {
            redirect_url: "/offside/results/12/".to_string(),
            algorithm_decision: Decision::Onside,
        },
    );
    assert_eq!(
        state.decision.as_ref().map(|d| d.algorithm_decision),
        Some(Decision::Onside)
    );
}

#[test]
fn classification_result_without_request_is_dropped() {
    let mut state = reviewed();
    state.cancel().unwrap();
    apply_delta(
        &mut state,
        Delta::OffsideClassified {
            redirect_url: "/offside/results/12/".to_string(),
            algorithm_decision: Decision::Offside,
        },
    );
    apply_delta(&mut state, Delta::ClassificationFailed(ApiError::MissingRedirect));
    assert_eq!(state.screen, Screen::Picker);
    assert!(state.decision.is_none());
    assert!(state.redirect_url.is_none());
    assert_eq!(state.notifications.current_alert(), None);
}
