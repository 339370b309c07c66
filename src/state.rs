use std::collections::VecDeque;
use std::path::Path;
use std::time::Instant;

use chrono::Local;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adjustment::{AdjustmentForm, FormOptions, UpdatePayload};
use crate::api::{ClassifyPayload, ClassifyRequest};
use crate::decision::{Decision, DecisionAction, DecisionController, DecisionRecord, SaveStatus};
use crate::detection::{DetectionSnapshot, Team};
use crate::error::{ApiError, Rejection};
use crate::notify::{Notifications, ToastKind};
use crate::pitch::PitchImage;
use crate::progress::ProgressBar;
use crate::upload::{
    CONFIDENCE_STEP, DEFAULT_CONFIDENCE, DetectionForm, ImageSelection, clamp_confidence,
    is_default_confidence,
};

pub const PROCESSING_ERROR: &str = "Error processing image. Please try again.";
pub const CLASSIFY_ERROR: &str = "Error";
pub const UPDATE_SUCCESS: &str = "Object detection updated successfully!";
pub const DECISION_SAVED: &str = "Offside decision saved successfully!";

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// File picker and preview.
    Picker,
    /// Pitch diagram with the adjustments panel.
    Review,
    /// Per-player correction form.
    Adjust,
    /// Blocking defending-team prompt.
    Defenders,
    /// Confirm or override the verdict.
    Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    Idle,
    InProgress,
    Hidden,
}

impl RunAction {
    pub fn label(self) -> &'static str {
        match self {
            RunAction::Idle | RunAction::Hidden => "Run Detection",
            RunAction::InProgress => "Detection in progress...",
        }
    }
}

/// Work for the provider thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Detect, replace the snapshot, then render it.
    Detect(DetectionForm),
    /// Render the snapshot as it stands.
    Render(DetectionSnapshot),
    UpdateDetections {
        snapshot: DetectionSnapshot,
        payload: UpdatePayload,
    },
    Classify(ClassifyRequest),
    StoreDecision(DecisionRecord),
}

/// Results coming back from the provider thread.
#[derive(Debug)]
pub enum Delta {
    SnapshotReplaced(DetectionSnapshot),
    PitchRendered(PitchImage),
    DetectionFailed(ApiError),
    DetectionsPersisted,
    UpdateFailed(ApiError),
    OffsideClassified {
        redirect_url: String,
        algorithm_decision: Decision,
    },
    ClassificationFailed(ApiError),
    DecisionStored {
        decision_id: Option<Value>,
    },
    DecisionStoreFailed(ApiError),
}

/// Everything one review session knows. Owned by the UI loop.
#[derive(Debug, Clone)]
pub struct ReviewState {
    pub screen: Screen,
    pub path_input: String,
    pub image: Option<ImageSelection>,
    pub picker_visible: bool,
    pub run_action: RunAction,
    pub detection_in_flight: bool,
    pub snapshot: Option<DetectionSnapshot>,
    pub pitch: Option<PitchImage>,
    pub pitch_visible: bool,
    pub adjustments_open: bool,
    pub form: Option<AdjustmentForm>,
    pub form_options: FormOptions,
    pub classify_payload: ClassifyPayload,
    pub confidence: f64,
    pub defending_choice: Team,
    pub defending_team: Option<Team>,
    pub classify_in_flight: bool,
    pub redirect_url: Option<String>,
    pub decision: Option<DecisionController>,
    pub progress: ProgressBar,
    pub notifications: Notifications,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self::new(FormOptions::default(), ClassifyPayload::Wrapped, Notifications::default())
    }
}

impl ReviewState {
    pub fn new(
        form_options: FormOptions,
        classify_payload: ClassifyPayload,
        notifications: Notifications,
    ) -> Self {
        Self {
            screen: Screen::Picker,
            path_input: String::new(),
            image: None,
            picker_visible: true,
            run_action: RunAction::Idle,
            detection_in_flight: false,
            snapshot: None,
            pitch: None,
            pitch_visible: false,
            adjustments_open: false,
            form: None,
            form_options,
            classify_payload,
            confidence: DEFAULT_CONFIDENCE,
            defending_choice: Team::A,
            defending_team: None,
            classify_in_flight: false,
            redirect_url: None,
            decision: None,
            progress: ProgressBar::default(),
            notifications,
            logs: VecDeque::new(),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        let stamp = Local::now().format("%H:%M:%S");
        self.logs.push_back(format!("{stamp} {}", msg.into()));
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn reject<T>(&mut self, rejection: Rejection) -> Result<T, Rejection> {
        self.notifications.alert(rejection.to_string());
        self.push_log(format!("[WARN] {rejection}"));
        Err(rejection)
    }

    /// Advances time-driven chrome: the progress animation and toasts.
    pub fn tick(&mut self, now: Instant) {
        self.progress.tick(now);
        self.notifications.prune(now);
    }

    /// Loads and previews a local image. No network call.
    pub fn select_image(&mut self, path: &Path) -> Result<(), Rejection> {
        match ImageSelection::load(path) {
            Ok(selection) => {
                self.push_log(format!(
                    "[INFO] Selected {} ({} bytes)",
                    selection.file_name,
                    selection.bytes.len()
                ));
                self.image = Some(selection);
                Ok(())
            }
            Err(rejection) => self.reject(rejection),
        }
    }

    pub fn submit_upload(&mut self, now: Instant) -> Result<Command, Rejection> {
        let Some(image) = self.image.as_ref() else {
            return self.reject(Rejection::NoImageSelected);
        };
        let form = image.detection_form(None);
        if self.detection_in_flight {
            return self.reject(Rejection::DetectionInFlight);
        }
        self.picker_visible = false;
        self.run_detection(Some(form), true, now)
    }

    /// Starts a detection round. With `overwrite` the form is sent to the
    /// detection endpoint and the snapshot replaced; without it the
    /// current snapshot is re-rendered.
    pub fn run_detection(
        &mut self,
        form: Option<DetectionForm>,
        overwrite: bool,
        now: Instant,
    ) -> Result<Command, Rejection> {
        if self.detection_in_flight {
            return self.reject(Rejection::DetectionInFlight);
        }
        let command = if overwrite {
            match form {
                Some(form) => Command::Detect(form),
                None => return self.reject(Rejection::NoImageSelected),
            }
        } else {
            match self.snapshot.as_ref() {
                Some(snapshot) => Command::Render(snapshot.clone()),
                None => return self.reject(Rejection::NoSnapshot),
            }
        };
        self.detection_in_flight = true;
        self.run_action = RunAction::InProgress;
        self.progress.start(now);
        info!(overwrite, "detection started");
        Ok(command)
    }

    pub fn adjust_confidence(&mut self, steps: i32) {
        self.confidence = clamp_confidence(self.confidence + f64::from(steps) * CONFIDENCE_STEP);
    }

    pub fn request_rerun(&mut self, now: Instant) -> Result<Command, Rejection> {
        if self.classify_in_flight {
            return self.reject(Rejection::ClassificationInFlight);
        }
        if is_default_confidence(self.confidence) {
            return self.reject(Rejection::DefaultConfidence);
        }
        let Some(image) = self.image.as_ref() else {
            return self.reject(Rejection::NoImageSelected);
        };
        let form = image.detection_form(Some(self.confidence));
        if self.detection_in_flight {
            return self.reject(Rejection::DetectionInFlight);
        }
        self.adjustments_open = false;
        self.pitch_visible = false;
        self.run_action = RunAction::Idle;
        self.run_detection(Some(form), true, now)
    }

    pub fn open_adjustment_form(&mut self) -> Result<(), Rejection> {
        if self.classify_in_flight {
            return self.reject(Rejection::ClassificationInFlight);
        }
        let Some(snapshot) = self.snapshot.as_ref() else {
            return self.reject(Rejection::NoSnapshot);
        };
        self.form = Some(AdjustmentForm::from_snapshot(snapshot, self.form_options));
        self.screen = Screen::Adjust;
        Ok(())
    }

    pub fn close_adjustment_form(&mut self) {
        self.form = None;
        self.screen = Screen::Review;
    }

    /// Applies the open form to the snapshot and returns the follow-up
    /// work: persist the snapshot, then re-render it locally.
    pub fn apply_adjustments(&mut self, now: Instant) -> Result<Vec<Command>, Rejection> {
        if self.detection_in_flight {
            return self.reject(Rejection::DetectionInFlight);
        }
        if self.classify_in_flight {
            return self.reject(Rejection::ClassificationInFlight);
        }
        let Some(form) = self.form.as_ref() else {
            return self.reject(Rejection::StaleForm);
        };
        let Some(snapshot) = self.snapshot.as_mut() else {
            return self.reject(Rejection::NoSnapshot);
        };
        let summary = match form.apply(snapshot) {
            Ok(summary) => summary,
            Err(rejection) => return self.reject(rejection),
        };
        let persist = Command::UpdateDetections {
            snapshot: snapshot.clone(),
            payload: form.options.update_payload,
        };

        self.push_log(format!(
            "[INFO] Adjusted players: {} deleted, {} reassigned",
            summary.deleted.len(),
            summary.reassigned
        ));
        for id in &summary.unmatched_xy {
            self.push_log(format!("[WARN] Player {id} had no pitch position"));
        }

        self.form = None;
        self.screen = Screen::Review;
        self.notifications.notify(UPDATE_SUCCESS, ToastKind::Success);
        self.adjustments_open = false;

        let render = self.run_detection(None, false, now)?;
        Ok(vec![persist, render])
    }

    /// Starts offside classification, or the defending-team prompt when no
    /// goalkeeper is known.
    pub fn request_offside(&mut self) -> Result<Option<Command>, Rejection> {
        if self.classify_in_flight {
            return self.reject(Rejection::ClassificationInFlight);
        }
        let Some(snapshot) = self.snapshot.as_ref() else {
            return self.reject(Rejection::NoSnapshot);
        };
        if !snapshot.has_goalkeeper() {
            self.defending_team = None;
            self.screen = Screen::Defenders;
            return Ok(None);
        }
        self.defending_team = None;
        Ok(Some(self.classify_command()?))
    }

    pub fn assign_defending_team(&mut self, team: Team) -> Result<Command, Rejection> {
        if self.screen != Screen::Defenders {
            return self.reject(Rejection::NotAwaitingDefenders);
        }
        self.defending_team = Some(team);
        self.screen = Screen::Review;
        self.push_log(format!("[INFO] {} defending", team.label()));
        self.classify_command()
    }

    fn classify_command(&mut self) -> Result<Command, Rejection> {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return self.reject(Rejection::NoSnapshot);
        };
        let request = ClassifyRequest {
            snapshot: snapshot.clone(),
            defending_team: self.defending_team,
            payload: self.classify_payload,
        };
        self.classify_in_flight = true;
        Ok(Command::Classify(request))
    }

    pub fn decide(&mut self, action: DecisionAction) -> Result<Command, Rejection> {
        let Some(controller) = self.decision.as_mut() else {
            return self.reject(Rejection::NoDecision);
        };
        match controller.act(action) {
            Ok(record) => {
                self.push_log(format!(
                    "[INFO] Final decision {} (algorithm {})",
                    record.final_decision.label(),
                    record.algorithm_decision.label()
                ));
                Ok(Command::StoreDecision(record))
            }
            Err(rejection) => self.reject(rejection),
        }
    }

    /// Drops the session and returns to the picker. Refused while a
    /// detection or classification request is still out.
    pub fn cancel(&mut self) -> Result<(), Rejection> {
        if self.detection_in_flight {
            return self.reject(Rejection::DetectionInFlight);
        }
        if self.classify_in_flight {
            return self.reject(Rejection::ClassificationInFlight);
        }
        let logs = std::mem::take(&mut self.logs);
        let notifications = self.notifications.clone();
        *self = Self::new(self.form_options, self.classify_payload, notifications);
        self.notifications.clear();
        self.logs = logs;
        self.push_log("[INFO] Session reset");
        Ok(())
    }

    fn finish_detection(&mut self) {
        self.detection_in_flight = false;
        self.progress.stop();
    }
}

pub fn apply_delta(state: &mut ReviewState, delta: Delta) {
    match delta {
        Delta::SnapshotReplaced(snapshot) => {
            state.push_log(format!(
                "[INFO] Detected {} players, {} referees",
                snapshot.player_count(),
                snapshot.refs_xy.xy.len()
            ));
            state.snapshot = Some(snapshot);
            state.form = None;
            state.decision = None;
        }
        Delta::PitchRendered(pitch) => {
            state.finish_detection();
            state.push_log(format!("[INFO] Pitch rendered to {}", pitch.path.display()));
            state.pitch = Some(pitch);
            state.pitch_visible = true;
            state.run_action = RunAction::Hidden;
            state.adjustments_open = true;
            state.screen = Screen::Review;
        }
        Delta::DetectionFailed(err) => {
            error!("detection failed: {err}");
            state.finish_detection();
            state.push_log(format!("[WARN] Detection error: {err}"));
            state.notifications.alert(PROCESSING_ERROR);
            state.picker_visible = true;
            state.run_action = RunAction::Idle;
            state.screen = Screen::Picker;
        }
        Delta::DetectionsPersisted => {
            state.push_log("[INFO] Detections saved");
        }
        Delta::UpdateFailed(err) => {
            warn!("update detections failed: {err}");
            state.push_log(format!("[WARN] Saving detections failed: {err}"));
        }
        Delta::OffsideClassified { .. } | Delta::ClassificationFailed(_)
            if !state.classify_in_flight =>
        {
            warn!("dropping classification result nobody is waiting for");
        }
        Delta::OffsideClassified {
            redirect_url,
            algorithm_decision,
        } => {
            state.classify_in_flight = false;
            state.push_log(format!(
                "[INFO] Classified {} ({redirect_url})",
                algorithm_decision.label()
            ));
            state.redirect_url = Some(redirect_url);
            state.decision = Some(DecisionController::new(algorithm_decision));
            state.adjustments_open = false;
            state.screen = Screen::Decision;
        }
        Delta::ClassificationFailed(err) => {
            error!("offside classification failed: {err}");
            state.classify_in_flight = false;
            state.push_log(format!("[WARN] Classification error: {err}"));
            state.notifications.alert(CLASSIFY_ERROR);
            state.screen = Screen::Review;
        }
        Delta::DecisionStored { decision_id } => {
            if let Some(controller) = state.decision.as_mut() {
                controller.save_status = Some(SaveStatus::Saved {
                    decision_id: decision_id.clone(),
                });
            }
            state.snapshot = None;
            state.form = None;
            state.notifications.notify(DECISION_SAVED, ToastKind::Success);
            match decision_id {
                Some(id) => state.push_log(format!("[INFO] Decision saved as {id}")),
                None => state.push_log("[INFO] Decision saved"),
            }
        }
        Delta::DecisionStoreFailed(err) => {
            // Logged only; the user sees no error for this one.
            error!("saving decision failed: {err}");
            if let Some(controller) = state.decision.as_mut() {
                controller.save_status = Some(SaveStatus::Failed);
            }
            state.push_log(format!("[WARN] Error saving decision: {err}"));
        }
    }
}
