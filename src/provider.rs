use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::adjustment::UpdatePayload;
use crate::api::OffsideApi;
use crate::decision::extract_algorithm_decision;
use crate::detection::DetectionSnapshot;
use crate::error::ApiError;
use crate::pitch::{PitchImage, store_pitch_image};
use crate::state::{Command, Delta};

/// Executes commands against the server, one at a time.
pub struct Provider<A> {
    api: Arc<A>,
    pitch_dir: PathBuf,
    rendered: u32,
}

impl<A: OffsideApi> Provider<A> {
    pub fn new(api: A, pitch_dir: PathBuf) -> Self {
        Self {
            api: Arc::new(api),
            pitch_dir,
            rendered: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn execute(&mut self, command: Command) -> Vec<Delta> {
        match command {
            Command::Detect(form) => match self.api.process_image(&form) {
                Ok(snapshot) => {
                    info!(players = snapshot.player_count(), "detection finished");
                    let rendered = self.render(&snapshot);
                    vec![
                        Delta::SnapshotReplaced(snapshot),
                        match rendered {
                            Ok(pitch) => Delta::PitchRendered(pitch),
                            Err(err) => Delta::DetectionFailed(err),
                        },
                    ]
                }
                Err(err) => vec![Delta::DetectionFailed(err)],
            },
            Command::Render(snapshot) => match self.render(&snapshot) {
                Ok(pitch) => vec![Delta::PitchRendered(pitch)],
                Err(err) => vec![Delta::DetectionFailed(err)],
            },
            Command::UpdateDetections { snapshot, payload } => {
                vec![update_detections(&*self.api, &snapshot, payload)]
            }
            Command::Classify(request) => {
                let outcome = self.api.classify_offside(&request).and_then(|redirect_url| {
                    let page = self.api.results_page(&redirect_url)?;
                    let algorithm_decision = extract_algorithm_decision(&page).ok_or_else(|| {
                        ApiError::MalformedBody("results page carries no decision".to_string())
                    })?;
                    Ok((redirect_url, algorithm_decision))
                });
                match outcome {
                    Ok((redirect_url, algorithm_decision)) => vec![Delta::OffsideClassified {
                        redirect_url,
                        algorithm_decision,
                    }],
                    Err(err) => vec![Delta::ClassificationFailed(err)],
                }
            }
            Command::StoreDecision(record) => match self.api.store_decision(&record) {
                Ok(resp) => vec![Delta::DecisionStored {
                    decision_id: resp.decision_id,
                }],
                Err(err) => vec![Delta::DecisionStoreFailed(err)],
            },
        }
    }

    fn render(&mut self, snapshot: &DetectionSnapshot) -> Result<PitchImage, ApiError> {
        let rendered = self.api.render_pitch(snapshot)?;
        self.rendered += 1;
        store_pitch_image(&rendered, &self.pitch_dir, self.rendered)
    }
}

fn update_detections<A: OffsideApi + ?Sized>(
    api: &A,
    snapshot: &DetectionSnapshot,
    payload: UpdatePayload,
) -> Delta {
    match api.update_detections(snapshot, payload) {
        Ok(()) => Delta::DetectionsPersisted,
        Err(err) => Delta::UpdateFailed(err),
    }
}

/// Runs the provider on its own thread. Detection updates go out on a
/// detached thread and never delay the commands queued behind them.
pub fn spawn_provider<A>(
    mut provider: Provider<A>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<Command>,
) -> JoinHandle<()>
where
    A: OffsideApi + Send + Sync + 'static,
{
    thread::spawn(move || {
        while let Ok(command) = cmd_rx.recv() {
            debug!(kind = command_kind(&command), "provider command");
            if let Command::UpdateDetections { snapshot, payload } = command {
                let api = Arc::clone(&provider.api);
                let worker_tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name("update-detections".to_string())
                    .spawn(move || {
                        let _ = worker_tx.send(update_detections(&*api, &snapshot, payload));
                    });
                if let Err(err) = spawned {
                    warn!("could not start detection update: {err}");
                    if tx.send(Delta::UpdateFailed(ApiError::Io(err))).is_err() {
                        return;
                    }
                }
                continue;
            }
            for delta in provider.execute(command) {
                if tx.send(delta).is_err() {
                    return;
                }
            }
        }
    })
}

fn command_kind(command: &Command) -> &'static str {
    match command {
        Command::Detect(_) => "detect",
        Command::Render(_) => "render",
        Command::UpdateDetections { .. } => "update_detections",
        Command::Classify(_) => "classify",
        Command::StoreDecision(_) => "store_decision",
    }
}
