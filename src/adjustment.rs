use tracing::{debug, warn};

use crate::detection::{DetectionSnapshot, Team, TrackerId};
use crate::error::Rejection;

/// What the update endpoint receives after a manual correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePayload {
    FullSnapshot,
    PlayersDetectionsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormOptions {
    /// Offer the goalkeeper flag and write `class_name` back on apply.
    pub goalkeeper_toggle: bool,
    pub update_payload: UpdatePayload,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            goalkeeper_toggle: true,
            update_payload: UpdatePayload::FullSnapshot,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub tracker_id: TrackerId,
    pub class_name: String,
    /// `None` when the server sent a class id outside the two teams.
    pub team: Option<Team>,
    pub delete: bool,
    pub goalkeeper: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjustmentSummary {
    pub deleted: Vec<TrackerId>,
    pub reassigned: usize,
    pub goalkeepers: usize,
    /// Deleted players with no matching entry in `players_xy`.
    pub unmatched_xy: Vec<TrackerId>,
}

/// Per-player correction form, one row per `players_detections` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentForm {
    pub rows: Vec<PlayerRow>,
    pub selected: usize,
    pub options: FormOptions,
}

impl AdjustmentForm {
    pub fn from_snapshot(snapshot: &DetectionSnapshot, options: FormOptions) -> Self {
        let pd = &snapshot.players_detections;
        let rows = pd
            .tracker_id
            .iter()
            .enumerate()
            .map(|(idx, id)| PlayerRow {
                tracker_id: *id,
                class_name: pd.class_name.get(idx).cloned().unwrap_or_default(),
                team: pd.team(idx),
                delete: false,
                goalkeeper: pd.is_goalkeeper(idx),
            })
            .collect();
        Self {
            rows,
            selected: 0,
            options,
        }
    }

    pub fn select_next(&mut self) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + 1).min(self.rows.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn set_team(&mut self, team: Team) {
        if let Some(row) = self.rows.get_mut(self.selected) {
            row.team = Some(team);
        }
    }

    pub fn toggle_team(&mut self) {
        if let Some(row) = self.rows.get_mut(self.selected) {
            row.team = Some(row.team.map(Team::other).unwrap_or(Team::A));
        }
    }

    pub fn toggle_delete(&mut self) {
        if let Some(row) = self.rows.get_mut(self.selected) {
            row.delete = !row.delete;
        }
    }

    pub fn toggle_goalkeeper(&mut self) {
        if !self.options.goalkeeper_toggle {
            return;
        }
        if let Some(row) = self.rows.get_mut(self.selected) {
            row.goalkeeper = !row.goalkeeper;
        }
    }

    fn matches(&self, snapshot: &DetectionSnapshot) -> bool {
        let ids = &snapshot.players_detections.tracker_id;
        ids.len() == self.rows.len()
            && self
                .rows
                .iter()
                .zip(ids.iter())
                .all(|(row, id)| row.tracker_id == *id)
    }

    /// Writes the form back into `snapshot`.
    ///
    /// Rows are processed from the highest index down so a deletion never
    /// shifts a row that has not been visited yet. The snapshot is only
    /// replaced once every row has been applied.
    pub fn apply(&self, snapshot: &mut DetectionSnapshot) -> Result<AdjustmentSummary, Rejection> {
        if !self.matches(snapshot) {
            return Err(Rejection::StaleForm);
        }

        let mut updated = snapshot.clone();
        let mut summary = AdjustmentSummary::default();

        for (idx, row) in self.rows.iter().enumerate().rev() {
            if self.options.goalkeeper_toggle {
                updated.set_goalkeeper(idx, row.goalkeeper);
                if row.goalkeeper && !row.delete {
                    summary.goalkeepers += 1;
                }
            }

            if row.delete {
                if let Some(removed) = updated.remove_player(idx) {
                    if removed.xy_index.is_none() {
                        warn!(
                            tracker_id = removed.tracker_id,
                            "no players_xy entry for deleted player"
                        );
                        summary.unmatched_xy.push(removed.tracker_id);
                    }
                    summary.deleted.push(removed.tracker_id);
                }
            } else if let Some(team) = row.team {
                updated.set_team(idx, team);
                summary.reassigned += 1;
            }
        }

        debug!(
            deleted = summary.deleted.len(),
            reassigned = summary.reassigned,
            "applied player adjustments"
        );
        *snapshot = updated;
        Ok(summary)
    }
}
