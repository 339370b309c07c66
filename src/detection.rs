use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const GOALKEEPER: &str = "goalkeeper";
pub const PLAYER: &str = "player";

pub type TrackerId = i64;
pub type Point = [f64; 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn class_id(self) -> i64 {
        match self {
            Team::A => 0,
            Team::B => 1,
        }
    }

    pub fn from_class_id(class_id: i64) -> Option<Team> {
        match class_id {
            0 => Some(Team::A),
            1 => Some(Team::B),
            _ => None,
        }
    }

    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Team::A => "Team A",
            Team::B => "Team B",
        }
    }
}

// The server speaks in class ids, never in labels.
impl Serialize for Team {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.class_id())
    }
}

/// Tracker ids with their projected pitch coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracker_id: Vec<TrackerId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub xy: Vec<Point>,
}

impl PointSet {
    pub fn is_empty(&self) -> bool {
        self.xy.is_empty()
    }

    fn position_of(&self, tracker_id: TrackerId) -> Option<usize> {
        self.tracker_id.iter().position(|id| *id == tracker_id)
    }
}

/// Column-oriented per-player detection record. Every column is index
/// aligned with `tracker_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayersDetections {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracker_id: Vec<TrackerId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub class_id: Vec<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub class_name: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xyxy: Option<Vec<[f64; 4]>>,
}

impl PlayersDetections {
    pub fn len(&self) -> usize {
        self.tracker_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker_id.is_empty()
    }

    pub fn team(&self, index: usize) -> Option<Team> {
        self.class_id.get(index).copied().and_then(Team::from_class_id)
    }

    pub fn is_goalkeeper(&self, index: usize) -> bool {
        self.class_name
            .get(index)
            .is_some_and(|name| name == GOALKEEPER)
    }

    fn remove(&mut self, index: usize) {
        self.tracker_id.remove(index);
        self.class_id.remove(index);
        self.class_name.remove(index);
        self.confidence.remove(index);
        if let Some(xyxy) = self.xyxy.as_mut() {
            xyxy.remove(index);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentError {
    pub column: &'static str,
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for AlignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column {} has {} entries, expected {}",
            self.column, self.found, self.expected
        )
    }
}

impl std::error::Error for AlignmentError {}

/// What `DetectionSnapshot::remove_player` took out of the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedPlayer {
    pub tracker_id: TrackerId,
    /// Position removed from `players_xy`, if a matching entry existed.
    pub xy_index: Option<usize>,
}

/// The single detection result a review session works on.
///
/// Fields the client does not interpret (`file_path` and anything the
/// server adds later) are carried in `extra` so a round-trip through the
/// update and classification endpoints keeps them intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ball_xy: PointSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players_xy: PointSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub refs_xy: PointSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players_detections: PlayersDetections,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a render request: the four detection fields and nothing else.
#[derive(Debug, Serialize)]
pub struct RenderRequest<'a> {
    pub ball_xy: &'a PointSet,
    pub players_xy: &'a PointSet,
    pub refs_xy: &'a PointSet,
    pub players_detections: &'a PlayersDetections,
}

/// One player position prepared for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPoint {
    pub tracker_id: Option<TrackerId>,
    pub xy: Point,
    pub team: Option<Team>,
    pub goalkeeper: bool,
}

impl DetectionSnapshot {
    pub fn player_count(&self) -> usize {
        self.players_detections.len()
    }

    pub fn file_path(&self) -> Option<&str> {
        self.extra.get("file_path").and_then(Value::as_str)
    }

    pub fn has_goalkeeper(&self) -> bool {
        self.players_detections
            .class_name
            .iter()
            .any(|name| name == GOALKEEPER)
    }

    pub fn render_request(&self) -> RenderRequest<'_> {
        RenderRequest {
            ball_xy: &self.ball_xy,
            players_xy: &self.players_xy,
            refs_xy: &self.refs_xy,
            players_detections: &self.players_detections,
        }
    }

    /// Verifies the parallel-column invariant.
    pub fn check_alignment(&self) -> Result<(), AlignmentError> {
        let pd = &self.players_detections;
        let expected = pd.tracker_id.len();
        let mut columns = vec![
            ("players_detections.class_id", pd.class_id.len()),
            ("players_detections.class_name", pd.class_name.len()),
            ("players_detections.confidence", pd.confidence.len()),
        ];
        if let Some(xyxy) = pd.xyxy.as_ref() {
            columns.push(("players_detections.xyxy", xyxy.len()));
        }
        if !self.players_xy.tracker_id.is_empty() {
            columns.push(("players_xy.tracker_id", self.players_xy.tracker_id.len()));
        }
        if !self.players_xy.xy.is_empty() {
            columns.push(("players_xy.xy", self.players_xy.xy.len()));
        }
        for (column, found) in columns {
            if found != expected {
                return Err(AlignmentError {
                    column,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    pub fn set_team(&mut self, index: usize, team: Team) {
        if let Some(slot) = self.players_detections.class_id.get_mut(index) {
            *slot = team.class_id();
        }
    }

    pub fn set_goalkeeper(&mut self, index: usize, goalkeeper: bool) {
        if let Some(slot) = self.players_detections.class_name.get_mut(index) {
            *slot = if goalkeeper { GOALKEEPER } else { PLAYER }.to_string();
        }
    }

    /// Removes row `index` from every `players_detections` column and the
    /// entry with the same tracker id from `players_xy`.
    ///
    /// When `players_xy` carries no tracker ids at all the row position is
    /// used instead; when it carries ids but none match, `players_xy` is
    /// left untouched and `xy_index` is `None`.
    pub fn remove_player(&mut self, index: usize) -> Option<RemovedPlayer> {
        let tracker_id = *self.players_detections.tracker_id.get(index)?;
        self.players_detections.remove(index);

        let xy_index = if self.players_xy.tracker_id.is_empty() {
            (index < self.players_xy.xy.len()).then_some(index)
        } else {
            self.players_xy.position_of(tracker_id)
        };
        if let Some(pos) = xy_index {
            if pos < self.players_xy.xy.len() {
                self.players_xy.xy.remove(pos);
            }
            if pos < self.players_xy.tracker_id.len() {
                self.players_xy.tracker_id.remove(pos);
            }
        }

        Some(RemovedPlayer {
            tracker_id,
            xy_index,
        })
    }

    /// Player positions joined with their team by tracker id.
    pub fn player_points(&self) -> Vec<PlayerPoint> {
        let pd = &self.players_detections;
        self.players_xy
            .xy
            .iter()
            .enumerate()
            .map(|(idx, xy)| {
                let tracker_id = self.players_xy.tracker_id.get(idx).copied();
                let row = match tracker_id {
                    Some(id) => pd.tracker_id.iter().position(|t| *t == id),
                    None => (idx < pd.len()).then_some(idx),
                };
                PlayerPoint {
                    tracker_id,
                    xy: *xy,
                    team: row.and_then(|r| pd.team(r)),
                    goalkeeper: row.is_some_and(|r| pd.is_goalkeeper(r)),
                }
            })
            .collect()
    }
}

/// Parses a detection endpoint response and rejects misaligned snapshots.
pub fn parse_detection_json(raw: &str) -> anyhow::Result<DetectionSnapshot> {
    let snapshot: DetectionSnapshot = serde_json::from_str(raw.trim())?;
    snapshot.check_alignment()?;
    Ok(snapshot)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
