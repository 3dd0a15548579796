//! Play records as supplied by the designer/persistence layer.
//!
//! The engine treats a `Play` as read-only data. Only the coordinator
//! rewrites one, through [`PlayPatch`], when the caller asks it to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Width of the abstract field coordinate space players and routes live in.
pub const FIELD_WIDTH: f32 = 600.0;
/// Height of the abstract field coordinate space.
pub const FIELD_HEIGHT: f32 = 300.0;

/// Play difficulty. Plays without one are treated as `Intermediate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

/// Point in field space (600x300).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A player marker placed on the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMark {
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub position: String,
    #[serde(default = "PlayerMark::default_color")]
    pub color: String,
    #[serde(default)]
    pub selected: bool,
}

impl PlayerMark {
    pub fn new(id: impl Into<String>, x: f32, y: f32, number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            number: number.into(),
            position: String::new(),
            color: Self::default_color(),
            selected: false,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    fn default_color() -> String {
        "#1d4ed8".to_string()
    }
}

/// A route or block path attached to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    #[serde(default)]
    pub player_id: String,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default = "Route::default_color")]
    pub color: String,
    #[serde(rename = "type", default)]
    pub route_type: String,
}

impl Route {
    pub fn new(id: impl Into<String>, player_id: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            player_id: player_id.into(),
            points,
            color: Self::default_color(),
            route_type: "route".to_string(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    fn default_color() -> String {
        "#facc15".to_string()
    }
}

/// A single diagrammed play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub players: Vec<PlayerMark>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub formation: String,
    #[serde(default)]
    pub phase: String,
    #[serde(rename = "type", default)]
    pub play_type: String,
    pub created_at: DateTime<Utc>,
    /// Non-authoritative rendered thumbnail (data URL), may be stale or absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Play {
    /// Create an empty play. An empty `id` gets a random UUID.
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let mut id = id.into();
        if id.is_empty() {
            id = uuid::Uuid::new_v4().to_string();
        }
        Self {
            id,
            name: name.into(),
            players: Vec::new(),
            routes: Vec::new(),
            formation: String::new(),
            phase: String::new(),
            play_type: String::new(),
            created_at,
            thumbnail: None,
            difficulty: None,
            tags: None,
            description: None,
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    pub fn with_type(mut self, play_type: impl Into<String>) -> Self {
        self.play_type = play_type.into();
        self
    }

    pub fn with_formation(mut self, formation: impl Into<String>) -> Self {
        self.formation = formation.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_players(mut self, players: Vec<PlayerMark>) -> Self {
        self.players = players;
        self
    }

    pub fn with_routes(mut self, routes: Vec<Route>) -> Self {
        self.routes = routes;
        self
    }

    /// Difficulty used for filtering (absent = intermediate)
    pub fn effective_difficulty(&self) -> Difficulty {
        self.difficulty.unwrap_or_default()
    }

    /// Tags as a slice (absent = empty)
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Lower-cased, space-joined text that free-text search runs against.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        if let Some(description) = &self.description {
            parts.push(description);
        }
        parts.push(&self.formation);
        parts.push(&self.phase);
        parts.push(&self.play_type);
        parts.extend(self.tags().iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }
}

/// Partial update for a play. Present fields overwrite; `id` is immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayPatch {
    pub name: Option<String>,
    pub players: Option<Vec<PlayerMark>>,
    pub routes: Option<Vec<Route>>,
    pub formation: Option<String>,
    pub phase: Option<String>,
    #[serde(rename = "type")]
    pub play_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub difficulty: Option<Difficulty>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
}

impl PlayPatch {
    pub fn is_empty(&self) -> bool {
        self == &PlayPatch::default()
    }

    /// Overwrite present fields on `play`.
    ///
    /// Any content change drops the cached thumbnail reference, since it no
    /// longer depicts the play.
    pub fn apply(&self, play: &mut Play) {
        if self.is_empty() {
            return;
        }
        if let Some(v) = &self.name {
            play.name = v.clone();
        }
        if let Some(v) = &self.players {
            play.players = v.clone();
        }
        if let Some(v) = &self.routes {
            play.routes = v.clone();
        }
        if let Some(v) = &self.formation {
            play.formation = v.clone();
        }
        if let Some(v) = &self.phase {
            play.phase = v.clone();
        }
        if let Some(v) = &self.play_type {
            play.play_type = v.clone();
        }
        if let Some(v) = self.created_at {
            play.created_at = v;
        }
        if let Some(v) = self.difficulty {
            play.difficulty = Some(v);
        }
        if let Some(v) = &self.tags {
            play.tags = Some(v.clone());
        }
        if let Some(v) = &self.description {
            play.description = Some(v.clone());
        }
        play.thumbnail = None;
    }
}
