//! Query snapshot: search text, filter sets and sort order.
//!
//! Filter sets are `BTreeSet`s so the serialized form (and with it the query
//! signature) does not depend on insertion order.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::play::Play;
use crate::utils::collate;

/// Inclusive creation-date window. Unset bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if self.start.is_some_and(|start| at < start) {
            return false;
        }
        if self.end.is_some_and(|end| at > end) {
            return false;
        }
        true
    }
}

/// Filter axes that hold a set of accepted string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Phase,
    Type,
    Difficulty,
    Formation,
    Tags,
}

/// Active filters. An empty set means "no constraint on this axis".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub phase: BTreeSet<String>,
    #[serde(rename = "type")]
    pub play_type: BTreeSet<String>,
    pub difficulty: BTreeSet<String>,
    pub formation: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub date_range: DateRange,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.phase.is_empty()
            && self.play_type.is_empty()
            && self.difficulty.is_empty()
            && self.formation.is_empty()
            && self.tags.is_empty()
            && self.date_range.is_unbounded()
    }

    pub fn set_mut(&mut self, field: FilterField) -> &mut BTreeSet<String> {
        match field {
            FilterField::Phase => &mut self.phase,
            FilterField::Type => &mut self.play_type,
            FilterField::Difficulty => &mut self.difficulty,
            FilterField::Formation => &mut self.formation,
            FilterField::Tags => &mut self.tags,
        }
    }

    /// Replace one filter axis with `values`.
    pub fn set<I, S>(&mut self, field: FilterField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.set_mut(field) = values.into_iter().map(Into::into).collect();
    }

    /// Whether `play` passes every active filter axis.
    pub fn matches(&self, play: &Play) -> bool {
        if !self.phase.is_empty() && !self.phase.contains(&play.phase) {
            return false;
        }
        if !self.play_type.is_empty() && !self.play_type.contains(&play.play_type) {
            return false;
        }
        if !self.difficulty.is_empty()
            && !self.difficulty.contains(play.effective_difficulty().as_str())
        {
            return false;
        }
        if !self.formation.is_empty() && !self.formation.contains(&play.formation) {
            return false;
        }
        if !self.tags.is_empty() && !play.tags().iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        self.date_range.contains(play.created_at)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Field a result list can be ordered by.
///
/// `Other` keeps whatever name the caller sent; it sorts as a no-op so a
/// stale or misspelled field never breaks the list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortField {
    Name,
    Formation,
    Phase,
    Type,
    Description,
    Difficulty,
    Id,
    CreatedAt,
    Other(String),
}

impl SortField {
    pub fn as_str(&self) -> &str {
        match self {
            SortField::Name => "name",
            SortField::Formation => "formation",
            SortField::Phase => "phase",
            SortField::Type => "type",
            SortField::Description => "description",
            SortField::Difficulty => "difficulty",
            SortField::Id => "id",
            SortField::CreatedAt => "createdAt",
            SortField::Other(name) => name,
        }
    }

    /// Compare two plays on this field, ascending.
    pub fn compare(&self, a: &Play, b: &Play) -> Ordering {
        match self {
            SortField::Name => collate(&a.name, &b.name),
            SortField::Formation => collate(&a.formation, &b.formation),
            SortField::Phase => collate(&a.phase, &b.phase),
            SortField::Type => collate(&a.play_type, &b.play_type),
            SortField::Id => collate(&a.id, &b.id),
            // Absent values sort as the empty string to keep the order total
            SortField::Description => collate(
                a.description.as_deref().unwrap_or(""),
                b.description.as_deref().unwrap_or(""),
            ),
            SortField::Difficulty => collate(
                a.difficulty.map(|d| d.as_str()).unwrap_or(""),
                b.difficulty.map(|d| d.as_str()).unwrap_or(""),
            ),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Other(_) => Ordering::Equal,
        }
    }
}

impl FromStr for SortField {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        Ok(match normalized.as_str() {
            "name" => SortField::Name,
            "formation" => SortField::Formation,
            "phase" => SortField::Phase,
            "type" | "playtype" => SortField::Type,
            "description" => SortField::Description,
            "difficulty" => SortField::Difficulty,
            "id" => SortField::Id,
            "createdat" | "created" | "date" => SortField::CreatedAt,
            _ => SortField::Other(s.to_string()),
        })
    }
}

impl From<String> for SortField {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(field) => field,
            Err(never) => match never {},
        }
    }
}

impl From<SortField> for String {
    fn from(field: SortField) -> Self {
        field.as_str().to_string()
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Comparator honoring direction.
    pub fn compare(&self, a: &Play, b: &Play) -> Ordering {
        let ord = self.field.compare(a, b);
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

impl Default for SortState {
    /// Newest first
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// Immutable snapshot consumed by the query engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryState {
    pub search_query: String,
    pub filters: FilterState,
    pub sorting: SortState,
}

impl QueryState {
    /// Lower-cased whitespace-separated search tokens.
    pub fn search_tokens(&self) -> Vec<String> {
        self.search_query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!("createdAt".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert_eq!("created-at".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert_eq!("Name".parse::<SortField>().unwrap(), SortField::Name);
        assert_eq!(
            "players".parse::<SortField>().unwrap(),
            SortField::Other("players".to_string())
        );
    }

    #[test]
    fn test_sort_field_serde_round_trips_unknown_names() {
        let json = serde_json::to_string(&SortField::Other("routes".into())).unwrap();
        assert_eq!(json, "\"routes\"");
        let back: SortField = serde_json::from_str("\"createdAt\"").unwrap();
        assert_eq!(back, SortField::CreatedAt);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let range = DateRange::new(Some(at(10)), Some(at(20)));
        assert!(range.contains(at(10)));
        assert!(range.contains(at(20)));
        assert!(!range.contains(at(9)));
        assert!(!range.contains(at(21)));
        assert!(DateRange::default().contains(at(0)));
    }

    #[test]
    fn test_tag_filter_needs_any_overlap() {
        let mut filters = FilterState::default();
        filters.set(FilterField::Tags, ["goal line", "red zone"]);

        let tagged = Play::new("a", "A", at(0)).with_tags(["red zone", "trick"]);
        let other = Play::new("b", "B", at(0)).with_tags(["trick"]);
        let untagged = Play::new("c", "C", at(0));

        assert!(filters.matches(&tagged));
        assert!(!filters.matches(&other));
        assert!(!filters.matches(&untagged));
    }

    #[test]
    fn test_search_tokens_split_on_any_whitespace() {
        let state = QueryState {
            search_query: "  Pass\tBLUE  ".into(),
            ..Default::default()
        };
        assert_eq!(state.search_tokens(), vec!["pass", "blue"]);
    }
}
