//! Data model shared by every engine component.

pub mod play;
pub mod query;
pub mod thumbnail;

pub use play::{Difficulty, FIELD_HEIGHT, FIELD_WIDTH, Play, PlayPatch, PlayerMark, Point, Route};
pub use query::{DateRange, FilterField, FilterState, QueryState, SortDirection, SortField, SortState};
pub use thumbnail::{Thumbnail, ThumbnailFormat, ThumbnailOptions};
