//! End-to-end scenarios through the public library API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use futures::executor::block_on;

use playbook::core::window::ViewMode;
use playbook::entities::{FilterField, PlayerMark, Point, Route, SortField, ThumbnailFormat};
use playbook::{LibraryConfig, LibraryEvent, Play, PlayLibrary, PlayPatch, ThumbnailCache, ThumbnailOptions};

fn at(day: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + day * 86_400, 0).unwrap()
}

fn library(plays: Vec<Play>) -> PlayLibrary {
    PlayLibrary::new(plays, LibraryConfig::default(), Arc::new(ThumbnailCache::default())).unwrap()
}

fn ids(lib: &mut PlayLibrary) -> Vec<String> {
    lib.filtered_plays().iter().map(|p| p.id.clone()).collect()
}

const PLAYS_JSON: &str = r##"[
    {
        "id": "a", "name": "Slant Right", "formation": "Shotgun", "phase": "Offense",
        "type": "Pass", "createdAt": "2024-01-01T00:00:00Z", "difficulty": "beginner",
        "tags": ["quick"],
        "players": [{ "id": "p1", "x": 300, "y": 150, "number": "12" }],
        "routes": [{ "id": "r1", "playerId": "p1", "points": [{"x": 300, "y": 150}, {"x": 360, "y": 90}] }]
    },
    {
        "id": "b", "name": "Cover 2", "formation": "Nickel", "phase": "Defense",
        "type": "Zone", "createdAt": "2024-01-02T00:00:00Z"
    },
    {
        "id": "c", "name": "Power Left", "formation": "I-Form", "phase": "Offense",
        "type": "Run", "createdAt": "2024-01-03T00:00:00Z", "difficulty": "advanced",
        "description": "Pulling guard leads through the B gap"
    }
]"##;

#[test]
fn offense_filter_returns_newest_first() {
    let plays: Vec<Play> = serde_json::from_str(PLAYS_JSON).unwrap();
    let mut lib = library(plays);

    lib.update_filter(FilterField::Phase, ["Offense"]);
    assert_eq!(ids(&mut lib), vec!["c", "a"]);

    lib.toggle_sorting(SortField::Name);
    assert_eq!(ids(&mut lib), vec!["c", "a"]);
    lib.toggle_sorting(SortField::Name);
    assert_eq!(ids(&mut lib), vec!["a", "c"]);

    lib.update_filter(FilterField::Difficulty, ["intermediate"]);
    assert!(ids(&mut lib).is_empty());

    lib.reset_filters();
    assert_eq!(ids(&mut lib), vec!["c", "b", "a"]);
}

#[test]
fn in_place_update_reaches_next_query() {
    let plays: Vec<Play> = serde_json::from_str(PLAYS_JSON).unwrap();
    let mut lib = library(plays);
    lib.commit_search_now("gap");
    assert_eq!(ids(&mut lib), vec!["c"]);

    let patch = PlayPatch {
        description: Some("Toss to the edge".into()),
        ..Default::default()
    };
    assert!(lib.update_play("c", &patch));
    assert_eq!(lib.collection_version(), 1);
    assert!(ids(&mut lib).is_empty());

    let events = lib.events().poll();
    assert!(events
        .iter()
        .any(|e| matches!(e, LibraryEvent::PlayUpdated(p) if p.id == "c")));
}

#[test]
fn typing_burst_commits_last_query_once() {
    let plays: Vec<Play> = serde_json::from_str(PLAYS_JSON).unwrap();
    let mut lib = library(plays);
    let t0 = Instant::now();

    for (i, text) in ["c", "co", "cov", "cover"].iter().enumerate() {
        let now = t0 + Duration::from_millis(i as u64 * 50);
        lib.set_search_query_at(*text, now);
        assert!(!lib.tick_at(now));
    }
    // Deadline runs from the last keystroke
    assert!(!lib.tick_at(t0 + Duration::from_millis(400)));
    assert!(lib.tick_at(t0 + Duration::from_millis(460)));

    assert_eq!(lib.query().search_query, "cover");
    assert_eq!(ids(&mut lib), vec!["b"]);
    assert_eq!(lib.performance_metrics().search_count, 1);
}

#[test]
fn window_covers_viewport_plus_overscan() {
    let plays: Vec<Play> = (0..100).map(|i| Play::new(format!("p{}", i), "Play", at(i))).collect();
    let mut lib = library(plays);

    let visible = lib.visible_plays();
    // 600px viewport / 120px rows = 5 rows, plus 5 below
    assert_eq!(visible.len(), 10);
    assert_eq!(visible[0].0, 0);
    assert_eq!(lib.window().total_height(), 12_000.0);

    lib.on_scroll(6_000.0);
    let visible = lib.visible_plays();
    assert_eq!(visible.first().map(|(i, _)| *i), Some(45));
    assert_eq!(visible.last().map(|(i, _)| *i), Some(59));

    lib.set_view_mode(ViewMode::Grid);
    lib.filtered_plays();
    assert_eq!(lib.window().total_height(), 50.0 * 200.0);

    lib.scroll_to_top();
    assert_eq!(lib.window().state().scroll_offset, 0.0);
}

#[test]
fn thumbnails_render_once_and_are_shared() {
    let play = Play::new("t", "Trips", at(0))
        .with_players(vec![PlayerMark::new("p1", 300.0, 150.0, "7").with_color("#ef4444")])
        .with_routes(vec![Route::new(
            "r1",
            "p1",
            vec![Point::new(300.0, 150.0), Point::new(420.0, 60.0)],
        )]);
    let cache = Arc::new(ThumbnailCache::default());
    let options = ThumbnailOptions::default();

    let first = block_on(cache.get(&play, &options)).unwrap();
    let second = block_on(cache.get(&play, &options)).unwrap();
    assert_eq!(first, second);
    assert_eq!((first.width(), first.height()), (200, 120));
    assert_eq!(&first.bytes()[..2], &[0xFF, 0xD8]);
    assert!(first.to_data_url().starts_with("data:image/jpeg;base64,"));

    let png_options = ThumbnailOptions {
        format: ThumbnailFormat::Png,
        ..ThumbnailOptions::default()
    };
    let png = block_on(cache.get(&play, &png_options)).unwrap();
    assert_eq!(&png.bytes()[..4], b"\x89PNG");

    let stats = cache.stats();
    assert_eq!(stats.renders, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(cache.len(), 2);

    // The library shares the injected cache
    let mut lib = PlayLibrary::new(vec![play], LibraryConfig::default(), Arc::clone(&cache)).unwrap();
    let report = block_on(lib.load_visible(&options));
    assert_eq!(report.loaded, vec![0]);
    assert_eq!(cache.stats().renders, 2);
    assert!(lib.window().is_thumbnail_loaded(0));
}
