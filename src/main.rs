use playbook::cli::Args;
use playbook::core::window::ViewMode;
use playbook::entities::{FilterField, Play, SortDirection, SortState};
use playbook::paths;
use playbook::{LibraryConfig, PlayLibrary, ThumbnailCache};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;

fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()));
    builder.format_timestamp_millis();

    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();

    if let Some(path) = &args.log_file {
        info!("Logging to file: {} (level: {})", path.display(), args.log_level());
    }
    Ok(())
}

fn load_plays(path: &Path) -> Result<Vec<Play>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plays: {}", path.display()))?;
    let plays: Vec<Play> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse plays: {}", path.display()))?;
    info!("Loaded {} plays from {}", plays.len(), path.display());
    Ok(plays)
}

/// Play ids are free text; keep file names portable
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn apply_query(library: &mut PlayLibrary, args: &Args) {
    if let Some(search) = &args.search {
        library.commit_search_now(search.clone());
    }
    let axes = [
        (FilterField::Phase, &args.phase),
        (FilterField::Type, &args.play_type),
        (FilterField::Difficulty, &args.difficulty),
        (FilterField::Formation, &args.formation),
        (FilterField::Tags, &args.tags),
    ];
    for (field, values) in axes {
        if !values.is_empty() {
            library.update_filter(field, values.iter().cloned());
        }
    }

    let direction = if args.desc { SortDirection::Desc } else { SortDirection::Asc };
    match &args.sort {
        Some(field) => library.set_sorting(SortState::new(field.clone(), direction)),
        None if args.desc => {
            let field = library.query().sorting.field.clone();
            library.set_sorting(SortState::new(field, SortDirection::Desc));
        }
        None => {}
    }
}

fn export_thumbnails(library: &mut PlayLibrary, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create thumbnail directory: {}", dir.display()))?;

    let options = library.config().thumbnail.clone();
    let report = futures::executor::block_on(library.load_visible(&options));
    for (index, err) in &report.failed {
        warn!("Row {} has no thumbnail: {}", index, err);
    }

    let mut written = 0;
    for (_, play) in library.visible_plays() {
        let Some(thumb) = library.thumbnails().peek(&play.id, &options) else {
            continue;
        };
        let path = dir.join(format!("{}.{}", file_stem(&play.id), thumb.format().extension()));
        std::fs::write(&path, thumb.bytes())
            .with_context(|| format!("Failed to write thumbnail: {}", path.display()))?;
        debug!("Wrote {}", path.display());
        written += 1;
    }
    println!("Wrote {} thumbnail(s) to {}", written, dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    debug!("Command-line args: {:?}", args);

    let config_path = paths::config_file(args.config.as_deref());
    info!("Config path: {}", config_path.display());
    let mut config = LibraryConfig::load_or_default(&config_path)?;
    if let Some(max_items) = args.max_items {
        config.max_items = max_items;
    }
    config.validate().context("Invalid command-line overrides")?;

    let plays = load_plays(&args.plays)?;
    let thumbnails = Arc::new(ThumbnailCache::new(
        config.thumbnail_cache_size,
        config.eviction_policy,
        config.preload_batch_size,
    )?);
    let mut library = PlayLibrary::new(plays, config, thumbnails)?;

    apply_query(&mut library, &args);
    library.set_viewport_height(args.viewport);
    if args.grid {
        library.set_view_mode(ViewMode::Grid);
    }

    let total = library.filtered_plays().len();
    library.on_scroll(args.scroll);
    let visible = library.visible_plays();
    library.record_render();

    println!(
        "{} of {} plays match; showing rows {}",
        total,
        library.plays().len(),
        match (visible.first(), visible.last()) {
            (Some((first, _)), Some((last, _))) => format!("{}..={}", first, last),
            _ => "none".to_string(),
        }
    );
    for (index, play) in &visible {
        println!(
            "{:>5}  {:<24} {:<10} {:<12} {:<14} {:<12} {}",
            index,
            play.name,
            play.phase,
            play.play_type,
            play.formation,
            play.effective_difficulty().as_str(),
            play.created_at.format("%Y-%m-%d")
        );
    }

    if let Some(dir) = &args.thumbnails {
        export_thumbnails(&mut library, dir)?;
    }

    let metrics = library.performance_metrics();
    let health = metrics.health();
    if args.json {
        let out = serde_json::json!({ "metrics": metrics, "health": health });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("\n{}", metrics);
        println!(
            "cache efficiency: {:?}, memory: {:?}",
            health.cache_efficiency, health.memory_status
        );
        for alert in &health.alerts {
            println!("! {}", alert);
        }
    }
    Ok(())
}
