use clap::Parser;
use std::path::PathBuf;

use crate::entities::SortField;

/// Query a play collection and print the visible window
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file holding an array of plays
    #[arg(value_name = "PLAYS_JSON")]
    pub plays: PathBuf,

    /// Free-text search (every word must match)
    #[arg(short = 's', long = "search", value_name = "QUERY")]
    pub search: Option<String>,

    /// Keep plays in this phase (repeatable)
    #[arg(long = "phase", value_name = "PHASE")]
    pub phase: Vec<String>,

    /// Keep plays of this type (repeatable)
    #[arg(long = "type", value_name = "TYPE")]
    pub play_type: Vec<String>,

    /// Keep plays of this difficulty: beginner, intermediate, advanced (repeatable)
    #[arg(long = "difficulty", value_name = "LEVEL")]
    pub difficulty: Vec<String>,

    /// Keep plays using this formation (repeatable)
    #[arg(long = "formation", value_name = "FORMATION")]
    pub formation: Vec<String>,

    /// Keep plays carrying any of these tags (repeatable)
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Sort field: name, formation, phase, type, description, difficulty, id, createdAt
    #[arg(long = "sort", value_name = "FIELD")]
    pub sort: Option<SortField>,

    /// Sort descending (default: ascending when --sort is given)
    #[arg(long = "desc")]
    pub desc: bool,

    /// Override max results kept after sorting
    #[arg(short = 'n', long = "max-items", value_name = "N")]
    pub max_items: Option<usize>,

    /// Viewport height in pixels
    #[arg(long = "viewport", value_name = "PX", default_value_t = 600.0)]
    pub viewport: f32,

    /// Scroll offset in pixels
    #[arg(long = "scroll", value_name = "PX", default_value_t = 0.0)]
    pub scroll: f32,

    /// Lay results out in a grid instead of a list
    #[arg(short = 'g', long = "grid")]
    pub grid: bool,

    /// Write thumbnails for the visible window into DIR
    #[arg(long = "thumbnails", value_name = "DIR")]
    pub thumbnails: Option<PathBuf>,

    /// Config file (default: PLAYBOOK_CONFIG, ./playbook.json, then the platform config dir)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print metrics as JSON instead of a table
    #[arg(long = "json")]
    pub json: bool,

    /// Log to file instead of stderr
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Log level name for the `-v` count
    pub fn log_level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_query() {
        let args = Args::try_parse_from([
            "playbook",
            "plays.json",
            "--search",
            "slant",
            "--phase",
            "Offense",
            "--phase",
            "Special Teams",
            "--sort",
            "created-at",
            "--desc",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.phase, vec!["Offense", "Special Teams"]);
        assert_eq!(args.sort, Some(SortField::CreatedAt));
        assert!(args.desc);
        assert_eq!(args.log_level(), "debug");
        assert_eq!(args.viewport, 600.0);
    }

    #[test]
    fn test_plays_path_required() {
        assert!(Args::try_parse_from(["playbook"]).is_err());
    }
}
