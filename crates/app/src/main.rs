mod file_storage;

use std::path::PathBuf;

use beatmap_editor_core::{EditorConfig, MapEditor, NullRenderer};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::file_storage::JsonFileStorage;

type Editor = MapEditor<JsonFileStorage, NullRenderer>;

fn main() -> beatmap_editor_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { map } => run_inspect(&map),
        Commands::Quantize { map } => run_edit(&map, "quantize", |editor| editor.quantize_selection()),
        Commands::Mirror { map } => run_edit(&map, "mirror", |editor| editor.mirror_selection()),
        Commands::Shift { map, beats, cols } => run_edit(&map, "shift", |editor| {
            let mut applied = true;
            if beats != 0.0 {
                applied &= editor.shift_selection_by_beat(beats)?;
            }
            if cols != 0 {
                applied &= editor.shift_selection_by_col(cols)?;
            }
            Ok(applied)
        }),
    }
}

fn open_editor(map: &MapArgs) -> beatmap_editor_core::Result<Editor> {
    let config = match &map.config {
        Some(path) => EditorConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EditorConfig::default(),
    };
    let storage = JsonFileStorage::open(&map.input)?;
    let mut editor = MapEditor::open(storage, NullRenderer, config, map.song_duration)?;
    if editor.difficulty_count() > 0 {
        editor.select_difficulty(map.difficulty)?;
    }
    Ok(editor)
}

fn run_inspect(map: &MapArgs) -> beatmap_editor_core::Result<()> {
    let editor = open_editor(map)?;
    tracing::info!(
        global_bpm = editor.global_bpm(),
        total_beats = editor.total_beats(),
        difficulties = editor.difficulty_count(),
        "map summary"
    );
    let Some(difficulty) = editor.current_difficulty() else {
        tracing::warn!("map has no difficulties");
        return Ok(());
    };
    println!("{}", serde_json::to_string_pretty(&difficulty.snapshot())?);
    Ok(())
}

/// Selects every note of the chosen difficulty, applies `edit` and saves
/// when it changed something.
fn run_edit<F>(map: &MapArgs, label: &str, edit: F) -> beatmap_editor_core::Result<()>
where
    F: FnOnce(&mut Editor) -> beatmap_editor_core::Result<bool>,
{
    let mut editor = open_editor(map)?;
    editor.select_all()?;
    if !edit(&mut editor)? {
        tracing::warn!(label, "edit rejected, map left unchanged");
        return Ok(());
    }
    if !editor.is_dirty() {
        tracing::info!(label, "nothing to change");
        return Ok(());
    }
    let output = output_path(map);
    editor.storage_mut().set_path(output.clone());
    editor.save()?;
    tracing::info!(label, ?output, "edit applied");
    Ok(())
}

fn output_path(map: &MapArgs) -> PathBuf {
    map.output.clone().unwrap_or_else(|| map.input.clone())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch edits for rhythm game beatmaps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct MapArgs {
    /// JSON map document to load.
    input: PathBuf,
    /// Difficulty slot to work on.
    #[arg(short, long, default_value_t = 0)]
    difficulty: usize,
    /// Song length in seconds; notes past it are rejected.
    #[arg(long, default_value_t = 600.0)]
    song_duration: f64,
    /// Optional editor configuration (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Where to write the edited map. Defaults to overwriting the input.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a difficulty's notes, tempo changes and bookmarks.
    Inspect {
        #[command(flatten)]
        map: MapArgs,
    },
    /// Snap every note to its local grid.
    Quantize {
        #[command(flatten)]
        map: MapArgs,
    },
    /// Mirror every note across the lanes.
    Mirror {
        #[command(flatten)]
        map: MapArgs,
    },
    /// Move every note by a beat and/or column offset.
    Shift {
        #[command(flatten)]
        map: MapArgs,
        /// Beat offset, may be negative.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        beats: f64,
        /// Column offset, may be negative.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        cols: i32,
    },
}
