use std::convert::Infallible;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use parkscape_assets::TemplateStore;
use parkscape_generate::{
    DispatchTable, GenerationConfig, MapGenerator, SubpositionCache, TrackStyle,
};
use parkscape_kernel::world::{DOUBLE_STRAIGHT, QUARTER_TURN, STRAIGHT};
use parkscape_kernel::{SimulationProvider, TileCounts, World};
use parkscape_render::SceneRecorder;
use parkscape_stream::{CooperativeRunner, GridSize, GridWalk, Progress, ProgressSink, SchedulerConfig};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parkscape-cli", about = "Generate 3D scenes from a procedural park map")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Map width in tiles, border included
    #[arg(long, default_value = "32")]
    width: u32,

    /// Map height in tiles, border included
    #[arg(long, default_value = "32")]
    height: u32,

    /// Seed for the procedural park
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// JSON file with scheduler and generation settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print map statistics
    Info,
    /// Run scene generation and print a summary of the placements
    Generate {
        /// How track pieces are rendered; overrides the config file
        #[arg(long, value_enum)]
        tracks: Option<TrackArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TrackArg {
    Mesh,
    Subpositions,
}

impl From<TrackArg> for TrackStyle {
    fn from(arg: TrackArg) -> Self {
        match arg {
            TrackArg::Mesh => TrackStyle::Mesh,
            TrackArg::Subpositions => TrackStyle::Subpositions,
        }
    }
}

/// Settings file layout. Missing sections and fields take their defaults.
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct CliConfig {
    scheduler: SchedulerConfig,
    generation: GenerationConfig,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Prints one line per progress update.
#[derive(Default)]
struct TerminalProgress {
    updates: usize,
}

impl ProgressSink for TerminalProgress {
    fn update(&mut self, progress: &Progress) {
        self.updates += 1;
        println!("  {progress} ({:.0}%)", progress.fraction() * 100.0);
    }

    fn hide(&mut self) {
        println!("  done after {} updates", self.updates);
    }
}

/// Map-wide element counts. Per-tile counts are small; whole maps are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MapTally {
    total: u64,
    surfaces: u64,
    paths: u64,
    tracks: u64,
    small_scenery: u64,
    entrances: u64,
    walls: u64,
    large_scenery: u64,
    banners: u64,
}

impl MapTally {
    fn add(&mut self, counts: &TileCounts) {
        self.total += u64::from(counts.total);
        self.surfaces += u64::from(counts.surfaces);
        self.paths += u64::from(counts.paths);
        self.tracks += u64::from(counts.tracks);
        self.small_scenery += u64::from(counts.small_scenery);
        self.entrances += u64::from(counts.entrances);
        self.walls += u64::from(counts.walls);
        self.large_scenery += u64::from(counts.large_scenery);
        self.banners += u64::from(counts.banners);
    }
}

fn tally(world: &World) -> anyhow::Result<MapTally> {
    let size = world.map_size();
    let mut totals = MapTally::default();
    let walk = GridWalk::new(
        "Counting tiles...",
        GridSize::new(size.width, size.height),
        |cell| {
            totals.add(&world.tile_counts(cell.x, cell.y));
            Ok::<(), Infallible>(())
        },
    );
    for step in walk {
        step?;
    }
    Ok(totals)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    let world = World::procedural(cli.width, cli.height, cli.seed);

    match cli.command {
        Commands::Info => {
            println!("parkscape-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "Map: {}x{} tiles, seed={}, elements={}",
                cli.width,
                cli.height,
                cli.seed,
                world.element_count()
            );
            let counts = tally(&world)?;
            println!(
                "Surfaces: {}  Paths: {}  Tracks: {}  Scenery: {}  Walls: {}  Entrances: {}  Banners: {}",
                counts.surfaces,
                counts.paths,
                counts.tracks,
                counts.small_scenery + counts.large_scenery,
                counts.walls,
                counts.entrances,
                counts.banners
            );
            for track_type in [STRAIGHT, QUARTER_TURN, DOUBLE_STRAIGHT] {
                println!(
                    "Track type {track_type}: {} waypoints",
                    world.route_length(track_type)
                );
            }
        }
        Commands::Generate { tracks } => {
            if let Some(tracks) = tracks {
                config.generation.track_style = tracks.into();
            }

            let mut store = TemplateStore::new();
            let dispatch = DispatchTable::standard(&mut store, config.generation.track_style)?;

            println!(
                "Generating {}x{} park (seed={}, tracks={:?})",
                cli.width, cli.height, cli.seed, config.generation.track_style
            );
            let mut generator = MapGenerator::new(config.generation, dispatch);
            let mut cache = SubpositionCache::new();
            let mut scene = SceneRecorder::new();

            let run = generator.run(&world, &mut cache, &mut scene);
            let mut runner = CooperativeRunner::with_wall_clock(run, config.scheduler);
            let mut surface = TerminalProgress::default();
            let summary = runner.run_to_completion(&mut surface);
            let report = runner.into_inner().finish()?;

            print!("{}", scene.describe());
            println!(
                "Tiles: {}  Elements: {}  Placements: {}  Slices: {} (longest {:?})",
                report.tiles,
                report.elements,
                report.total_placements(),
                summary.slices,
                summary.longest_slice
            );
            for (kind, count) in &report.placements {
                println!("  {}: {count}", kind.name());
            }
            println!(
                "Route cache: {} hits, {} misses  Piece cache: {} hits, {} misses  Elapsed: {:?}",
                report.cache.hits,
                report.cache.misses,
                report.cache.piece_hits,
                report.cache.piece_misses,
                report.elapsed
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    #[test]
    fn no_config_file_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "scheduler": {{ "update_interval_ms": 40 }}, "generation": {{ "skip_border": false }} }}"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.scheduler.update_interval, Duration::from_millis(40));
        assert_eq!(config.scheduler.timer_history, SchedulerConfig::default().timer_history);
        assert!(!config.generation.skip_border);
        assert_eq!(config.generation.track_style, TrackStyle::Mesh);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().starts_with("parsing config"));
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(err.to_string().starts_with("reading config"));
    }

    #[test]
    fn tally_matches_element_count() {
        let world = World::procedural(12, 12, 3);
        let counts = tally(&world).unwrap();
        assert_eq!(counts.total as usize, world.element_count());
        // The border stays empty.
        assert_eq!(counts.surfaces, 100);
    }

    #[test]
    fn tally_sums_past_per_tile_range() {
        let world = World::procedural(300, 300, 1);
        let counts = tally(&world).unwrap();
        assert_eq!(counts.surfaces, 298 * 298);
        assert_eq!(counts.total, world.element_count() as u64);
        assert!(counts.total > u64::from(u16::MAX));
    }

    #[test]
    fn generate_takes_no_template_output() {
        assert!(Cli::try_parse_from(["parkscape-cli", "generate", "--save-templates", "t.json"]).is_err());
    }

    #[test]
    fn cli_parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "parkscape-cli",
            "--width",
            "16",
            "generate",
            "--tracks",
            "subpositions",
        ])
        .unwrap();
        assert_eq!(cli.width, 16);
        assert_eq!(cli.height, 32);
        assert!(matches!(
            cli.command,
            Commands::Generate {
                tracks: Some(TrackArg::Subpositions),
                ..
            }
        ));
    }
}
