use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

use grid_traffic_sim::simulation::{
    test_world_spawn_points, Coordinate, MapLayout, SimConfig, SimWorld, SymbolDictionary,
    DEFAULT_LIGHT_TOGGLE_PERIOD, DEFAULT_SPAWN_INTERVAL, TEST_WORLD_MAP,
};

#[derive(Parser)]
#[command(name = "grid_traffic_sim")]
#[command(about = "Headless grid traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "200")]
    ticks: u32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Map file, one symbol per cell. The built-in demo map is used when absent
    #[arg(long)]
    map: Option<PathBuf>,

    /// Spawn point as `x,y`, repeat for several
    #[arg(long = "spawn", value_parser = parse_coordinate)]
    spawn_points: Vec<Coordinate>,

    /// Ticks between global light flips, 0 freezes the lights
    #[arg(long, default_value_t = DEFAULT_LIGHT_TOGGLE_PERIOD)]
    light_period: u32,

    /// Ticks between spawn attempts, 0 disables spawning
    #[arg(long, default_value_t = DEFAULT_SPAWN_INTERVAL)]
    spawn_interval: u32,

    /// Print the summary and map every N ticks
    #[arg(long, default_value = "20")]
    report_every: u32,

    /// Only log the final statistics
    #[arg(long)]
    quiet: bool,
}

fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", value))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in '{}': {}", value, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in '{}': {}", value, e))?;
    Ok(Coordinate::new(x, y))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut world = build_world(&cli)?;
    run_headless(&mut world, &cli);
    Ok(())
}

fn build_world(cli: &Cli) -> Result<SimWorld> {
    let (layout, default_spawn_points) = match &cli.map {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read map {}", path.display()))?;
            let layout = MapLayout::from_text(&text)
                .with_context(|| format!("Invalid map {}", path.display()))?;
            (layout, Vec::new())
        }
        None => (MapLayout::from_text(TEST_WORLD_MAP)?, test_world_spawn_points()),
    };

    let spawn_points = if cli.spawn_points.is_empty() {
        default_spawn_points
    } else {
        cli.spawn_points.clone()
    };
    if spawn_points.is_empty() {
        warn!("No spawn points given, no vehicles will enter the map");
    }

    let config = SimConfig {
        light_toggle_period: (cli.light_period > 0).then_some(cli.light_period),
        spawn_interval: (cli.spawn_interval > 0).then_some(cli.spawn_interval),
        spawn_points,
    };

    let dictionary = SymbolDictionary::standard();
    match cli.seed {
        Some(seed) => SimWorld::new_with_seed(&layout, &dictionary, config, seed),
        None => SimWorld::new(&layout, &dictionary, config),
    }
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(world: &mut SimWorld, cli: &Cli) {
    info!("Running grid traffic simulation for {} ticks", cli.ticks);

    if !cli.quiet {
        println!("Initial state:");
        world.print_summary();
        world.draw_map();
    }

    for tick in 1..=cli.ticks {
        world.tick();

        if !cli.quiet && cli.report_every > 0 && tick % cli.report_every == 0 {
            println!("--- After tick {} ---", tick);
            world.print_summary();
            world.draw_map();
        }
    }

    if !cli.quiet {
        println!("=== Final State ===");
        world.print_summary();
        world.draw_map();
    }

    let stats = world.stats();
    info!("=== SIMULATION COMPLETE ===");
    info!("Ticks run: {}", stats.step);
    info!("Total vehicles spawned: {}", stats.total_spawned);
    info!("Total vehicles arrived: {}", stats.total_arrived);
    info!("Active vehicles: {}", stats.active_vehicles);
    info!("Blocked vehicles: {}", stats.blocked_vehicles);
    info!("Success rate: {:.1}%", stats.success_rate());
}
