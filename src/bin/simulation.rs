// Simulateur de colonie Outpost
// Génère ou charge un site, exécute les tours à intervalle fixe puis sauvegarde le résultat

use outpost::colony::{Colony, ColonyEvent};
use outpost::config::Config;
use outpost::persistence::{load_snapshot, save_snapshot};
use outpost::structure::{ConnectorDir, Structure, StructureClass, StructureState};
use outpost::terrain::{HeightSource, ImageHeightSource, NoiseHeightSource};
use outpost::types::{DEPTH_SURFACE, MapCoordinate, TerrainType};

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the colony world model headless")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Heightmap image; Perlin noise is used when absent
    #[arg(long)]
    heightmap: Option<PathBuf>,

    /// Map generation seed, overrides the configuration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of turns to run
    #[arg(short, long, default_value_t = 100)]
    ticks: u64,

    /// Milliseconds between turns
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Write a snapshot here when the run ends
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume from this snapshot instead of generating a new site
    #[arg(long)]
    load: Option<PathBuf>,
}

/// Command post, two tubes and a mine facility, west to east, at the first
/// deposit with clear ground beside it.
fn lay_out_outpost(colony: &mut Colony) -> Result<bool, Box<dyn std::error::Error>> {
    let site = colony.map().mine_locations().iter().copied().find(|&deposit| {
        (1..=3).all(|dx| {
            colony
                .map()
                .tile(MapCoordinate::at(deposit.offset(-dx, 0), DEPTH_SURFACE))
                .is_ok_and(|tile| tile.is_empty() && !tile.has_mine() && tile.terrain() != TerrainType::Impassable)
        })
    });
    let Some(deposit) = site else {
        return Ok(false);
    };

    let at = |dx: i32| MapCoordinate::at(deposit.offset(dx, 0), DEPTH_SURFACE);
    colony.place_structure(Structure::new(StructureClass::Command, at(-3)).with_state(StructureState::Operational))?;
    for dx in [-2, -1] {
        colony.place_structure(Structure::tube(ConnectorDir::EastWest, at(dx)).with_state(StructureState::Operational))?;
    }
    colony.build_mine_facility(deposit)?;
    colony.map_mut().center_on(deposit);
    tracing::info!(x = deposit.x, y = deposit.y, "outpost laid out");
    Ok(true)
}

fn handle_event(colony: &mut Colony, event: ColonyEvent) {
    tracing::info!(?event, turn = colony.turn(), "colony event");
    if let ColonyEvent::MineExhausted { structure } = event {
        if colony.extend_mine(structure).is_ok() {
            tracing::info!(id = structure.0, "digging deeper");
            return;
        }
        match colony.remove_exhausted_mine(structure) {
            Ok(mine) => tracing::info!(id = structure.0, depth = mine.depth(), "mine closed"),
            Err(err) => tracing::warn!(%err, id = structure.0, "could not close mine"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("outpost=info,simulation=info")),
        )
        .init();

    let args = Args::parse();

    // === PHASE 1: CONFIGURATION ===

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let snapshot = args.load.as_ref().map(|path| load_snapshot(path)).transpose()?;
    match &snapshot {
        // A saved game keeps the site it was played on.
        Some(snapshot) => {
            if args.seed.is_some_and(|seed| snapshot.site.seed != Some(seed)) {
                tracing::warn!("ignoring --seed, the snapshot records its own site");
            }
            snapshot.site.apply(&mut config.map);
        }
        None if args.seed.is_some() => config.map.seed = args.seed,
        None => {}
    }
    let seed = *config.map.seed.get_or_insert_with(rand::random::<u64>);
    tracing::info!(seed, width = config.map.width, height = config.map.height, "configuration ready");

    // === PHASE 2: CHARGEMENT DU SITE ===

    let heights: Box<dyn HeightSource> = match &args.heightmap {
        Some(path) => Box::new(ImageHeightSource::open(path)?),
        None => Box::new(NoiseHeightSource::for_site(&config.map, seed)),
    };

    let mut colony = match &snapshot {
        Some(snapshot) => Colony::restore(config, heights.as_ref(), snapshot)?,
        None => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut colony = Colony::generate(config, heights.as_ref(), &mut rng)?;
            if !lay_out_outpost(&mut colony)? {
                tracing::warn!("no deposit with room for an outpost");
            }
            colony
        }
    };
    tracing::info!("{}", colony.status());

    // === PHASE 3: BOUCLE DE SIMULATION ===

    let mut interval = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    for _ in 0..args.ticks {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }

        for event in colony.tick() {
            handle_event(&mut colony, event);
        }
        if colony.turn() % 10 == 0 {
            tracing::info!("{}", colony.status());
        }
    }

    // === PHASE 4: SAUVEGARDE ===

    tracing::info!("{}", colony.status());
    if let Some(path) = &args.save {
        save_snapshot(path, &colony.snapshot())?;
    }
    Ok(())
}
