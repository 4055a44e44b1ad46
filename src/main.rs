use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, error, info, instrument, warn};

use tetpbd::{mesh::Spatial, Body, SimParams, TetMesh, World};

/// Placement attempts per body before giving up on it.
const MAX_PLACEMENT_ATTEMPTS: usize = 100;

#[derive(Parser)]
#[command(name = "tetpbd")]
#[command(about = "Position based dynamics for tetrahedral soft bodies and rigid spheres")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a tetgen prefix or JSON mesh to binary format
    Export {
        /// Input mesh (tetgen prefix, .json or .bin)
        #[arg(short, long)]
        input: String,
        /// Output binary file path
        #[arg(short, long)]
        output: String,
        /// Recentre on the ground and scale to this bounding-box diagonal
        #[arg(long)]
        fit: Option<f32>,
    },
    /// Print mesh statistics
    Info {
        /// Mesh to inspect
        mesh: String,
    },
    /// Run a headless simulation
    Run {
        /// Mesh for the soft bodies; a block of cells when omitted
        mesh: Option<String>,
        /// JSON file with simulation parameters
        #[arg(short, long)]
        config: Option<String>,
        /// Number of soft bodies
        #[arg(long, default_value_t = 1)]
        bodies: usize,
        /// Number of spheres
        #[arg(long, default_value_t = 2)]
        spheres: usize,
        /// Number of ticks to simulate
        #[arg(short, long, default_value_t = 500)]
        ticks: u64,
        /// Seed for body placement
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Log a summary every this many ticks
        #[arg(long, default_value_t = 50)]
        report_every: u64,
    },
}

#[instrument]
fn export_mesh(input: &str, output_path: &str, fit: Option<f32>) -> tetpbd::Result<()> {
    let mut mesh = TetMesh::load_mesh(input)?;
    if fit.is_some() {
        mesh.fit_to_ground(fit);
        debug!(bounds = ?mesh.bounds(), "Mesh fitted to the ground");
    }
    mesh.export_to_bincode(output_path)
}

#[instrument]
fn mesh_info(path: &str) -> tetpbd::Result<()> {
    let mesh = TetMesh::load_mesh(path)?;
    let (min, max) = mesh.bounds();
    info!(
        name = %mesh.name,
        vertices = mesh.vert_count(),
        tetrahedra = mesh.tet_count(),
        edges = mesh.edge_count(),
        surface_triangles = mesh.surface_tri_count(),
        volume = mesh.volume(),
        ?min,
        ?max,
        "Mesh statistics"
    );
    Ok(())
}

/// Random offset in `[lo, hi)` per axis, or the midpoint when the range is empty.
fn sample(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
    if lo < hi {
        rng.random_range(lo..hi)
    } else {
        0.5 * (lo + hi)
    }
}

/// Try random offsets until `make` produces a body that overlaps nothing.
fn place<F>(world: &mut World, rng: &mut StdRng, extent: (f32, f32), mut make: F) -> tetpbd::Result<bool>
where
    F: FnMut(&World, [f32; 3]) -> tetpbd::Result<Body>,
{
    let bound = world.params().bound;
    let (half_width, height) = extent;
    for attempt in 0..MAX_PLACEMENT_ATTEMPTS {
        let offset = [
            sample(rng, -bound + half_width, bound - half_width),
            sample(rng, 0.5, 0.5 + 2.0 * height.max(1.0)),
            sample(rng, -bound + half_width, bound - half_width),
        ];
        let body = make(&*world, offset)?;
        if !world.overlaps_any(&body) {
            let id = world.add_body(body);
            debug!(id, attempt, ?offset, "Placed body");
            return Ok(true);
        }
    }
    Ok(false)
}

#[instrument(skip(params))]
fn run_simulation(
    params: SimParams,
    mesh_path: Option<&str>,
    bodies: usize,
    spheres: usize,
    ticks: u64,
    seed: u64,
    report_every: u64,
) -> tetpbd::Result<()> {
    let mut mesh = match mesh_path {
        Some(path) => TetMesh::load_mesh(path)?,
        None => TetMesh::block(3, 3, 3, 0.2),
    };
    // Centre the rest shape so offsets place the body's footprint.
    mesh.fit_to_ground(None);
    let (min, max) = mesh.bounds();
    let mesh_extent = (0.5 * (max[0] - min[0]).max(max[2] - min[2]), max[1] - min[1]);

    let mut world = World::new(params)?;
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..bodies {
        if !place(&mut world, &mut rng, mesh_extent, |w, at| w.make_soft_body(&mesh, at))? {
            warn!(attempts = MAX_PLACEMENT_ATTEMPTS, "No free spot for soft body");
        }
    }
    let radius = world.params().sphere_radius;
    for _ in 0..spheres {
        if !place(&mut world, &mut rng, (radius, 2.0 * radius), World::make_sphere)? {
            warn!(attempts = MAX_PLACEMENT_ATTEMPTS, "No free spot for sphere");
        }
    }
    info!(bodies = world.len(), ticks, "Starting simulation");

    let report_every = report_every.max(1);
    for _ in 0..ticks {
        world.step();
        if world.tick() % report_every == 0 {
            info!(
                tick = world.tick(),
                volume_ratio = world.volume_ratio(),
                lowest_point = world.lowest_point(),
                "Simulation progress"
            );
        }
    }

    for (id, body) in world.bodies().iter().enumerate() {
        let (min, max) = body.bounding_box();
        info!(id, kind = body.kind(), ?min, ?max, "Final body bounds");
    }
    Ok(())
}

fn main() {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export { input, output, fit } => export_mesh(&input, &output, fit),
        Commands::Info { mesh } => mesh_info(&mesh),
        Commands::Run {
            mesh,
            config,
            bodies,
            spheres,
            ticks,
            seed,
            report_every,
        } => config
            .as_deref()
            .map_or_else(|| Ok(SimParams::default()), SimParams::from_json)
            .and_then(|params| {
                run_simulation(params, mesh.as_deref(), bodies, spheres, ticks, seed, report_every)
            }),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}
