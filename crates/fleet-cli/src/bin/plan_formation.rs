//! Print formation waypoints for a zone.

use clap::Parser;
use fleet_cli::{init_tracing, parse_bounds};
use fleet_core::{formation, FormationKind, ZoneBounds};
use fleet_sim::fleet::generate_drone_id;
use serde_json::json;

/// Compute formation waypoints over a rectangular zone
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Zone as north,south,east,west
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    zone: ZoneBounds,

    /// Formation to compute (all formations when omitted)
    #[arg(long)]
    formation: Option<FormationKind>,

    /// Number of drones, named DRONE_000, DRONE_001, ...
    #[arg(long, default_value_t = 3)]
    drones: usize,

    /// Explicit drone ids (overrides --drones)
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&["plan_formation=info"], false)?;

    let drone_ids: Vec<String> = if args.ids.is_empty() {
        (0..args.drones).map(generate_drone_id).collect()
    } else {
        args.ids.clone()
    };

    let kinds: Vec<FormationKind> = match args.formation {
        Some(kind) => vec![kind],
        None => FormationKind::ALL.to_vec(),
    };

    let formations: Vec<_> = kinds
        .iter()
        .map(|kind| {
            let waypoints = formation::calculate(&args.zone, *kind, &drone_ids);
            tracing::debug!("{}: {} waypoint(s)", kind, waypoints.len());
            json!({
                "formation": kind,
                "waypoints": waypoints,
            })
        })
        .collect();

    let output = json!({
        "zone": args.zone,
        "area_km2": args.zone.area_km2(),
        "formations": formations,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
