use clap::Parser;
use geoscout::{
    load_wordlist, parse_coordinate, Axis, Coordinate, SearchEngine, SearchRequest, SortKey,
};
use std::path::PathBuf;

/// GeoScout — concurrent OpenStreetMap tag search with clustering.
///
/// Searches an area for map features matching tag patterns, enriches each
/// hit, and groups nearby hits into named clusters.
///
/// Examples:
///   geoscout --lat 40.0 --lon -75.0 --radius 1000 --tag amenity=hospital
///   geoscout --lat "40°26'46\"N" --lon "79°58'56\"W" --tag bunker --roads
///   geoscout --poly "40.1,-75.1 40.1,-74.9 39.9,-75.0" --tags-file tags.txt
#[derive(Parser)]
#[command(name = "geoscout", version, about, long_about = None)]
struct Cli {
    /// Latitude of the search center, decimal or DMS (e.g. 40.446 or 40°26'46"N).
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<String>,

    /// Longitude of the search center, decimal or DMS.
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<String>,

    /// Search radius in meters around the center.
    #[arg(long, short = 'r', default_value_t = 1000.0)]
    radius: f64,

    /// Polygon area as space-separated "lat,lon" pairs, instead of --lat/--lon.
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    poly: Option<String>,

    /// Tag pattern to search for (repeatable): "key=value" or a bare keyword.
    #[arg(long = "tag", short = 't')]
    tags: Vec<String>,

    /// File with one tag pattern per line (# comments), unioned with --tag.
    #[arg(long)]
    tags_file: Option<PathBuf>,

    /// File with one exclusion rule per line (# comments).
    #[arg(long)]
    exclude_file: Option<PathBuf>,

    /// Maximum number of results to keep after merging.
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Sort key: "distance" or "name".
    #[arg(long, default_value = "distance")]
    sort: String,

    /// Skip elevation enrichment.
    #[arg(long)]
    no_elevation: bool,

    /// Compute each result's distance to the nearest mapped road.
    #[arg(long)]
    roads: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // ── Assemble the request ────────────────────────────────────

    let mut request = build_request(&cli);

    request.tags = cli.tags.clone();
    if let Some(ref path) = cli.tags_file {
        request.tags.extend(load_words(path));
    }
    if let Some(ref path) = cli.exclude_file {
        request.excluded = load_words(path);
    }

    request.limit = cli.limit;
    request.sort_by = cli.sort.parse::<SortKey>().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    request.include_elevation = !cli.no_elevation;
    request.include_road_distance = cli.roads;

    // ── Search ──────────────────────────────────────────────────

    let engine = SearchEngine::with_defaults().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let groups = engine.search(&request).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // Human summary to stderr
    eprintln!("Found {} group(s)", groups.len());
    for (index, group) in groups.iter().enumerate() {
        match group.centroid() {
            Some(centroid) => eprintln!(
                "  {}. {} — {} member(s), span {:.0} m, centroid {}",
                index + 1,
                group.name,
                group.members.len(),
                group.distance_span_m(),
                centroid
            ),
            None => eprintln!("  {}. {}", index + 1, group.name),
        }
    }

    // JSON to stdout
    println!("{}", serde_json::to_string_pretty(&groups).unwrap());
}

fn build_request(cli: &Cli) -> SearchRequest {
    if let Some(ref poly) = cli.poly {
        let vertices: Vec<Coordinate> = poly
            .split_whitespace()
            .map(|pair| {
                let (lat, lon) = pair.split_once(',').unwrap_or_else(|| {
                    eprintln!("Error: polygon vertex '{}' is not \"lat,lon\"", pair);
                    std::process::exit(1);
                });
                Coordinate::new(parse_axis(lat, Axis::Lat), parse_axis(lon, Axis::Lon))
            })
            .collect();
        return SearchRequest::polygon(vertices);
    }

    match (&cli.lat, &cli.lon) {
        (Some(lat), Some(lon)) => {
            let center = Coordinate::new(parse_axis(lat, Axis::Lat), parse_axis(lon, Axis::Lon));
            SearchRequest::circle(center, cli.radius)
        }
        _ => {
            eprintln!("Error: no search area specified.");
            eprintln!();
            eprintln!("Usage:");
            eprintln!("  geoscout --lat 40.0 --lon -75.0 --tag amenity=hospital");
            eprintln!("  geoscout --lat \"40°26'46\\\"N\" --lon \"79°58'56\\\"W\" --tag bunker");
            eprintln!("  geoscout --poly \"40.1,-75.1 40.1,-74.9 39.9,-75.0\" --tags-file tags.txt");
            std::process::exit(1);
        }
    }
}

fn parse_axis(raw: &str, axis: Axis) -> f64 {
    parse_coordinate(raw, axis).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

fn load_words(path: &PathBuf) -> Vec<String> {
    load_wordlist(path).unwrap_or_else(|e| {
        eprintln!("Error: could not read {}: {}", path.display(), e);
        std::process::exit(1);
    })
}
