use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_python_tanglegram::binarize::{make_binary, shuffle};
use rust_python_tanglegram::correspondence::Resolver;
use rust_python_tanglegram::detangle::{
    DetangleOptions, DetangleOutcome, Tanglegram, detangle_many,
};
use rust_python_tanglegram::io::{
    read_mapping_table, read_tree, read_trees, write_newick, write_report_tsv,
};
use rust_python_tanglegram::tree::{Node, Side};
use std::path::PathBuf;
use std::process::exit;
use std::time::Instant;

/// Reorder the subtrees of one tree so that its leaves line up with the
/// leaves of another (tanglegram detangling), and write the result as Newick.
#[derive(Parser, Debug)]
#[command(name = "tanglegram", version, about = "Detangle a pair of Newick trees")]
struct Args {
    /// Left tree (Newick, optionally .gz); only its first tree is used
    #[arg(short = 'a', long = "left")]
    left: PathBuf,

    /// Right tree(s) (Newick, optionally .gz)
    #[arg(short = 'b', long = "right")]
    right: PathBuf,

    /// Two-column mapping table: left leaf name, right leaf name
    #[arg(short = 'm', long = "map")]
    map: Option<PathBuf>,

    /// Which tree is rearranged: right | left | both
    #[arg(long = "movable", value_enum, default_value_t = MovableArg::Right)]
    movable: MovableArg,

    /// Maximum number of sweeps (at least 1); stops early when a sweep does not help
    #[arg(
        long = "passes",
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    passes: usize,

    /// Randomly reorder children before detangling: none | left | right | both
    #[arg(long = "shuffle", value_enum, default_value_t = ShuffleArg::None)]
    shuffle: ShuffleArg,

    /// Seed for --shuffle (random when omitted)
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Reject fuzzy leaf matches scoring below this value (0..1)
    #[arg(long = "min-similarity", default_value_t = 0.0)]
    min_similarity: f64,

    /// Output path for the detangled tree(s), `-` for stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Output path for the per-leaf disorder TSV
    #[arg(long = "report")]
    report: Option<PathBuf>,

    /// Print the detangled tree(s) as ASCII cladograms
    #[arg(long = "print", default_value_t = false)]
    print: bool,

    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MovableArg {
    Right,
    Left,
    Both,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ShuffleArg {
    None,
    Left,
    Right,
    Both,
}

fn init_logging(quiet: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if quiet { LevelFilter::Warn } else { LevelFilter::Info });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.quiet);

    // Read trees and the optional mapping table
    let t0 = Instant::now();
    let mut left = match read_tree(&args.left) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to read {:?}: {e}", args.left);
            exit(2);
        }
    };
    let mut rights = match read_trees(&args.right) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to read {:?}: {e}", args.right);
            exit(2);
        }
    };
    let mut resolver = Resolver::new().with_min_similarity(args.min_similarity);
    if let Some(map) = &args.map {
        match read_mapping_table(map) {
            Ok(pairs) => {
                info!("Read {} leaf pairs from {:?}", pairs.len(), map);
                resolver = resolver.with_table(pairs);
            }
            Err(e) => {
                error!("Failed to read mapping table {map:?}: {e}");
                exit(2);
            }
        }
    }
    info!(
        "Reading in trees {:.3}s ({} left leaves, {} right tree(s))",
        t0.elapsed().as_secs_f64(),
        left.num_leaves(),
        rights.len()
    );

    // Binarize, tag and optionally shuffle
    make_binary(&mut left);
    left.assign_unique_ids(Side::A);
    for right in rights.iter_mut() {
        make_binary(right);
        right.assign_unique_ids(Side::B);
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    if matches!(args.shuffle, ShuffleArg::Left | ShuffleArg::Both) {
        shuffle(&mut left, &mut rng);
    }
    if matches!(args.shuffle, ShuffleArg::Right | ShuffleArg::Both) {
        for right in rights.iter_mut() {
            shuffle(right, &mut rng);
        }
    }

    let options = DetangleOptions { max_passes: args.passes };
    let t1 = Instant::now();
    let results = match detangle_all(args.movable, left, rights, resolver, &options) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to detangle: {e}");
            exit(3);
        }
    };
    info!("Detangling {:.3}s", t1.elapsed().as_secs_f64());

    for (label, _, outcome) in &results {
        info!(
            "{label}: disorder {} -> {} in {} pass(es), {} swap(s) kept, {} unmatched",
            outcome.before, outcome.after, outcome.passes, outcome.swaps_kept, outcome.unmatched
        );
    }

    if args.print {
        for (label, tree, _) in &results {
            println!("# {label}");
            print!("{}", tree.to_ascii_cladogram());
        }
    }

    let t2 = Instant::now();
    if let Some(output) = &args.output {
        let trees: Vec<Node> = results.iter().map(|(_, t, _)| t.clone()).collect();
        if let Err(e) = write_newick(output, &trees) {
            error!("Failed to write output {output:?}: {e}");
            exit(4);
        }
    }
    if let Some(report) = &args.report {
        let reports: Vec<(String, _)> = results
            .iter()
            .map(|(label, _, outcome)| (label.clone(), &outcome.report))
            .collect();
        if let Err(e) = write_report_tsv(report, &reports) {
            error!("Failed to write report {report:?}: {e}");
            exit(4);
        }
    }
    if args.output.is_some() || args.report.is_some() {
        info!("Writing to output {:.3}s", t2.elapsed().as_secs_f64());
    }
}

/// Runs the requested detangling; returns `(label, tree, outcome)` for every
/// rearranged tree.
fn detangle_all(
    movable: MovableArg,
    left: Node,
    mut rights: Vec<Node>,
    resolver: Resolver,
    options: &DetangleOptions,
) -> Result<Vec<(String, Node, DetangleOutcome)>, rust_python_tanglegram::TreeError> {
    if let MovableArg::Right = movable {
        let outcomes = detangle_many(&mut rights, &left, &resolver, options)?;
        let n = rights.len();
        return Ok(rights
            .into_iter()
            .zip(outcomes)
            .enumerate()
            .map(|(i, (tree, outcome))| {
                let label = if n == 1 { "right".to_string() } else { format!("right_{i}") };
                (label, tree, outcome)
            })
            .collect());
    }

    if rights.len() > 1 {
        warn!("Only the first right tree is used with --movable {movable:?}");
    }
    let right = rights.into_iter().next().unwrap_or_default();
    let mut pair = Tanglegram::new(left, right, resolver);

    match movable {
        MovableArg::Left => {
            let outcome = pair.detangle(Side::A, options)?;
            Ok(vec![("left".to_string(), pair.left, outcome)])
        }
        _ => {
            let (l, r) = pair.detangle_both(options)?;
            Ok(vec![
                ("left".to_string(), l.tree, l.outcome),
                ("right".to_string(), r.tree, r.outcome),
            ])
        }
    }
}
