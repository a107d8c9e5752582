//! Command line front end: load a colored graph, search its automorphism
//! group, and print each generator in cycle notation as it is found.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use log::warn;

use symmetry::Engine;
use symmetry_builder::input::dimacs::{self, vertex_to_literal};
use symmetry_builder::input::{gap, plain};
use symmetry_builder::DimacsInfo;

const HELP: &str = "\
aut - print a generating set of a graph's automorphism group

USAGE:
  aut [OPTIONS] FILE

OPTIONS:
  --gap                  read GAP-style input and print GAP-style output
  --cnf                  read a DIMACS CNF formula
  --digraph              treat the input edges as directed arcs
  -s, --stats            print statistics after the search
  -q, --quiet            do not print the automorphisms
  -t, --timeout SECONDS  stop searching after SECONDS
  -h, --help             print this help message
  --version              version information
";

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mode {
    Plain,
    Gap,
    Cnf,
}

struct Args {
    mode: Mode,
    digraph: bool,
    stats: bool,
    quiet: bool,
    timeout: Option<u64>,
    file: PathBuf,
}

fn parse_args() -> Result<Args> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }
    if pargs.contains("--version") {
        println!("aut {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let gap = pargs.contains("--gap");
    let cnf = pargs.contains("--cnf");
    let digraph = pargs.contains("--digraph");
    if usize::from(gap) + usize::from(cnf) + usize::from(digraph) > 1 {
        bail!("--gap, --cnf, and --digraph are mutually exclusive");
    }

    let args = Args {
        mode: if gap {
            Mode::Gap
        } else if cnf {
            Mode::Cnf
        } else {
            Mode::Plain
        },
        digraph,
        stats: pargs.contains(["-s", "--stats"]),
        quiet: pargs.contains(["-q", "--quiet"]),
        timeout: pargs.opt_value_from_str(["-t", "--timeout"])?,
        file: pargs.free_from_str()?,
    };

    let rest = pargs.finish();
    if !rest.is_empty() {
        bail!("unexpected arguments: {rest:?}");
    }

    Ok(args)
}

/// Prints permutations in cycle notation. The mark buffer tracks which
/// support elements already appeared in an earlier cycle.
struct CyclePrinter {
    marks: Vec<bool>,
}

impl CyclePrinter {
    fn new(n: usize) -> Self {
        Self {
            marks: vec![false; n],
        }
    }

    fn print_plain(&mut self, perm: &[usize], support: &[usize]) {
        for &k in support {
            if self.marks[k] {
                continue;
            }
            self.marks[k] = true;
            print!("({k}");
            let mut j = perm[k];
            while j != k {
                self.marks[j] = true;
                print!(" {j}");
                j = perm[j];
            }
            print!(")");
        }
        println!();
        self.clear(support);
    }

    fn print_gap(&mut self, perm: &[usize], support: &[usize]) {
        for &k in support {
            if self.marks[k] {
                continue;
            }
            self.marks[k] = true;
            print!("({}", k + 1);
            let mut j = perm[k];
            while j != k {
                self.marks[j] = true;
                print!(",{}", j + 1);
                j = perm[j];
            }
            print!(")");
        }
        self.clear(support);
    }

    fn print_cnf(&mut self, perm: &[usize], support: &[usize], vars: usize) {
        let mut printed = false;
        for &k in support {
            // Clause vertices sit behind the literals; the support is
            // sorted, so nothing of interest follows.
            if k >= 2 * vars {
                break;
            }
            if self.marks[k] {
                continue;
            }
            printed = true;
            self.marks[k] = true;
            print!("({}", vertex_to_literal(k, vars));
            let mut j = perm[k];
            while j != k {
                self.marks[j] = true;
                print!(" {}", vertex_to_literal(j, vars));
                j = perm[j];
            }
            print!(")");
        }
        if printed {
            println!();
        }
        self.clear(support);
    }

    fn clear(&mut self, support: &[usize]) {
        for &k in support {
            self.marks[k] = false;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let mut cnf_info: Option<DimacsInfo> = None;
    let graph = match args.mode {
        Mode::Gap => gap::read_from_path(&args.file)?,
        Mode::Cnf => {
            let (graph, info) = dimacs::read_from_path(&args.file)?;
            cnf_info = Some(info);
            graph
        }
        Mode::Plain => plain::read_from_path(&args.file, args.digraph)?,
    };

    let deadline = args
        .timeout
        .map(|seconds| Instant::now() + Duration::from_secs(seconds));

    let mut engine = Engine::new(graph.node_count());
    let mut printer = CyclePrinter::new(graph.node_count());
    let mut first = true;
    let mut timed_out = false;

    let stats = engine.search(&graph, |automorphism| {
        if !args.quiet {
            match args.mode {
                Mode::Plain => printer.print_plain(automorphism.perm, automorphism.support),
                Mode::Gap => {
                    print!("{}", if first { "[\n" } else { ",\n" });
                    printer.print_gap(automorphism.perm, automorphism.support);
                }
                Mode::Cnf => printer.print_cnf(
                    automorphism.perm,
                    automorphism.support,
                    cnf_info.map_or(0, |info| info.vars),
                ),
            }
            first = false;
        }

        match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                timed_out = true;
                false
            }
            _ => true,
        }
    });

    if args.mode == Mode::Gap && !args.quiet && !first {
        println!("\n]");
    }
    if timed_out {
        warn!("search timed out");
    }

    if args.stats {
        println!("vertices = {}", graph.node_count());
        println!("edges = {}", graph.edge_count());
        if let Some(info) = &cnf_info {
            println!("variables = {}", info.vars);
            println!("clauses = {}", info.orig_clauses);
            println!("non-binary clauses = {}", info.clauses);
            println!("literals = {}", info.literals);
        }
        println!("group size = {}e{}", stats.grpsize_base, stats.grpsize_exp);
        println!("levels = {}", stats.levels);
        println!("nodes = {}", stats.nodes);
        println!("generators = {}", stats.gens);
        println!("total support = {}", stats.support);
        println!(
            "average support = {:.2}",
            stats.support as f64 / stats.gens as f64
        );
        println!(
            "nodes per generator = {:.2}",
            stats.nodes as f64 / stats.gens as f64
        );
        println!("bad nodes = {}", stats.bads);
    }

    Ok(())
}
