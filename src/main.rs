use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::{error, info, LevelFilter};

use u_linebalance::benders::{BendersConfig, BendersResult, BendersSolver};
use u_linebalance::master::MasterFormulation;
use u_linebalance::models::Instance;
use u_linebalance::parser::parse_instance_file_with_stations;
use u_linebalance::subproblem::SequencingStrategy;
use u_linebalance::validation::verify_solution;
use u_linebalance::{Error, Result};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MasterArg {
    Assignment,
    Scheduling,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SequencingArg {
    Mip,
    Enumeration,
    Minizinc,
}

/// Balances a SUALBSP-2 line by logic-based Benders decomposition.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Instance file in `.alb` format.
    instance_path: PathBuf,

    /// TOML run configuration; flags below override it.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Wall-clock limit in seconds.
    #[arg(short = 't', long = "time-limit")]
    time_limit: Option<f64>,

    /// Number of stations, replacing the one in the file.
    #[arg(short = 'k', long = "stations")]
    stations: Option<usize>,

    #[arg(long = "master", value_enum)]
    master: Option<MasterArg>,

    #[arg(long = "sequencing", value_enum)]
    sequencing: Option<SequencingArg>,

    /// Solve the stations of one iteration in parallel.
    #[arg(long = "parallel", default_value_t = false)]
    parallel: bool,

    /// Print the result record as JSON on stdout.
    #[arg(long = "json", default_value_t = false)]
    json: bool,

    /// Verify the final line with the solution checker.
    #[arg(long = "check", default_value_t = false)]
    check: bool,

    /// More log output (`-v` debug, `-vv` trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors.
    #[arg(short = 'q', long = "quiet", default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn level_filter(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Warn,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        }
    }

    fn config(&self) -> Result<BendersConfig> {
        let mut config = match &self.config {
            Some(path) => BendersConfig::from_toml_file(path)?,
            None => BendersConfig::default(),
        };
        if let Some(secs) = self.time_limit {
            config.time_limit_secs = secs;
        }
        if let Some(master) = self.master {
            config.master = match master {
                MasterArg::Assignment => MasterFormulation::Assignment,
                MasterArg::Scheduling => MasterFormulation::Scheduling,
            };
        }
        if let Some(sequencing) = self.sequencing {
            config.sequencing = match sequencing {
                SequencingArg::Mip => SequencingStrategy::Mip,
                SequencingArg::Enumeration => SequencingStrategy::Enumeration,
                SequencingArg::Minizinc => SequencingStrategy::minizinc(),
            };
        }
        if self.parallel {
            config.parallel_subproblems = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.level_filter())
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(&args) {
        error!("Execution failed, error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.config()?;
    let raw = parse_instance_file_with_stations(&args.instance_path, args.stations)?;
    let instance = Instance::build(raw)?;
    info!(
        "loaded {} ({} tasks, {} stations)",
        args.instance_path.display(),
        instance.task_count(),
        instance.station_count()
    );

    let result = BendersSolver::new(&instance, config).solve()?;

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| Error::Solver(format!("cannot serialise result: {e}")))?;
        println!("{json}");
    } else {
        print_summary(&result);
    }

    if args.check {
        if let Some(solution) = &result.solution {
            if let Err(violations) = verify_solution(&instance, solution) {
                for v in &violations {
                    error!("{:?} (station {:?}): {}", v.kind, v.station, v.message);
                }
                return Err(Error::InvalidSolution {
                    violations: violations.len(),
                });
            }
            info!("solution check passed");
        }
    }
    Ok(())
}

fn print_summary(result: &BendersResult) {
    let stats = &result.stats;
    println!("termination:   {:?}", result.termination);
    println!("feasible:      {}", result.feasible);
    println!("optimal:       {}", result.optimal);
    println!("cycle time:    {}", result.cycle_time);
    println!("lower bound:   {}", result.lower_bound);
    println!("gap:           {:.2}%", result.gap_percent);
    println!(
        "runtime:       {:.3}s (master {:.3}s, subproblems {:.3}s)",
        stats.total_secs, stats.master_secs, stats.subproblem_secs
    );
    println!("iterations:    {}", stats.iterations);
    println!(
        "nodes:         {} (master {}, subproblems {})",
        stats.total_nodes(),
        stats.master_nodes,
        stats.subproblem_nodes
    );
    println!(
        "cuts:          {} (logic {}, simple {}, smart {}, smartest {}, nogood {}, bounds {})",
        stats.cuts.total(),
        stats.cuts.logic,
        stats.cuts.inference_simple,
        stats.cuts.inference_smart,
        stats.cuts.inference_smartest,
        stats.cuts.nogood,
        stats.cuts.global_bounds
    );
    if let Some(solution) = &result.solution {
        for plan in &solution.stations {
            let tasks: Vec<String> = plan.sequence.iter().map(|t| (t + 1).to_string()).collect();
            println!(
                "station {:>3}:  load {:>6}  [{}]",
                plan.station + 1,
                plan.load,
                tasks.join(" ")
            );
        }
    }
}
