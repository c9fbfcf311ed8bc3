use std::process::ExitCode;

use log::{debug, info};
use lss_solver::{
    make_dense_solver, make_sparse_solver_with_config, DenseSolverType, PreconditionerType,
    SparseSolverConfig, SparseSolverType,
};

mod system;

use system::{SolveReport, SystemFile};

fn usage() {
    eprintln!("usage: lss-cli list");
    eprintln!(
        "       lss-cli solve --solver <NAME> [--preconditioner <NAME>] [--sparse] \
         [--config <config.json>] <system.json>"
    );
}

#[derive(Debug, Default)]
struct SolveArgs {
    solver: String,
    preconditioner: String,
    sparse: bool,
    config: Option<String>,
    system: String,
}

impl SolveArgs {
    fn parse(args: &[String]) -> Option<Self> {
        let mut parsed = SolveArgs::default();
        let mut solver = None;
        let mut system = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--solver" => solver = Some(iter.next()?.clone()),
                "--preconditioner" => parsed.preconditioner = iter.next()?.clone(),
                "--config" => parsed.config = Some(iter.next()?.clone()),
                "--sparse" => parsed.sparse = true,
                path if !path.starts_with("--") && system.is_none() => {
                    system = Some(path.to_string())
                }
                _ => return None,
            }
        }
        parsed.solver = solver?;
        parsed.system = system?;
        Some(parsed)
    }
}

fn print_catalogs() {
    println!("dense solvers:");
    for kind in DenseSolverType::ALL {
        println!("  {}", kind);
    }
    println!("sparse solvers:");
    for kind in SparseSolverType::ALL {
        println!("  {}", kind);
    }
    println!("preconditioners (BiCGSTAB):");
    for kind in PreconditionerType::ALL {
        println!("  {}", kind);
    }
}

fn load_config(path: Option<&str>) -> Result<SparseSolverConfig, String> {
    let Some(path) = path else {
        return Ok(SparseSolverConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|err| format!("{path}: {err}"))?;
    serde_json::from_str(&text).map_err(|err| format!("invalid config file {path}: {err}"))
}

/// Returns the report and whether a sparse solver flagged a failure.
fn solve(args: &SolveArgs) -> Result<(SolveReport, bool), String> {
    let text = std::fs::read_to_string(&args.system)
        .map_err(|err| format!("{}: {err}", args.system))?;
    let system = SystemFile::parse(&text)?;
    let b = system.rhs();
    info!(
        "solving {}x{} system with {} entries using {}",
        system.rows,
        system.cols,
        system.entries.len(),
        args.solver
    );

    if !args.sparse {
        let mut solver = make_dense_solver(&args.solver).map_err(|err| err.to_string())?;
        solver
            .decompose(&system.dense())
            .map_err(|err| err.to_string())?;
        let x = solver.solve(&b).map_err(|err| err.to_string())?;
        let report = SolveReport {
            solver: solver.name().to_string(),
            residual_norm: system.residual_norm(&x),
            solution: x.iter().copied().collect(),
            status: None,
            stats: None,
        };
        return Ok((report, false));
    }

    let config = load_config(args.config.as_deref())?;
    debug!("sparse configuration: {:?}", config);
    let mut solver = make_sparse_solver_with_config(&args.solver, &args.preconditioner, &config)
        .map_err(|err| err.to_string())?;
    solver
        .decompose(&system.sparse())
        .map_err(|err| err.to_string())?;
    let x = solver.solve(&b).map_err(|err| err.to_string())?;
    let stats = solver.solve_info();
    let report = SolveReport {
        solver: stats
            .as_ref()
            .map_or_else(|| solver.name().to_string(), |s| s.solver_name.clone()),
        residual_norm: system.residual_norm(&x),
        solution: x.iter().copied().collect(),
        status: Some(solver.info()),
        stats,
    };
    Ok((report, solver.fail()))
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("list") if args.len() == 2 => {
            print_catalogs();
            ExitCode::SUCCESS
        }
        Some("solve") => {
            let Some(solve_args) = SolveArgs::parse(&args[2..]) else {
                usage();
                return ExitCode::from(2);
            };
            match solve(&solve_args) {
                Ok((report, failed)) => {
                    match serde_json::to_string_pretty(&report) {
                        Ok(json) => println!("{json}"),
                        Err(err) => {
                            eprintln!("error: {err}");
                            return ExitCode::from(1);
                        }
                    }
                    if failed {
                        let status = report.status.unwrap_or_default();
                        eprintln!("solver reported failure: {}", status.as_str());
                        ExitCode::from(3)
                    } else {
                        ExitCode::SUCCESS
                    }
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    ExitCode::from(1)
                }
            }
        }
        _ => {
            usage();
            ExitCode::from(2)
        }
    }
}
