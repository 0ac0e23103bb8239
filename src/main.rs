use matalg::harness::{ConsoleReporter, CorrectnessSuite, CsvReporter, Reporter, SpeedTest};
use matalg::{Engine, ParallelizationThresholds, Result};

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    println!("matalg: adaptive dense/compressed matrix multiplication");
    println!("========================================================\n");

    let args: Vec<String> = std::env::args().collect();
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("suite");

    let thresholds = ParallelizationThresholds::from_env()?;
    let engine = Engine::new(thresholds)?;
    println!("{engine:?}\n");

    match mode {
        "suite" => run_suite(&engine),
        "speed" => run_speed(&engine, args.get(2)),
        "market" => match args.get(2) {
            Some(path) => {
                let mut console = ConsoleReporter::new();
                SpeedTest::default().matrix_market(&engine, path, &mut console)?;
                console.finish()
            }
            None => {
                print_usage();
                Ok(())
            }
        },
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("Usage: matalg <mode>");
    println!();
    println!("Modes:");
    println!("  suite             - Run the correctness suite (default)");
    println!("  speed [out.csv]   - Time every strategy, optionally writing trials as CSV");
    println!("  market <file.mtx> - Time every strategy on a Matrix Market file");
}

fn run_suite(engine: &Engine) -> Result<()> {
    let mut console = ConsoleReporter::new();
    let summary = CorrectnessSuite::standard().run(engine, &mut console)?;
    println!(
        "\n{} of {} cases passed",
        summary.passed,
        summary.total()
    );
    console.finish()
}

fn run_speed(engine: &Engine, csv: Option<&String>) -> Result<()> {
    let speed = SpeedTest::default();
    let mut console = ConsoleReporter::new();

    println!("Compressed vs dense (matrix-vector)");
    for cmp in speed.compressed_vs_dense(engine, &mut console)? {
        println!(
            "  {}x{}: speedup {:.2}",
            cmp.baseline.rows,
            cmp.baseline.cols,
            cmp.speedup()
        );
    }

    println!("\nParallel vs sequential (compressed matrix-vector)");
    for cmp in speed.parallel_vs_sequential(engine, &mut console)? {
        println!(
            "  {}x{}: speedup {:.2}",
            cmp.baseline.rows,
            cmp.baseline.cols,
            cmp.speedup()
        );
    }

    if let Some(path) = csv {
        let mut writer = CsvReporter::create(path)?;
        speed.all_strategies(engine, &mut writer)?;
        writer.finish()?;
        println!("\nTrials written to {path}");
    } else {
        println!();
        speed.all_strategies(engine, &mut console)?;
    }
    console.finish()
}
