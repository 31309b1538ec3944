//! Serial vs parallel comparison runner.

use log::{error, info};
use parmatmul::config::RunConfig;
use parmatmul::{Matrix, Result, multiply_parallel, multiply_serial, verify};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match RunConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    let n = config.matrix_size;

    println!("=== Parallel Matrix Multiplication ===\n");
    println!("Matrix size: {}x{}", n, n);
    println!("Requested threads: {}", config.requested_threads);

    let mut b = Matrix::zeroed(n)?;
    let mut c = Matrix::zeroed(n)?;
    let mut rng = rand::thread_rng();
    b.fill_random(&mut rng, 0.0..config.input_max);
    c.fill_random(&mut rng, 0.0..config.input_max);

    println!("\nInput Matrix B (showing top-left corner):");
    print_corner(&b, config.display_size);
    println!("\nInput Matrix C (showing top-left corner):");
    print_corner(&c, config.display_size);

    let mut reference = Matrix::zeroed(n)?;
    let start = Instant::now();
    multiply_serial(&mut reference, &b, &c)?;
    let serial_secs = start.elapsed().as_secs_f64();

    let mut results = Vec::with_capacity(config.strategies.len());
    let mut result = Matrix::zeroed(n)?;

    for &strategy in &config.strategies {
        let effective = strategy.effective_threads(n, config.requested_threads);
        if effective != config.requested_threads {
            info!("{}: adjusted number of threads to {}", strategy, effective);
        }

        let run = multiply_parallel(&mut result, &b, &c, config.requested_threads, strategy)?;
        let report = verify(&reference, &result, config.tolerance)?;

        println!("\nParallel Result Matrix, {} (showing top-left corner):", strategy);
        print_corner(&result, config.display_size);
        println!(
            "Verification: {} (max diff {:.6}, tolerance {})",
            if report.passed { "PASSED" } else { "FAILED" },
            report.max_diff,
            config.tolerance
        );
        if let Some((row, col)) = report.first_mismatch {
            println!("  {} mismatches, first at ({}, {})", report.mismatches, row, col);
        }

        results.push((strategy, run, report));
    }

    println!("\nTiming Results:");
    println!("{}", "-".repeat(60));
    println!(
        "{:<16} {:>8} {:>12} {:>10} {:>8}",
        "Method", "Threads", "Time (s)", "Speedup", "Check"
    );
    println!("{}", "-".repeat(60));
    println!("{:<16} {:>8} {:>12.4} {:>9.2}x {:>8}", "serial", 1, serial_secs, 1.0, "-");
    for (strategy, run, report) in &results {
        let secs = run.elapsed.as_secs_f64();
        println!(
            "{:<16} {:>8} {:>12.4} {:>9.2}x {:>8}",
            strategy.to_string(),
            run.threads,
            secs,
            serial_secs / secs,
            if report.passed { "ok" } else { "FAILED" }
        );
    }
    println!("{}", "-".repeat(60));

    if results.iter().any(|(_, _, report)| !report.passed) {
        error!("parallel result differs from the serial reference beyond tolerance");
    }

    Ok(())
}

fn print_corner(m: &Matrix, display: usize) {
    let n = m.n();
    let shown = n.min(display);
    for i in 0..shown {
        let row: Vec<String> = m.row(i)[..shown].iter().map(|x| format!("{:.2}", x)).collect();
        println!("{}{}", row.join("\t"), if n > shown { "\t..." } else { "" });
    }
    if n > shown {
        println!("...");
    }
}
