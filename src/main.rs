//! Бенчмарк ядер матричного умножения на GPU

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use oclgemm::{
    default_variants, BenchConfig, BenchmarkDriver, CliArgs, ComputeDevice, KernelInvoker,
    KernelProgram, Operands,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = BenchConfig::from_args(&CliArgs::parse());

    if let Err(e) = run(&config) {
        eprintln!(" {e:#}");
        std::process::exit(1);
    }
}

fn run(config: &BenchConfig) -> Result<()> {
    let verbose = !config.reduced && !config.json;

    // Устройство, контекст и очередь с профилированием
    let device = ComputeDevice::acquire()?;
    if verbose {
        println!("{}", device.describe().context("Не удалось прочитать свойства устройства")?);
    }

    // Сначала общие константы, затем ядра
    let mut program = KernelProgram::new(&device);
    for path in config.source_paths() {
        program.load_source(&path)?;
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if verbose {
        println!(" Computing the reference result ...");
    }
    let mut operands = Operands::prepare(config.matrix_size, config.reduced, &mut rng);

    let mut driver = BenchmarkDriver::new(default_variants(config.matrix_size), config.n_iteration);
    if verbose {
        println!(" Benchmarking the kernels (GPU) ...");
        let pb = ProgressBar::new(config.n_iteration as u64);
        let template =
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";
        pb.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .context("Некорректный шаблон прогресса")?
                .progress_chars("#>-"),
        );
        driver = driver.with_progress(pb);
    }

    let mut invoker = KernelInvoker::new(&program);
    let report = driver.run(&mut invoker, &mut operands)?;

    if config.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
    }

    Ok(())
}
