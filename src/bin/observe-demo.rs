//! Walks through the registry guarantees against the process-wide registry.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use clap::{Parser, Subcommand};
use safe_observe::{
    Entity, ObservedObject, ObserveExt,
    config::Config,
    global, tracing_config,
};
use tracing::{Level, info, span};

#[derive(Parser)]
#[command(name = "observe-demo")]
#[command(about = "Demonstrate safe property observation")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to daily files in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a callback, then destroy the observer mid-stream
    Scenario,
    /// Set a property from several threads while observers come and go
    Concurrent {
        /// Number of worker threads
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
        /// Property changes per thread
        #[arg(short = 'n', long, default_value_t = 1000)]
        changes: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match &cli.log_dir {
        Some(dir) => tracing_config::init_with_file(&config.general, dir)?,
        None => tracing_config::init(&config.general)?,
    }

    global::init(&config.registry);

    let _span = span!(Level::INFO, "observe_demo").entered();

    match cli.command {
        Commands::Scenario => run_scenario()?,
        Commands::Concurrent { threads, changes } => run_concurrent(threads, changes)?,
    }

    Ok(())
}

fn run_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let subject = ObservedObject::new();
    subject.set("count", 0)?;

    let observer = Entity::new();

    subject.observe(&observer, "count", |change| {
        println!("C1: {:?} -> {}", change.old_value, change.new_value);
    })?;
    subject.set("count", 5)?;

    subject.observe(&observer, "count", |change| {
        println!("C2: {:?} -> {}", change.old_value, change.new_value);
    })?;
    subject.set("count", 7)?;

    info!(observer = %observer.id(), "destroying observer");
    drop(observer);
    subject.set("count", 9)?;

    println!(
        "active observations: {}, transport registrations: {}",
        global::registry().observation_count(),
        subject.transport().active_registrations()
    );

    Ok(())
}

fn run_concurrent(threads: usize, changes: usize) -> Result<(), Box<dyn std::error::Error>> {
    let subject = Arc::new(ObservedObject::new());
    let delivered = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..threads)
        .map(|worker| {
            let subject = Arc::clone(&subject);
            let delivered = Arc::clone(&delivered);

            thread::spawn(move || -> safe_observe::Result<()> {
                for round in 0..changes {
                    let observer = Entity::new();
                    let counter = Arc::clone(&delivered);
                    subject.observe(&observer, "count", move |_| {
                        counter.fetch_add(1, Ordering::Relaxed);
                    })?;

                    subject.set("count", (worker * changes + round) as i64)?;

                    if round % 2 == 0 {
                        subject.unobserve(&observer, "count")?;
                    }
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        match worker.join() {
            Ok(result) => result?,
            Err(_) => return Err("worker thread panicked".into()),
        }
    }

    println!(
        "deliveries: {}, active observations: {}, transport registrations: {}",
        delivered.load(Ordering::Relaxed),
        global::registry().observation_count(),
        subject.transport().active_registrations()
    );

    Ok(())
}
