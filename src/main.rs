use std::time::Duration;

use anyhow::Result;
use carewatch::duration::format_duration;
use carewatch::{cli, console, export, Args, Settings};
use carewatch_engine::{Engine, SummaryState};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);

    // Ticks, alarm timers and console commands share one thread
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Handle export mode (non-interactive)
    if let Some(export_path) = &args.export {
        return rt.block_on(async {
            let engine = cli::build_engine(&settings)?;
            let ticks = args.ticks.unwrap_or(0);
            for _ in 0..ticks {
                engine.tick();
            }
            let snapshot = engine.snapshot();
            engine.alarms().shutdown();
            export::write(&snapshot, export_path)?;
            println!(
                "Exported {} ticks ({} simulated) to: {}",
                ticks,
                format_duration(engine.tick_period().mul_f64(ticks as f64)),
                export_path.display()
            );
            Ok::<_, anyhow::Error>(())
        });
    }

    let result = rt.block_on(run_console(settings));

    // The stdin reader may still be parked on a blocking read
    rt.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run_console(settings: Settings) -> Result<()> {
    let engine = cli::build_engine(&settings)?;
    let handle = engine.start();
    let printer = tokio::spawn(print_summaries(engine.clone()));

    println!("{}", console::HELP);
    let stdin = BufReader::new(tokio::io::stdin());
    let result = console::run(&engine, stdin, &mut std::io::stdout()).await;

    printer.abort();
    handle.shutdown().await;
    info!("engine stopped");
    result
}

async fn print_summaries(engine: Engine) {
    let Some(mut summaries) = engine.summaries() else {
        return;
    };
    while summaries.changed().await.is_ok() {
        let state = summaries.borrow_and_update().clone();
        if let SummaryState::Ready { patient_id, text } = state {
            println!("[summary {patient_id}] {text}");
        }
    }
}
