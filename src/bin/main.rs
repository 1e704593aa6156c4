use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use dagrun::cli::parse_args;
use dagrun::config::load_config;
use dagrun::orchestrator::Orchestrator;

fn main() -> std::process::ExitCode {
    let cli = parse_args();
    init_logging(&cli);

    let loaded = match load_config(&cli.config) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("error: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let orchestrator = match Orchestrator::new(loaded) {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(err) => {
            eprintln!("error: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    install_sigint_handler(Arc::clone(&orchestrator));

    let log_rx = orchestrator.take_log_receiver();
    let drain_handle = log_rx.map(|rx| {
        std::thread::spawn(move || {
            for record in rx {
                println!("{record}");
            }
        })
    });

    orchestrator.run();

    // Dropping the orchestrator's log_tx side happens when its supervisor
    // threads finish; the drain thread then sees the channel close and
    // exits its for-loop on its own.
    if let Some(handle) = drain_handle {
        let _ = handle.join();
    }

    print_summary(&orchestrator);

    std::process::ExitCode::SUCCESS
}

fn init_logging(cli: &dagrun::cli::Cli) {
    let filter = match cli.log_level {
        Some(level) => EnvFilter::new(level.filter().to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn install_sigint_handler(orchestrator: Arc<Orchestrator>) {
    let result = ctrlc::set_handler(move || {
        orchestrator.shutdown();
    });
    if let Err(err) = result {
        tracing::warn!(%err, "failed to install SIGINT handler");
    }
}

fn print_summary(orchestrator: &Orchestrator) {
    println!();
    println!("{:<20} {:<9} {:<9} {:>10}", "TASK", "KIND", "STATE", "DURATION");
    for task in orchestrator.snapshot() {
        let duration = task
            .elapsed
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<9?} {:<9?} {:>10}",
            task.name, task.kind, task.state, duration
        );
    }
}
