mod console;

use std::{
    cell::RefCell,
    io,
    path::PathBuf,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use task_core::{
    config::read_settings_file, load_settings, DemoJob, DemoKind, DemoReport, ManagerHandle,
    RunnerState, Settings, ThreadManager, TokioBlockingPool,
};
use tokio::runtime::Runtime;

use crate::console::{ConsoleDisplay, OutputMode};

const PUMP_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "taskctl", about = "Run demo background tasks against a console status display")]
struct Cli {
    /// Settings file to use instead of task_manager.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    /// Print the effective settings as TOML.
    Settings,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    job: JobArg,
    #[arg(long)]
    steps: Option<u64>,
    #[arg(long, default_value_t = 50)]
    step_delay_ms: u64,
    /// Fail with a domain error at this step.
    #[arg(long)]
    fail_at: Option<u64>,
    /// Request cancellation after this long; the run then ends as cancelled.
    #[arg(long)]
    cancel_after_ms: Option<u64>,
    /// Request cancellation after this long and exit with an error.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Deliver every snapshot instead of only the newest one.
    #[arg(long)]
    no_coalesce: bool,
    /// Emit one JSON status event per line.
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum JobArg {
    Scan,
    Copy,
    Import,
}

impl From<JobArg> for DemoKind {
    fn from(job: JobArg) -> Self {
        match job {
            JobArg::Scan => DemoKind::Scan,
            JobArg::Copy => DemoKind::Copy,
            JobArg::Import => DemoKind::Import,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => read_settings_file(path)?
            .with_context(|| format!("settings file '{}' does not exist", path.display()))?,
        None => load_settings(),
    };

    match cli.command {
        Command::Run(args) => run(args, settings),
        Command::Settings => {
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

fn run(args: RunArgs, mut settings: Settings) -> Result<()> {
    if args.no_coalesce {
        settings.coalesce_progress = false;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .thread_name(settings.worker_thread_prefix.clone())
        .build()
        .context("failed to build worker runtime")?;
    let pool = Arc::new(TokioBlockingPool::new(runtime.handle().clone()));

    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let display = ConsoleDisplay::new(io::stdout(), mode);
    let mut manager = ThreadManager::with_pool(display, settings, pool);

    let mut job = DemoJob::new(args.job.into())
        .with_step_delay(Duration::from_millis(args.step_delay_ms))
        .with_failure_at(args.fail_at);
    if let Some(steps) = args.steps {
        job = job.with_steps(steps);
    }

    let report: Rc<RefCell<Option<DemoReport>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&report);
    let task_name = job.kind().to_string();
    let run_id = manager.run_task(job, move |output| *sink.borrow_mut() = Some(output))?;
    manager.display_mut().begin_run(run_id, &task_name);

    let timed_out = Arc::new(AtomicBool::new(false));
    if let Some(ms) = args.cancel_after_ms {
        spawn_canceller(&runtime, manager.handle(), Duration::from_millis(ms), None);
    }
    if let Some(ms) = args.timeout_ms {
        spawn_canceller(
            &runtime,
            manager.handle(),
            Duration::from_millis(ms),
            Some(Arc::clone(&timed_out)),
        );
    }

    while manager.is_busy() {
        manager.wait_for_events(PUMP_INTERVAL);
    }

    let Some(summary) = manager.last_run().cloned() else {
        bail!("task {task_name} finished without a recorded outcome");
    };
    match summary.state {
        RunnerState::Succeeded => {
            if let Some(report) = report.borrow().as_ref() {
                if !args.json {
                    println!(
                        "{} finished in {} ms: {} items, {} bytes",
                        report.kind,
                        summary.elapsed.as_millis(),
                        report.items,
                        report.bytes
                    );
                }
            }
            Ok(())
        }
        RunnerState::Cancelled if timed_out.load(Ordering::SeqCst) => {
            bail!(
                "{task_name} timed out after {} ms",
                args.timeout_ms.unwrap_or_default()
            )
        }
        RunnerState::Cancelled => Ok(()),
        RunnerState::Failed => match summary.failure {
            Some(failure) => Err(failure.into()),
            None => bail!("{task_name} failed"),
        },
        RunnerState::Idle | RunnerState::Running => {
            bail!("{task_name} stopped in unexpected state {}", summary.state)
        }
    }
}

/// Requests cancellation of whatever is running once `after` has elapsed.
fn spawn_canceller(
    runtime: &Runtime,
    handle: ManagerHandle,
    after: Duration,
    fired: Option<Arc<AtomicBool>>,
) {
    runtime.spawn(async move {
        tokio::time::sleep(after).await;
        // Marked before cancelling so the UI loop never sees the outcome first.
        if let Some(fired) = &fired {
            fired.store(true, Ordering::SeqCst);
        }
        if handle.cancel_active() {
            tracing::info!(after_ms = after.as_millis() as u64, "cancel requested by watchdog");
        } else if let Some(fired) = &fired {
            fired.store(false, Ordering::SeqCst);
        }
    });
}
