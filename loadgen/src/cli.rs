use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::runner::{self, Plan};
use crate::{observability, report};

/// Simulated user traffic against the storefront and product service APIs.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Version(VersionCommand),
}

/// run the configured simulated users until the duration elapses
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {}

/// print the loadgen version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Special switch to just print the version and exit.
    if let Command::Version(_) = args.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("loadgen-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config.logging);
    tracing::debug!(?config);

    runtime.block_on(async move {
        let plan = Plan::from_config(&config);

        let shutdown = CancellationToken::new();
        let on_interrupt = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, stopping simulated users");
                on_interrupt.cancel();
            }
        });

        let summary = runner::run(&plan, shutdown).await?;
        report::print_summary(&summary);
        anyhow::Ok(())
    })
}
