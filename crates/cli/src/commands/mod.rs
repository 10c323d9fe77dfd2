mod demo;
mod inspect;

pub use demo::{DemoCall, run_demo};
pub use inspect::{Classification, InspectSummary, classify_line, inspect};

use crate::cli::{Cli, Commands};

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
	match cli.command {
		Commands::Demo(args) => {
			let config = demo::load_config(&args)?;
			let mut stdout = std::io::stdout().lock();
			let calls = run_demo(config, args.guests, &mut stdout).await?;
			let failed = calls.iter().filter(|c| !c.ok).count();
			tracing::info!(calls = calls.len(), failed, "demo finished");
			Ok(())
		}
		Commands::Inspect => {
			let stdin = std::io::stdin().lock();
			let mut stdout = std::io::stdout().lock();
			let summary = inspect(stdin, &mut stdout)?;
			tracing::info!(lines = summary.lines, rpc = summary.rpc, "inspect finished");
			Ok(())
		}
	}
}
