use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "frame-rpc")]
#[command(about = "RPC bridge between host and guest contexts over message passing")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug for the bridge, -vv trace everything)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run an in-process host with guests and print every call outcome as JSON
	Demo(DemoArgs),

	/// Classify JSON messages read line by line from stdin
	Inspect,
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
	/// Number of guest contexts to embed in the host
	#[arg(short, long, default_value_t = 2)]
	pub guests: usize,

	/// Bridge configuration file (JSON)
	#[arg(short, long)]
	pub config: Option<PathBuf>,

	/// Default call timeout in milliseconds, overriding the config file
	#[arg(long)]
	pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn demo_defaults() {
		let cli = Cli::try_parse_from(["frame-rpc", "demo"]).unwrap();
		let Commands::Demo(args) = cli.command else {
			panic!("expected demo");
		};
		assert_eq!(args.guests, 2);
		assert!(args.config.is_none());
		assert!(args.timeout_ms.is_none());
		assert_eq!(cli.verbose, 0);
	}

	#[test]
	fn verbosity_is_global() {
		let cli = Cli::try_parse_from(["frame-rpc", "inspect", "-vv"]).unwrap();
		assert!(matches!(cli.command, Commands::Inspect));
		assert_eq!(cli.verbose, 2);
	}

	#[test]
	fn demo_overrides() {
		let cli = Cli::try_parse_from(["frame-rpc", "demo", "--guests", "4", "--timeout-ms", "250"]).unwrap();
		let Commands::Demo(args) = cli.command else {
			panic!("expected demo");
		};
		assert_eq!(args.guests, 4);
		assert_eq!(args.timeout_ms, Some(250));
	}
}
