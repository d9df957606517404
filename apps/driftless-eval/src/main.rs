use clap::Parser;

use driftless_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	driftless_eval::run(args).await
}
