use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = driftless_api::Args::parse();

	driftless_api::run(args).await
}
