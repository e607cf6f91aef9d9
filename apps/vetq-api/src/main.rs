use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = vetq_api::Args::parse();

	vetq_api::run(args).await
}
