use clap::Parser;

use vetq_eval::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	vetq_eval::run(args)
}
