use clap::Parser;

fn main() -> anyhow::Result<()> {
    copyflash::init();

    let cli = copyflash::cli::Cli::parse();
    copyflash::cli::run(cli)
}
