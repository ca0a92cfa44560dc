use clap::Parser;
mod modes;

use modes::play::play;
use modes::step::step;
use playback_cli::cli_args::{Mode, Opt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::parse();
    match opt.mode {
        Mode::Play(p) => play(p).await?,
        Mode::Step(s) => step(s).await?,
    };

    Ok(())
}
