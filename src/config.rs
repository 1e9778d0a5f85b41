use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::games::GameKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Skip the home screen and start this game
    #[arg(long, value_enum)]
    pub game: Option<GameKind>,

    /// Frames per second the games are paced to
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// Do not open the audio device
    #[arg(long, default_value_t = false)]
    pub mute: bool,

    /// Seed for piece order and food placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where log output goes; the terminal is busy drawing
    #[arg(long, default_value = "rustcade.log")]
    pub log_file: PathBuf,
}

impl Args {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
