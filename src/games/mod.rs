pub mod pong;
pub mod snake;
pub mod tetris;

use std::time::Duration;

use rand::rngs::StdRng;
use ratatui::layout::Size;
use ratatui::prelude::*;

use crate::audio::AudioOut;
use crate::event::{InputEvent, InputState};

/// What a game wants the host to do after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSignal {
    Running,
    Exit,
    Home,
}

pub trait Game {
    /// Reacts to one discrete input event. Anything but `Running` ends the
    /// frame early and is handed to the host.
    fn handle_input(&mut self, event: InputEvent) -> FrameSignal;
    /// Advances the simulation by one frame that lasted `dt`.
    fn update(&mut self, dt: Duration, input: &InputState);
    fn render(&mut self, frame: &mut Frame, area: Rect);
    fn reset(&mut self);
    fn get_score(&self) -> u32;
    fn is_game_over(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum GameKind {
    Tetris,
    Pong,
    Snake,
}

impl GameKind {
    pub fn all() -> &'static [GameKind] {
        &[GameKind::Tetris, GameKind::Pong, GameKind::Snake]
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameKind::Tetris => "Neon Tetris",
            GameKind::Pong => "Cyber Pong",
            GameKind::Snake => "Neon Snake",
        }
    }

    /// Builds a fresh game sized for a surface of `size`.
    pub fn build(&self, size: Size, audio: &AudioOut, rng: StdRng) -> Box<dyn Game> {
        match self {
            GameKind::Tetris => Box::new(tetris::Tetris::new(audio, rng)),
            GameKind::Pong => Box::new(pong::Pong::new(audio)),
            GameKind::Snake => {
                let (cols, rows) = snake::grid_for(size);
                Box::new(snake::Snake::new(cols, rows, audio, rng))
            }
        }
    }
}
