use std::io;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::backend::Backend;
use ratatui::Terminal;

use crate::audio::AudioOut;
use crate::event::{Button, InputDevices, InputEvent, Key};
use crate::games::{FrameSignal, GameKind};
use crate::runtime::{FramePacer, GameModule};
use crate::ui::home;

pub struct App {
    pub should_quit: bool,
    pub selected_game: usize,
    /// Game and score of the most recently finished session.
    pub last_played: Option<(GameKind, u32)>,
    audio: AudioOut,
    pacer: FramePacer,
    rng: StdRng,
}

impl App {
    pub fn new(audio: AudioOut, pacer: FramePacer, rng: StdRng) -> Self {
        Self {
            should_quit: false,
            selected_game: 0,
            last_played: None,
            audio,
            pacer,
            rng,
        }
    }

    /// Runs the launcher until the player quits. With `start` set the first
    /// game opens straight away and Home still lands on the launcher.
    pub fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        input: &mut dyn InputDevices,
        start: Option<GameKind>,
    ) -> io::Result<()> {
        if let Some(kind) = start {
            self.select(kind);
            self.play(kind, terminal, input)?;
        }

        let mut pacer = self.pacer.clone();
        while !self.should_quit {
            pacer.tick();
            let (selected, last) = (self.selected_game, self.last_played);
            terminal.draw(|f| {
                let area = f.area();
                home::render_home(f, area, selected, last)
            })?;

            for event in input.poll()? {
                if let Some(kind) = self.on_launcher_event(event) {
                    self.play(kind, terminal, input)?;
                    break;
                }
                if self.should_quit {
                    break;
                }
            }
        }
        log::info!("leaving");
        Ok(())
    }

    fn select(&mut self, kind: GameKind) {
        self.selected_game = GameKind::all().iter().position(|k| *k == kind).unwrap_or(0);
    }

    /// Returns the game to launch, if any.
    fn on_launcher_event(&mut self, event: InputEvent) -> Option<GameKind> {
        let games = GameKind::all();
        match event {
            InputEvent::Quit | InputEvent::Key(Key::Cancel) => self.should_quit = true,
            InputEvent::Key(Key::Left | Key::Up) | InputEvent::Hat(-1, _) => {
                self.selected_game = (self.selected_game + games.len() - 1) % games.len();
            }
            InputEvent::Key(Key::Right | Key::Down) | InputEvent::Hat(1, _) => {
                self.selected_game = (self.selected_game + 1) % games.len();
            }
            InputEvent::Key(Key::Confirm)
            | InputEvent::Button(Button::A)
            | InputEvent::Button(Button::Start) => return games.get(self.selected_game).copied(),
            InputEvent::Key(Key::Digit(d)) if (1..=games.len()).contains(&(d as usize)) => {
                self.selected_game = d as usize - 1;
                return Some(games[self.selected_game]);
            }
            _ => {}
        }
        None
    }

    /// Builds a fresh module for `kind` and drives it until it signals
    /// Home or Exit.
    fn play<B: Backend>(
        &mut self,
        kind: GameKind,
        terminal: &mut Terminal<B>,
        input: &mut dyn InputDevices,
    ) -> io::Result<()> {
        let size = terminal.size()?;
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let game = kind.build(size, &self.audio, rng);
        log::info!("starting {} on a {}x{} surface", kind.name(), size.width, size.height);

        let mut module = GameModule::new(terminal, input, game, self.pacer.clone());
        let signal = loop {
            match module.run_frame()? {
                FrameSignal::Running => {}
                other => break other,
            }
        };
        let score = module.game().get_score();
        let finished = module.game().is_game_over();
        drop(module);

        log::info!(
            "{} ended with {signal:?}, score {score}, game over {finished}",
            kind.name()
        );
        self.last_played = Some((kind, score));
        if signal == FrameSignal::Exit {
            self.should_quit = true;
        }
        // The launcher redraws from scratch
        terminal.clear()?;
        Ok(())
    }
}
