use std::io;
use std::thread;
use std::time::{Duration, Instant};

use ratatui::backend::Backend;
use ratatui::Terminal;

use crate::event::{Button, InputDevices, InputEvent};
use crate::games::{FrameSignal, Game};

/// A stalled frame (suspended terminal, debugger) counts as this at most.
const MAX_FRAME: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
enum Clock {
    /// Sleeps out each frame against the wall clock.
    Realtime { last: Option<Instant> },
    /// Reports the same step every tick and never sleeps.
    #[cfg(test)]
    Fixed,
}

/// Blocks each frame to a target rate and reports how long the frame took.
#[derive(Clone, Debug)]
pub struct FramePacer {
    frame: Duration,
    clock: Clock,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            frame: Duration::from_secs(1) / fps.max(1),
            clock: Clock::Realtime { last: None },
        }
    }

    #[cfg(test)]
    pub fn fixed(dt: Duration) -> Self {
        Self {
            frame: dt,
            clock: Clock::Fixed,
        }
    }

    /// Waits until a full frame has passed since the previous tick and
    /// returns the elapsed time. The first tick returns one frame.
    pub fn tick(&mut self) -> Duration {
        let last = match &mut self.clock {
            Clock::Realtime { last } => last,
            #[cfg(test)]
            Clock::Fixed => return self.frame,
        };
        let Some(prev) = *last else {
            *last = Some(Instant::now());
            return self.frame;
        };
        let elapsed = prev.elapsed();
        if elapsed < self.frame {
            thread::sleep(self.frame - elapsed);
        }
        let now = Instant::now();
        *last = Some(now);
        now.duration_since(prev).min(MAX_FRAME)
    }
}

/// One running game bound to the terminal and input devices it borrows.
pub struct GameModule<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    input: &'a mut dyn InputDevices,
    game: Box<dyn Game>,
    pacer: FramePacer,
}

impl<'a, B: Backend> GameModule<'a, B> {
    pub fn new(
        terminal: &'a mut Terminal<B>,
        input: &'a mut dyn InputDevices,
        game: Box<dyn Game>,
        pacer: FramePacer,
    ) -> Self {
        Self {
            terminal,
            input,
            game,
            pacer,
        }
    }

    /// Paces, drains pending input, advances the game and draws it.
    ///
    /// Quit and the Select button are handled here for every game. The first
    /// signal other than `Running` ends the frame before update and draw.
    pub fn run_frame(&mut self) -> io::Result<FrameSignal> {
        let dt = self.pacer.tick();

        for event in self.input.poll()? {
            let signal = match event {
                InputEvent::Quit => FrameSignal::Exit,
                InputEvent::Button(Button::Select) => FrameSignal::Home,
                other => self.game.handle_input(other),
            };
            if signal != FrameSignal::Running {
                return Ok(signal);
            }
        }

        let state = self.input.state();
        self.game.update(dt, &state);

        let game = &mut self.game;
        self.terminal.draw(|f| {
            let area = f.area();
            game.render(f, area)
        })?;
        Ok(FrameSignal::Running)
    }

    pub fn game(&self) -> &dyn Game {
        self.game.as_ref()
    }
}
