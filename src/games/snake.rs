use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use ratatui::layout::Size;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::audio::synth::{self, Envelope, Waveform};
use crate::audio::{AudioOut, SoundBank};
use crate::event::{Button, InputEvent, InputState, Key};
use crate::games::{FrameSignal, Game};
use crate::ui::{self, Canvas};

const MOVE_INTERVAL: Duration = Duration::from_millis(80);
const FOOD_SCORE: u32 = 10;
const MIN_COLS: usize = 8;
const MIN_ROWS: usize = 6;
/// Rows above the field used by the status bar.
const STATUS_ROWS: u16 = 1;

const BG: Color = Color::Rgb(10, 10, 15);
const SNAKE: Color = Color::Rgb(0, 255, 200);
const HEAD: Color = Color::Rgb(200, 255, 255);
const FOOD: Color = Color::Rgb(255, 50, 100);
const TEXT: Color = Color::Rgb(255, 255, 255);

type Cell = (i32, i32);

/// Grid size in cells for a surface of `size`: two columns per cell.
pub fn grid_for(size: Size) -> (usize, usize) {
    let cols = (size.width / 2) as usize;
    let rows = size.height.saturating_sub(STATUS_ROWS) as usize;
    (cols.max(MIN_COLS), rows.max(MIN_ROWS))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    fn delta(self) -> Cell {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// D-pad motion, vertical first.
    fn from_hat(x: i8, y: i8) -> Option<Dir> {
        match (x, y) {
            (_, 1) => Some(Dir::Up),
            (_, -1) => Some(Dir::Down),
            (-1, _) => Some(Dir::Left),
            (1, _) => Some(Dir::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Playing,
    GameOver,
    /// The snake fills the board and there is nowhere left for food.
    Won,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Sfx {
    Eat,
    Crash,
}

pub struct Snake {
    cols: usize,
    rows: usize,
    state: State,
    /// Head first.
    body: VecDeque<Cell>,
    dir: Dir,
    next_dir: Dir,
    food: Option<Cell>,
    score: u32,
    move_timer: Duration,
    rng: StdRng,
    sounds: SoundBank<Sfx>,
}

impl Snake {
    pub fn new(cols: usize, rows: usize, audio: &AudioOut, rng: StdRng) -> Self {
        let sounds = SoundBank::new(audio, || {
            vec![
                (
                    Sfx::Eat,
                    synth::tone(660.0, 0.06, 0.3, Waveform::Sine, Envelope::fade_out(400)),
                ),
                (
                    Sfx::Crash,
                    synth::tone(100.0, 0.3, 0.3, Waveform::Noise, Envelope::fade_out(4000)),
                ),
            ]
        });
        let mut game = Self {
            cols,
            rows,
            state: State::Playing,
            body: VecDeque::new(),
            dir: Dir::Right,
            next_dir: Dir::Right,
            food: None,
            score: 0,
            move_timer: Duration::ZERO,
            rng,
            sounds,
        };
        game.reset();
        log::debug!("snake grid {cols}x{rows}");
        game
    }

    fn in_bounds(&self, (x, y): Cell) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    /// Buffers a turn for the next step. Reversing onto the neck is ignored.
    fn steer(&mut self, dir: Dir) {
        if dir != self.dir.opposite() {
            self.next_dir = dir;
        }
    }

    /// Places food on a random free cell, or declares the board won when
    /// there is none.
    fn spawn_food(&mut self) {
        if self.body.len() >= self.cols * self.rows {
            self.food = None;
            self.state = State::Won;
            log::info!("snake filled the board, score {}", self.score);
            return;
        }
        loop {
            let cell = (
                self.rng.gen_range(0..self.cols) as i32,
                self.rng.gen_range(0..self.rows) as i32,
            );
            if !self.body.contains(&cell) {
                self.food = Some(cell);
                return;
            }
        }
    }

    fn step(&mut self) {
        self.dir = self.next_dir;
        let Some(&(hx, hy)) = self.body.front() else {
            return;
        };
        let (dx, dy) = self.dir.delta();
        let head = (hx + dx, hy + dy);

        if !self.in_bounds(head) || self.body.contains(&head) {
            self.state = State::GameOver;
            self.sounds.play(Sfx::Crash);
            log::info!("snake crashed, score {} length {}", self.score, self.body.len());
            return;
        }

        self.body.push_front(head);
        if self.food == Some(head) {
            self.score += FOOD_SCORE;
            self.sounds.play(Sfx::Eat);
            self.spawn_food();
        } else {
            self.body.pop_back();
        }
    }

    fn render_field(&self) -> Vec<Line<'static>> {
        let mut canvas = Canvas::new(self.cols * 2, self.rows, BG);
        let dot = Style::default().fg(Color::Rgb(25, 30, 40)).bg(BG);
        for y in 0..self.rows as i32 {
            for x in 0..self.cols as i32 {
                canvas.set(x * 2, y, '·', dot);
            }
        }
        if let Some((fx, fy)) = self.food {
            let style = Style::default().fg(FOOD).bg(BG);
            canvas.set(fx * 2, fy, '◀', style);
            canvas.set(fx * 2 + 1, fy, '▶', style);
        }
        for (i, &(x, y)) in self.body.iter().enumerate() {
            let color = if i == 0 { HEAD } else { SNAKE };
            canvas.fill(x * 2, y, 2, 1, '█', Style::default().fg(color).bg(BG));
        }
        canvas.into_lines()
    }

    fn render_status(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled(
                " ◆ NEON SNAKE",
                Style::default().fg(SNAKE).add_modifier(Modifier::BOLD),
            ),
            ui::separator(),
            Span::styled(
                format!("Score: {}", self.score),
                Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
            ),
            ui::separator(),
            Span::styled(
                format!("Length: {}", self.body.len()),
                Style::default().fg(Color::Rgb(150, 150, 160)),
            ),
            ui::separator(),
            Span::styled("Esc Quit  - Home", Style::default().fg(Color::DarkGray)),
        ])
    }
}

impl Game for Snake {
    fn handle_input(&mut self, event: InputEvent) -> FrameSignal {
        let finished = self.state != State::Playing;
        match event {
            InputEvent::Key(Key::Cancel) => return FrameSignal::Exit,
            InputEvent::Button(Button::B) if finished => return FrameSignal::Exit,
            InputEvent::Key(Key::Confirm) | InputEvent::Button(Button::A) if finished => {
                self.reset();
            }
            InputEvent::Key(Key::Up) => self.steer(Dir::Up),
            InputEvent::Key(Key::Down) => self.steer(Dir::Down),
            InputEvent::Key(Key::Left) => self.steer(Dir::Left),
            InputEvent::Key(Key::Right) => self.steer(Dir::Right),
            InputEvent::Hat(x, y) => {
                if let Some(dir) = Dir::from_hat(x, y) {
                    self.steer(dir);
                }
            }
            _ => {}
        }
        FrameSignal::Running
    }

    fn update(&mut self, dt: Duration, _input: &InputState) {
        if self.state != State::Playing {
            return;
        }
        self.move_timer += dt;
        if self.move_timer > MOVE_INTERVAL {
            self.move_timer = Duration::ZERO;
            self.step();
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Block::default().style(Style::default().bg(BG)), area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(STATUS_ROWS), Constraint::Min(0)])
            .split(area);
        frame.render_widget(Paragraph::new(self.render_status()), chunks[0]);
        frame.render_widget(Paragraph::new(self.render_field()), chunks[1]);

        let (title, accent, headline) = match self.state {
            State::Playing => return,
            State::GameOver => (" GAME OVER ", Color::Rgb(255, 50, 50), "You crashed!"),
            State::Won => (" YOU WIN ", SNAKE, "The board is full!"),
        };
        ui::render_overlay(
            frame,
            area,
            title,
            accent,
            vec![
                Line::from(Span::styled(
                    headline,
                    Style::default().fg(accent).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("Score: {}", self.score),
                    Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press Enter / A to Restart",
                    Style::default().fg(Color::Rgb(200, 200, 200)),
                )),
            ],
        );
    }

    fn reset(&mut self) {
        self.body.clear();
        self.body.push_back(((self.cols / 2) as i32, (self.rows / 2) as i32));
        self.dir = Dir::Right;
        self.next_dir = Dir::Right;
        self.score = 0;
        self.move_timer = Duration::ZERO;
        self.state = State::Playing;
        self.spawn_food();
    }

    fn get_score(&self) -> u32 {
        self.score
    }

    fn is_game_over(&self) -> bool {
        self.state != State::Playing
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rand::SeedableRng;

    use super::*;
    use crate::audio::testing::Recorder;
    use crate::audio::synth::SAMPLE_RATE;

    fn game() -> Snake {
        Snake::new(20, 10, &AudioOut::muted(), StdRng::seed_from_u64(11))
    }

    fn idle() -> InputState {
        InputState::default()
    }

    #[test]
    fn grid_follows_the_surface() {
        assert_eq!(grid_for(Size::new(80, 24)), (40, 23));
        assert_eq!(grid_for(Size::new(81, 25)), (40, 24));
        assert_eq!(grid_for(Size::new(6, 3)), (MIN_COLS, MIN_ROWS));
    }

    #[test]
    fn starts_centred_moving_right() {
        let s = game();
        assert_eq!(s.body, VecDeque::from([(10, 5)]));
        assert_eq!(s.dir, Dir::Right);
        let food = s.food.unwrap();
        assert!(!s.body.contains(&food));
    }

    #[test]
    fn reverse_turns_are_rejected() {
        let mut s = game();
        s.handle_input(InputEvent::Key(Key::Left));
        assert_eq!(s.next_dir, Dir::Right);
        s.handle_input(InputEvent::Key(Key::Up));
        assert_eq!(s.next_dir, Dir::Up);
        // Still heading right until the next step, so left stays blocked
        s.handle_input(InputEvent::Key(Key::Left));
        assert_eq!(s.next_dir, Dir::Up);
        s.step();
        assert_eq!(s.dir, Dir::Up);
        s.handle_input(InputEvent::Key(Key::Down));
        assert_eq!(s.next_dir, Dir::Up);
    }

    #[test]
    fn hat_steers() {
        let mut s = game();
        s.handle_input(InputEvent::Hat(0, -1));
        assert_eq!(s.next_dir, Dir::Down);
        s.handle_input(InputEvent::Hat(-1, 0));
        assert_eq!(s.next_dir, Dir::Down);
        s.handle_input(InputEvent::Hat(0, 0));
        assert_eq!(s.next_dir, Dir::Down);
    }

    #[test]
    fn eating_grows_and_scores() {
        let mut s = game();
        s.food = Some((11, 5));
        s.step();
        assert_eq!(s.body, VecDeque::from([(11, 5), (10, 5)]));
        assert_eq!(s.score, 10);
        let food = s.food.unwrap();
        assert!(!s.body.contains(&food));
    }

    #[test]
    fn moving_keeps_length() {
        let mut s = game();
        s.food = Some((0, 0));
        s.step();
        s.step();
        assert_eq!(s.body, VecDeque::from([(12, 5)]));
        assert_eq!(s.score, 0);
    }

    #[test]
    fn steps_every_move_interval() {
        let mut s = game();
        s.food = Some((0, 0));
        s.update(MOVE_INTERVAL, &idle());
        assert_eq!(s.body[0], (10, 5));
        s.update(Duration::from_millis(1), &idle());
        assert_eq!(s.body[0], (11, 5));
        assert_eq!(s.move_timer, Duration::ZERO);
    }

    #[test]
    fn wall_ends_the_game() {
        let mut s = game();
        s.food = Some((0, 0));
        s.body = VecDeque::from([(19, 3)]);
        s.step();
        assert_eq!(s.state, State::GameOver);
        assert!(s.is_game_over());
        // Frozen once over
        s.update(Duration::from_secs(1), &idle());
        assert_eq!(s.body, VecDeque::from([(19, 3)]));
    }

    #[test]
    fn running_into_the_body_ends_the_game() {
        let mut s = game();
        s.food = Some((0, 0));
        s.body = VecDeque::from([(5, 5), (5, 6), (6, 6), (6, 5), (6, 4)]);
        s.dir = Dir::Up;
        s.next_dir = Dir::Right;
        s.step();
        assert_eq!(s.state, State::GameOver);
    }

    #[test]
    fn filling_the_board_wins() {
        let mut s = Snake::new(2, 1, &AudioOut::muted(), StdRng::seed_from_u64(1));
        s.body = VecDeque::from([(0, 0)]);
        s.food = Some((1, 0));
        s.step();
        assert_eq!(s.state, State::Won);
        assert_eq!(s.food, None);
        assert_eq!(s.score, 10);
        assert!(s.is_game_over());
    }

    #[test]
    fn enter_restarts_only_after_game_over() {
        let mut s = game();
        s.food = Some((0, 0));
        s.step();
        s.handle_input(InputEvent::Key(Key::Confirm));
        assert_eq!(s.body.len(), 1);
        assert_eq!(s.body[0], (11, 5));

        s.state = State::GameOver;
        s.score = 40;
        s.handle_input(InputEvent::Button(Button::A));
        assert_eq!(s.state, State::Playing);
        assert_eq!(s.score, 0);
        assert_eq!(s.body, VecDeque::from([(10, 5)]));
    }

    #[test]
    fn exit_keys() {
        let mut s = game();
        assert_eq!(s.handle_input(InputEvent::Button(Button::B)), FrameSignal::Running);
        s.state = State::GameOver;
        assert_eq!(s.handle_input(InputEvent::Button(Button::B)), FrameSignal::Exit);
        s.state = State::Playing;
        assert_eq!(s.handle_input(InputEvent::Key(Key::Cancel)), FrameSignal::Exit);
    }

    #[test]
    fn food_respawns_off_the_snake() {
        let mut s = Snake::new(4, 2, &AudioOut::muted(), StdRng::seed_from_u64(5));
        s.body = VecDeque::from([(0, 0), (1, 0), (2, 0), (3, 0), (3, 1), (2, 1)]);
        for _ in 0..50 {
            s.spawn_food();
            let food = s.food.unwrap();
            assert!(food == (0, 1) || food == (1, 1), "{food:?}");
        }
    }

    #[test]
    fn eat_and_crash_sounds() {
        let recorder = Rc::new(Recorder::default());
        let out = AudioOut::from_playback(recorder.clone());
        let mut s = Snake::new(20, 10, &out, StdRng::seed_from_u64(2));
        s.food = Some((11, 5));
        s.step();
        s.body = VecDeque::from([(19, 0)]);
        s.step();
        let eat = (SAMPLE_RATE as f32 * 0.06) as usize;
        let crash = (SAMPLE_RATE as f32 * 0.3) as usize;
        assert_eq!(*recorder.played.borrow(), vec![eat, crash]);
    }

    #[test]
    fn renders_field_and_overlay() {
        use ratatui::backend::TestBackend;
        use ratatui::Terminal;

        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        let (cols, rows) = grid_for(Size::new(40, 12));
        let mut s = Snake::new(cols, rows, &AudioOut::muted(), StdRng::seed_from_u64(4));
        terminal
            .draw(|f| {
                let area = f.area();
                s.render(f, area)
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Score: 0"));
        assert!(text.contains('█'));

        s.state = State::GameOver;
        terminal
            .draw(|f| {
                let area = f.area();
                s.render(f, area)
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("GAME OVER"));
    }
}
