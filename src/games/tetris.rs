use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::audio::synth::{self, Envelope, Waveform};
use crate::audio::{AudioOut, SoundBank};
use crate::event::{Button, InputEvent, InputState, Key};
use crate::games::{FrameSignal, Game};
use crate::ui::{self, Canvas};

pub const GRID_WIDTH: usize = 10;
pub const GRID_HEIGHT: usize = 20;

const START_FALL_SPEED_MS: u64 = 500;
const MIN_FALL_SPEED_MS: u64 = 100;
const FALL_SPEED_STEP_MS: u64 = 10;
const LINE_SCORE: u32 = 100;
/// Repeat delay for held stick / D-pad movement.
const STICK_REPEAT: Duration = Duration::from_millis(150);
const SPLASH_HOLD: Duration = Duration::from_millis(2000);
const SPLASH_FADE_STEP: u8 = 5;

const TETROMINOS: [&[&[u8]]; 7] = [
    &[&[1, 1, 1, 1]],
    &[&[1, 1, 1], &[0, 1, 0]],
    &[&[1, 1, 0], &[0, 1, 1]],
    &[&[0, 1, 1], &[1, 1, 0]],
    &[&[1, 1], &[1, 1]],
    &[&[1, 0, 0], &[1, 1, 1]],
    &[&[0, 0, 1], &[1, 1, 1]],
];

const SHAPE_COLORS: [Color; 8] = [
    Color::Rgb(0, 0, 0),
    Color::Rgb(0, 240, 240),
    Color::Rgb(0, 0, 240),
    Color::Rgb(240, 160, 0),
    Color::Rgb(240, 240, 0),
    Color::Rgb(0, 240, 0),
    Color::Rgb(160, 0, 240),
    Color::Rgb(240, 0, 0),
];

const BG: Color = Color::Rgb(15, 15, 20);
const FIELD_BG: Color = Color::Rgb(20, 20, 25);
const ACCENT: Color = Color::Rgb(0, 200, 255);
const TEXT: Color = Color::Rgb(240, 240, 240);
const GHOST: Color = Color::Rgb(60, 60, 70);

const MENU_OPTIONS: [&str; 2] = ["Resume / Start", "Exit"];

/// A 0/1 cell matrix, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(Vec<Vec<u8>>);

impl Shape {
    pub fn new(rows: &[&[u8]]) -> Self {
        Self(rows.iter().map(|r| r.to_vec()).collect())
    }

    pub fn width(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    pub fn height(&self) -> usize {
        self.0.len()
    }

    /// Offsets `(col, row)` of the filled cells.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.0.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, &c)| c != 0)
                .map(move |(j, _)| (j as i32, i as i32))
        })
    }

    /// Quarter turn clockwise: reverse the rows, then transpose.
    pub fn rotated(&self) -> Self {
        let (h, w) = (self.height(), self.width());
        Self(
            (0..w)
                .map(|c| (0..h).map(|r| self.0[h - 1 - r][c]).collect())
                .collect(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub shape: Shape,
    pub rotation: u8,
    pub x: i32,
    pub y: i32,
    pub color: u8,
}

impl Piece {
    fn spawn(kind: usize) -> Self {
        let shape = Shape::new(TETROMINOS[kind]);
        Self {
            x: (GRID_WIDTH / 2) as i32 - (shape.width() / 2) as i32,
            y: 0,
            shape,
            rotation: 0,
            color: kind as u8 + 1,
        }
    }

    fn random(rng: &mut StdRng) -> Self {
        Self::spawn(rng.gen_range(0..TETROMINOS.len()))
    }
}

/// Locked cells. 0 is empty, otherwise a piece color id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<[u8; GRID_WIDTH]>,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            rows: vec![[0; GRID_WIDTH]; GRID_HEIGHT],
        }
    }

    pub fn cell(&self, x: usize, y: usize) -> u8 {
        self.rows[y][x]
    }

    #[cfg(test)]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.rows[y][x] = value;
    }

    /// Would `shape` with its top-left at (x, y) leave the well or hit a
    /// locked cell? Rows above the top never collide.
    pub fn collides(&self, shape: &Shape, x: i32, y: i32) -> bool {
        shape.cells().any(|(dx, dy)| {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || nx >= GRID_WIDTH as i32 || ny >= GRID_HEIGHT as i32 {
                return true;
            }
            ny >= 0 && self.rows[ny as usize][nx as usize] != 0
        })
    }

    pub fn merge(&mut self, piece: &Piece) {
        for (dx, dy) in piece.shape.cells() {
            let (px, py) = (piece.x + dx, piece.y + dy);
            if py >= 0 {
                self.rows[py as usize][px as usize] = piece.color;
            }
        }
    }

    /// Removes every full row, refilling from the top. Returns how many went.
    pub fn clear_full_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.contains(&0));
        let cleared = before - self.rows.len();
        for _ in 0..cleared {
            self.rows.insert(0, [0; GRID_WIDTH]);
        }
        cleared
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SplashPhase {
    FadeIn,
    Hold,
    FadeOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Splash {
    phase: SplashPhase,
    alpha: u8,
    held: Duration,
}

impl Splash {
    fn new() -> Self {
        Self {
            phase: SplashPhase::FadeIn,
            alpha: 0,
            held: Duration::ZERO,
        }
    }

    /// Returns true once the splash has fully faded out.
    fn advance(&mut self, dt: Duration) -> bool {
        match self.phase {
            SplashPhase::FadeIn => {
                self.alpha = self.alpha.saturating_add(SPLASH_FADE_STEP);
                if self.alpha == u8::MAX {
                    self.phase = SplashPhase::Hold;
                    self.held = Duration::ZERO;
                }
            }
            SplashPhase::Hold => {
                self.held += dt;
                if self.held > SPLASH_HOLD {
                    self.phase = SplashPhase::FadeOut;
                }
            }
            SplashPhase::FadeOut => {
                self.alpha = self.alpha.saturating_sub(SPLASH_FADE_STEP);
                return self.alpha == 0;
            }
        }
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Splash(Splash),
    Menu,
    Playing,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Sfx {
    Move,
    Rotate,
    Drop,
    Clear,
    GameOver,
}

pub struct Tetris {
    state: State,
    grid: Grid,
    current: Piece,
    next: Piece,
    score: u32,
    /// Best score since this module was built. Going Home drops it.
    session_best: u32,
    lines: u32,
    fall_time: Duration,
    fall_speed_ms: u64,
    menu_index: usize,
    since_stick_move: Duration,
    rng: StdRng,
    sounds: SoundBank<Sfx>,
}

impl Tetris {
    pub fn new(audio: &AudioOut, mut rng: StdRng) -> Self {
        let sounds = SoundBank::new(audio, || {
            vec![
                (Sfx::Move, synth::tone(400.0, 0.05, 0.2, Waveform::Square, Envelope::fade_out(500))),
                (Sfx::Rotate, synth::tone(600.0, 0.08, 0.2, Waveform::Square, Envelope::fade_out(500))),
                (Sfx::Drop, synth::tone(150.0, 0.1, 0.3, Waveform::Saw, Envelope::fade_out(500))),
                (Sfx::Clear, synth::chord(&[523.0, 659.0, 784.0], 0.4, 0.3, Envelope::fade_out(1000))),
                (Sfx::GameOver, synth::tone(100.0, 1.0, 0.3, Waveform::Noise, Envelope::fade_out(500))),
            ]
        });
        let current = Piece::random(&mut rng);
        let next = Piece::random(&mut rng);
        Self {
            state: State::Splash(Splash::new()),
            grid: Grid::new(),
            current,
            next,
            score: 0,
            session_best: 0,
            lines: 0,
            fall_time: Duration::ZERO,
            fall_speed_ms: START_FALL_SPEED_MS,
            menu_index: 0,
            since_stick_move: Duration::ZERO,
            rng,
            sounds,
        }
    }

    pub fn check_collision(&self, piece: &Piece, dx: i32, dy: i32, rotated: Option<&Shape>) -> bool {
        let shape = rotated.unwrap_or(&piece.shape);
        self.grid.collides(shape, piece.x + dx, piece.y + dy)
    }

    /// How far the current piece could fall before landing.
    pub fn ghost_offset(&self) -> i32 {
        let mut offset = 0;
        while !self.check_collision(&self.current, 0, offset + 1, None) {
            offset += 1;
        }
        offset
    }

    fn shift(&mut self, dx: i32) {
        if !self.check_collision(&self.current, dx, 0, None) {
            self.current.x += dx;
            self.sounds.play(Sfx::Move);
        }
    }

    fn rotate(&mut self) {
        let rotated = self.current.shape.rotated();
        if !self.check_collision(&self.current, 0, 0, Some(&rotated)) {
            self.current.shape = rotated;
            self.current.rotation = (self.current.rotation + 1) % 4;
            log::trace!("rotated to state {}", self.current.rotation);
            self.sounds.play(Sfx::Rotate);
        }
    }

    /// One row down. Manual drops score a point per row; a blocked piece locks.
    fn move_down(&mut self, manual: bool) {
        if !self.check_collision(&self.current, 0, 1, None) {
            self.current.y += 1;
            if manual {
                self.score += 1;
            }
        } else {
            self.lock_piece();
        }
    }

    fn hard_drop(&mut self) {
        while !self.check_collision(&self.current, 0, 1, None) {
            self.move_down(true);
        }
        self.lock_piece();
    }

    fn merge(&mut self) {
        self.grid.merge(&self.current);
        self.sounds.play(Sfx::Drop);
    }

    fn clear_lines(&mut self) -> usize {
        let cleared = self.grid.clear_full_rows();
        if cleared > 0 {
            self.score += LINE_SCORE * cleared as u32;
            self.lines += cleared as u32;
            self.fall_speed_ms = self
                .fall_speed_ms
                .saturating_sub(FALL_SPEED_STEP_MS * cleared as u64)
                .max(MIN_FALL_SPEED_MS);
            self.sounds.play(Sfx::Clear);
            log::debug!("cleared {cleared} rows, fall speed now {}ms", self.fall_speed_ms);
        }
        cleared
    }

    fn lock_piece(&mut self) {
        self.merge();
        self.clear_lines();
        let next = Piece::random(&mut self.rng);
        self.current = std::mem::replace(&mut self.next, next);
        if self.check_collision(&self.current, 0, 0, None) {
            self.state = State::GameOver;
            self.session_best = self.session_best.max(self.score);
            self.sounds.play(Sfx::GameOver);
            log::info!("tetris: game over with {} points", self.score);
        }
    }

    /// Gravity tick. Runs once the accumulated time passes the fall speed.
    fn advance_fall(&mut self, dt: Duration) {
        self.fall_time += dt;
        if self.fall_time > Duration::from_millis(self.fall_speed_ms) {
            self.fall_time = Duration::ZERO;
            self.move_down(false);
        }
    }

    /// Held stick or D-pad. Sideways moves repeat every `STICK_REPEAT`;
    /// once that much time has passed since the last sideways move, a
    /// stick pushed down soft-drops on every frame.
    fn stick_input(&mut self, dt: Duration, input: &InputState) {
        self.since_stick_move += dt;
        if self.since_stick_move <= STICK_REPEAT {
            return;
        }
        let [ax, ay] = input.axes;
        let hx = input.hat.0;
        if ax < -0.5 || hx == -1 {
            self.shift(-1);
            self.since_stick_move = Duration::ZERO;
        }
        if ax > 0.5 || hx == 1 {
            self.shift(1);
            self.since_stick_move = Duration::ZERO;
        }
        if ay > 0.5 && matches!(self.state, State::Playing) {
            self.move_down(true);
        }
    }

    fn execute_menu(&mut self) -> FrameSignal {
        self.sounds.play(Sfx::Move);
        if self.menu_index == 0 {
            // Picks up whatever session is in memory, fresh or half played
            self.state = State::Playing;
            FrameSignal::Running
        } else {
            FrameSignal::Exit
        }
    }

    fn select_menu(&mut self, index: usize) {
        self.menu_index = index;
        self.sounds.play(Sfx::Move);
    }

    fn render_field(&self) -> Vec<Line<'static>> {
        let w = GRID_WIDTH as i32 * 2 + 2;
        let h = GRID_HEIGHT as i32 + 2;
        let mut canvas = Canvas::new(w as usize, h as usize, FIELD_BG);
        let border = Style::default().fg(ACCENT).bg(BG);
        for x in 0..w {
            canvas.set(x, 0, '─', border);
            canvas.set(x, h - 1, '─', border);
        }
        for y in 0..h {
            canvas.set(0, y, '│', border);
            canvas.set(w - 1, y, '│', border);
        }
        canvas.set(0, 0, '╭', border);
        canvas.set(w - 1, 0, '╮', border);
        canvas.set(0, h - 1, '╰', border);
        canvas.set(w - 1, h - 1, '╯', border);

        let dot = Style::default().fg(Color::Rgb(35, 35, 45)).bg(FIELD_BG);
        for y in 0..GRID_HEIGHT {
            for x in 0..GRID_WIDTH {
                let (cx, cy) = (1 + x as i32 * 2, 1 + y as i32);
                match self.grid.cell(x, y) {
                    0 => canvas.set(cx, cy, '·', dot),
                    id => {
                        let style = Style::default().fg(SHAPE_COLORS[id as usize]).bg(FIELD_BG);
                        canvas.set(cx, cy, '█', style);
                        canvas.set(cx + 1, cy, '█', style);
                    }
                }
            }
        }

        if matches!(self.state, State::Playing) {
            let ghost = self.ghost_offset();
            let ghost_style = Style::default().fg(GHOST).bg(FIELD_BG);
            for (dx, dy) in self.current.shape.cells() {
                let gy = self.current.y + dy + ghost;
                if gy >= 0 {
                    let gx = 1 + (self.current.x + dx) * 2;
                    canvas.set(gx, 1 + gy, '░', ghost_style);
                    canvas.set(gx + 1, 1 + gy, '░', ghost_style);
                }
            }
            let style = Style::default()
                .fg(SHAPE_COLORS[self.current.color as usize])
                .bg(FIELD_BG);
            for (dx, dy) in self.current.shape.cells() {
                let py = self.current.y + dy;
                if py >= 0 {
                    let px = 1 + (self.current.x + dx) * 2;
                    canvas.set(px, 1 + py, '█', style);
                    canvas.set(px + 1, 1 + py, '█', style);
                }
            }
        }
        canvas.into_lines()
    }

    fn render_side_panel(&self) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(
                format!("Score: {}", self.score),
                Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("Lines: {}", self.lines),
                Style::default().fg(Color::Rgb(150, 150, 160)),
            )),
            Line::from(Span::styled(
                format!("Session best: {}", self.session_best.max(self.score)),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(""),
            Line::from(Span::styled("Next:", Style::default().fg(TEXT))),
        ];
        let color = SHAPE_COLORS[self.next.color as usize];
        for row in &self.next.shape.0 {
            let s: String = row.iter().map(|&c| if c != 0 { "██" } else { "  " }).collect();
            lines.push(Line::from(Span::styled(s, Style::default().fg(color))));
        }
        lines
    }

    fn render_splash(&self, frame: &mut Frame, area: Rect, splash: &Splash) {
        frame.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);
        let lines = vec![
            Line::from(Span::styled(
                "Made for",
                Style::default().fg(ui::fade(Color::Rgb(150, 150, 150), splash.alpha)),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "R U S T C A D E",
                Style::default()
                    .fg(ui::fade(ACCENT, splash.alpha))
                    .add_modifier(Modifier::BOLD),
            )),
        ];
        let rect = ui::centered_rect(area.width, 3, area);
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), rect);
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Block::default().style(Style::default().bg(BG)), area);
        let mut lines = vec![
            Line::from(Span::styled(
                "N E O N   T E T R I S",
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(""),
        ];
        for (i, opt) in MENU_OPTIONS.iter().enumerate() {
            let line = if i == self.menu_index {
                Line::from(Span::styled(
                    format!("▶ {opt} ◀"),
                    Style::default()
                        .fg(TEXT)
                        .bg(Color::Rgb(50, 50, 60))
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(opt.to_string(), Style::default().fg(Color::Rgb(100, 100, 100))))
            };
            lines.push(line);
            lines.push(Line::from(""));
        }
        let rect = ui::centered_rect(area.width, lines.len() as u16, area);
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), rect);
    }

    fn render_game(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ACCENT))
            .title(" ▦ Neon Tetris ")
            .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(GRID_HEIGHT as u16 + 2), Constraint::Length(1)])
            .split(inner);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(GRID_WIDTH as u16 * 2 + 2),
                Constraint::Length(2),
                Constraint::Length(20),
                Constraint::Min(0),
            ])
            .split(rows[0]);

        frame.render_widget(Paragraph::new(self.render_field()), cols[1]);
        frame.render_widget(Paragraph::new(self.render_side_panel()), cols[3]);
        frame.render_widget(
            Paragraph::new(ui::help_line(&[
                ("←→", "Move"),
                ("↑/X", "Rotate"),
                ("↓", "Soft drop"),
                ("Space", "Drop"),
                ("Esc", "Menu"),
                ("-", "Home"),
            ])),
            rows[1],
        );
    }
}

impl Game for Tetris {
    fn handle_input(&mut self, event: InputEvent) -> FrameSignal {
        match self.state {
            State::Splash(_) => {
                if matches!(event, InputEvent::Key(_) | InputEvent::Button(_)) {
                    self.state = State::Menu;
                }
            }
            State::Menu => match event {
                InputEvent::Key(Key::Up) | InputEvent::Hat(_, 1) => self.select_menu(0),
                InputEvent::Key(Key::Down) | InputEvent::Hat(_, -1) => self.select_menu(1),
                InputEvent::Key(Key::Confirm) | InputEvent::Button(Button::A) => {
                    return self.execute_menu();
                }
                _ => {}
            },
            State::Playing => match event {
                InputEvent::Key(Key::Left) => self.shift(-1),
                InputEvent::Key(Key::Right) => self.shift(1),
                InputEvent::Key(Key::Up | Key::Rotate) | InputEvent::Button(Button::A) => self.rotate(),
                InputEvent::Key(Key::Down) => self.move_down(true),
                InputEvent::Key(Key::Space) => self.hard_drop(),
                InputEvent::Key(Key::Cancel) | InputEvent::Button(Button::Start) => {
                    self.state = State::Menu;
                }
                _ => {}
            },
            State::GameOver => {
                if matches!(
                    event,
                    InputEvent::Key(Key::Confirm | Key::Cancel)
                        | InputEvent::Button(Button::A | Button::Start)
                ) {
                    self.reset();
                    self.state = State::Menu;
                }
            }
        }
        FrameSignal::Running
    }

    fn update(&mut self, dt: Duration, input: &InputState) {
        if let State::Splash(splash) = &mut self.state {
            if splash.advance(dt) {
                self.state = State::Menu;
            }
            return;
        }
        if matches!(self.state, State::Playing) {
            self.stick_input(dt, input);
        }
        // A stick soft-drop may have ended the game
        if matches!(self.state, State::Playing) {
            self.advance_fall(dt);
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        match self.state {
            State::Splash(splash) => self.render_splash(frame, area, &splash),
            State::Menu => self.render_menu(frame, area),
            State::Playing => self.render_game(frame, area),
            State::GameOver => {
                self.render_game(frame, area);
                ui::render_overlay(
                    frame,
                    area,
                    " GAME OVER ",
                    Color::Rgb(255, 60, 60),
                    vec![
                        Line::from(""),
                        Line::from(Span::styled(
                            format!("Final Score: {}", self.score),
                            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
                        )),
                        Line::from(""),
                        Line::from(Span::styled(
                            "Press Start/Enter to Menu",
                            Style::default().fg(Color::Rgb(150, 150, 150)),
                        )),
                    ],
                );
            }
        }
    }

    fn reset(&mut self) {
        self.grid = Grid::new();
        self.current = Piece::random(&mut self.rng);
        self.next = Piece::random(&mut self.rng);
        self.score = 0;
        self.lines = 0;
        self.fall_time = Duration::ZERO;
        self.fall_speed_ms = START_FALL_SPEED_MS;
    }

    fn get_score(&self) -> u32 {
        self.score
    }

    fn is_game_over(&self) -> bool {
        self.state == State::GameOver
    }
}
