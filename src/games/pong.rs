use std::time::Duration;

use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::audio::synth::{self, Envelope, Waveform, SAMPLE_RATE};
use crate::audio::{AudioOut, SoundBank};
use crate::event::{Button, InputEvent, InputState, Key};
use crate::games::{FrameSignal, Game};
use crate::ui::{self, Canvas};

// The field is simulated in fixed logical units and scaled to the terminal.
const FIELD_W: f32 = 800.0;
const FIELD_H: f32 = 480.0;
const BALL_SIZE: f32 = 20.0;
const BALL_SPEED: f32 = 5.0;
const PADDLE_W: f32 = 15.0;
const PADDLE_H: f32 = 80.0;
const PADDLE_MARGIN: f32 = 30.0;
const PLAYER_STEP: f32 = 7.0;
const STICK_DEADZONE: f32 = 0.2;
const SPEED_UP: f32 = 0.05;

const AI_SPEED: [f32; 3] = [3.0, 5.0, 9.0];
const DIFFICULTY_NAMES: [&str; 3] = ["EASY", "MEDIUM", "HARD"];
const DIFFICULTY_COLORS: [Color; 3] = [
    Color::Rgb(100, 255, 100),
    Color::Rgb(255, 255, 100),
    Color::Rgb(255, 100, 100),
];

const INTRO_FADE_STEP: u8 = 3;
const INTRO_HOLD_FRAMES: u32 = 90;

const P1_COLOR: Color = Color::Rgb(0, 200, 255);
const P2_COLOR: Color = Color::Rgb(255, 50, 100);
const BG: Color = Color::Rgb(0, 0, 0);

/// Axis-aligned box in field units.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Body {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl Body {
    fn left(&self) -> f32 {
        self.x
    }

    fn right(&self) -> f32 {
        self.x + self.w
    }

    fn top(&self) -> f32 {
        self.y
    }

    fn bottom(&self) -> f32 {
        self.y + self.h
    }

    fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    fn center_on(&mut self, cx: f32, cy: f32) {
        self.x = cx - self.w / 2.0;
        self.y = cy - self.h / 2.0;
    }

    fn intersects(&self, other: &Body) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    fn clamp_y(&mut self, max_bottom: f32) {
        self.y = self.y.clamp(0.0, max_bottom - self.h);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IntroPhase {
    FadeIn,
    Hold(u32),
    FadeOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Intro { phase: IntroPhase, alpha: u8 },
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Sfx {
    Paddle,
    Wall,
    Score,
    Intro,
}

pub struct Pong {
    state: State,
    ball: Body,
    ball_vx: f32,
    ball_vy: f32,
    speed_mult: f32,
    p1: Body,
    p2: Body,
    p1_score: u32,
    p2_score: u32,
    difficulty: usize,
    /// Waiting to serve. Freezes the ball and the AI.
    paused: bool,
    sounds: SoundBank<Sfx>,
}

impl Pong {
    pub fn new(audio: &AudioOut) -> Self {
        let sounds = SoundBank::new(audio, || {
            let blip = Envelope::fade(500, 500);
            vec![
                (Sfx::Paddle, synth::tone(440.0, 0.08, 0.4, Waveform::Sine, blip)),
                (Sfx::Wall, synth::tone(220.0, 0.08, 0.4, Waveform::Sine, blip)),
                (Sfx::Score, synth::tone(880.0, 0.4, 0.3, Waveform::Sine, blip)),
                (
                    Sfx::Intro,
                    synth::chord(
                        &[261.63, 329.63, 392.00, 493.88],
                        3.0,
                        0.4,
                        Envelope::fade((SAMPLE_RATE / 2) as usize, SAMPLE_RATE as usize),
                    ),
                ),
            ]
        });
        sounds.play(Sfx::Intro);

        let mut game = Self {
            state: State::Intro {
                phase: IntroPhase::FadeIn,
                alpha: 0,
            },
            ball: Body {
                x: 0.0,
                y: 0.0,
                w: BALL_SIZE,
                h: BALL_SIZE,
            },
            ball_vx: BALL_SPEED,
            ball_vy: BALL_SPEED,
            speed_mult: 1.0,
            p1: Body {
                x: PADDLE_MARGIN,
                y: FIELD_H / 2.0 - PADDLE_H / 2.0,
                w: PADDLE_W,
                h: PADDLE_H,
            },
            p2: Body {
                x: FIELD_W - PADDLE_MARGIN - PADDLE_W,
                y: FIELD_H / 2.0 - PADDLE_H / 2.0,
                w: PADDLE_W,
                h: PADDLE_H,
            },
            p1_score: 0,
            p2_score: 0,
            difficulty: 1,
            paused: true,
            sounds,
        };
        game.ball.center_on(FIELD_W / 2.0, FIELD_H / 2.0);
        game
    }

    fn update_intro(&mut self) {
        let State::Intro { phase, alpha } = &mut self.state else {
            return;
        };
        match *phase {
            IntroPhase::FadeIn => {
                *alpha = alpha.saturating_add(INTRO_FADE_STEP);
                if *alpha == u8::MAX {
                    *phase = IntroPhase::Hold(INTRO_HOLD_FRAMES);
                }
            }
            IntroPhase::Hold(left) => {
                *phase = if left <= 1 {
                    IntroPhase::FadeOut
                } else {
                    IntroPhase::Hold(left - 1)
                };
            }
            IntroPhase::FadeOut => {
                *alpha = alpha.saturating_sub(INTRO_FADE_STEP);
                if *alpha == 0 {
                    self.state = State::Playing;
                }
            }
        }
    }

    fn move_player(&mut self, input: &InputState) {
        if input.is_held(Key::Up) {
            self.p1.y -= PLAYER_STEP;
        }
        if input.is_held(Key::Down) {
            self.p1.y += PLAYER_STEP;
        }
        let axis = input.axes[1];
        if axis.abs() > STICK_DEADZONE {
            self.p1.y += (axis * PLAYER_STEP).trunc();
        }
    }

    fn move_ai(&mut self) {
        if self.paused || self.ball.center_x() <= FIELD_W / 2.0 {
            return;
        }
        let speed = AI_SPEED[self.difficulty];
        let mut target = self.ball.center_y();
        // Easy AI chases a point above itself whenever the ball is higher up
        if self.difficulty == 0 && self.ball.center_y() < self.p2.center_y() + 20.0 {
            target = self.p2.center_y() - 10.0;
        }
        self.p2.y += (target - self.p2.center_y()).clamp(-speed, speed);
    }

    fn move_ball(&mut self) {
        self.ball.x += self.ball_vx * self.speed_mult;
        self.ball.y += self.ball_vy * self.speed_mult;

        if (self.ball.top() <= 0.0 && self.ball_vy < 0.0)
            || (self.ball.bottom() >= FIELD_H && self.ball_vy > 0.0)
        {
            self.ball_vy = -self.ball_vy;
            self.sounds.play(Sfx::Wall);
        }

        if self.ball.left() <= 0.0 {
            self.p2_score += 1;
            self.sounds.play(Sfx::Score);
            self.reset_ball(-1.0);
        } else if self.ball.right() >= FIELD_W {
            self.p1_score += 1;
            self.sounds.play(Sfx::Score);
            self.reset_ball(1.0);
        }

        if self.ball.intersects(&self.p1) && self.ball_vx < 0.0 {
            self.return_ball();
        }
        if self.ball.intersects(&self.p2) && self.ball_vx > 0.0 {
            self.return_ball();
        }
    }

    fn return_ball(&mut self) {
        self.ball_vx = -self.ball_vx;
        self.speed_mult += SPEED_UP;
        self.sounds.play(Sfx::Paddle);
    }

    /// Back to the centre, waiting for a serve toward `direction` (-1 left, 1 right).
    fn reset_ball(&mut self, direction: f32) {
        self.ball.center_on(FIELD_W / 2.0, FIELD_H / 2.0);
        self.ball_vx = BALL_SPEED * direction;
        self.speed_mult = 1.0;
        self.paused = true;
        log::debug!("pong: {} - {}", self.p1_score, self.p2_score);
    }

    fn cycle_difficulty(&mut self, step: isize) {
        self.difficulty = (self.difficulty as isize + step).rem_euclid(3) as usize;
    }

    fn render_intro(&self, frame: &mut Frame, area: Rect, alpha: u8) {
        frame.render_widget(Block::default().style(Style::default().bg(BG)), area);
        let text = Paragraph::new(Line::from(Span::styled(
            "C Y B E R   P O N G",
            Style::default()
                .fg(ui::fade(Color::Rgb(255, 255, 255), alpha))
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(text, ui::centered_rect(area.width, 1, area));
    }

    fn render_field(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let mut canvas = Canvas::new(width, height, BG);
        let sx = width as f32 / FIELD_W;
        let sy = height as f32 / FIELD_H;
        let scaled = |b: &Body| {
            let x0 = (b.left() * sx) as i32;
            let y0 = (b.top() * sy) as i32;
            let x1 = ((b.right() * sx) as i32).max(x0 + 1);
            let y1 = ((b.bottom() * sy) as i32).max(y0 + 1);
            (x0, y0, x1 - x0, y1 - y0)
        };

        let mid = (width / 2) as i32;
        for y in 0..height as i32 {
            canvas.set(mid, y, '┊', Style::default().fg(Color::Rgb(50, 50, 50)).bg(BG));
        }

        let (x, y, w, h) = scaled(&self.p1);
        canvas.fill(x, y, w, h, '█', Style::default().fg(P1_COLOR).bg(BG));
        let (x, y, w, h) = scaled(&self.p2);
        canvas.fill(x, y, w, h, '█', Style::default().fg(P2_COLOR).bg(BG));

        let bx = (self.ball.center_x() * sx) as i32;
        let by = (self.ball.center_y() * sy) as i32;
        canvas.set(
            bx,
            by,
            '●',
            Style::default()
                .fg(Color::White)
                .bg(BG)
                .add_modifier(Modifier::BOLD),
        );
        canvas.into_lines()
    }

    fn render_game(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(P1_COLOR))
            .title(" ◐ Cyber Pong ")
            .title_style(Style::default().fg(P2_COLOR).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(4),
                Constraint::Length(1),
            ])
            .split(inner);

        let score = Line::from(vec![
            Span::styled(
                format!("{}", self.p1_score),
                Style::default().fg(P1_COLOR).add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(
                format!("{}", self.p2_score),
                Style::default().fg(P2_COLOR).add_modifier(Modifier::BOLD),
            ),
            ui::separator(),
            Span::styled(
                DIFFICULTY_NAMES[self.difficulty],
                Style::default().fg(DIFFICULTY_COLORS[self.difficulty]),
            ),
        ]);
        frame.render_widget(Paragraph::new(score).alignment(Alignment::Center), chunks[0]);

        let field = self.render_field(chunks[1].width as usize, chunks[1].height as usize);
        frame.render_widget(Paragraph::new(field), chunks[1]);

        if self.paused {
            let msg = Line::from(vec![
                Span::styled(
                    "Press START / SPACE to Serve",
                    Style::default().fg(Color::Rgb(200, 200, 200)),
                ),
                ui::separator(),
                Span::styled(
                    format!("Difficulty: {} (1-3, [ ] or D-PAD)", DIFFICULTY_NAMES[self.difficulty]),
                    Style::default().fg(DIFFICULTY_COLORS[self.difficulty]),
                ),
            ]);
            frame.render_widget(Paragraph::new(msg).alignment(Alignment::Center), chunks[2]);
        } else {
            frame.render_widget(
                Paragraph::new(ui::help_line(&[
                    ("W/S ↑↓", "Paddle"),
                    ("Space", "Pause"),
                    ("Esc", "Quit"),
                    ("-", "Home"),
                ])),
                chunks[2],
            );
        }
    }
}

impl Game for Pong {
    fn handle_input(&mut self, event: InputEvent) -> FrameSignal {
        if matches!(
            event,
            InputEvent::Key(Key::Cancel) | InputEvent::Button(Button::B)
        ) {
            return FrameSignal::Exit;
        }
        match self.state {
            State::Intro { .. } => {
                if matches!(event, InputEvent::Key(_) | InputEvent::Button(_)) {
                    self.state = State::Playing;
                }
            }
            State::Playing => match event {
                InputEvent::Key(Key::Space) | InputEvent::Button(Button::Start) => {
                    self.paused = !self.paused;
                }
                InputEvent::Key(Key::Digit(d @ 1..=3)) if self.paused => {
                    self.difficulty = d as usize - 1;
                }
                InputEvent::Button(Button::LeftShoulder) | InputEvent::Hat(-1, _) if self.paused => {
                    self.cycle_difficulty(-1);
                }
                InputEvent::Button(Button::RightShoulder) | InputEvent::Hat(1, _) if self.paused => {
                    self.cycle_difficulty(1);
                }
                _ => {}
            },
        }
        FrameSignal::Running
    }

    fn update(&mut self, _dt: Duration, input: &InputState) {
        match self.state {
            State::Intro { .. } => self.update_intro(),
            State::Playing => {
                self.move_player(input);
                self.move_ai();
                self.p1.clamp_y(FIELD_H);
                self.p2.clamp_y(FIELD_H);
                if !self.paused {
                    self.move_ball();
                }
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        match self.state {
            State::Intro { alpha, .. } => self.render_intro(frame, area, alpha),
            State::Playing => self.render_game(frame, area),
        }
    }

    fn reset(&mut self) {
        self.p1_score = 0;
        self.p2_score = 0;
        self.p1.y = FIELD_H / 2.0 - PADDLE_H / 2.0;
        self.p2.y = FIELD_H / 2.0 - PADDLE_H / 2.0;
        self.ball_vy = BALL_SPEED;
        self.reset_ball(1.0);
    }

    fn get_score(&self) -> u32 {
        self.p1_score
    }

    fn is_game_over(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::audio::testing::Recorder;

    const FRAME: Duration = Duration::from_millis(16);

    fn serving() -> Pong {
        let mut p = Pong::new(&AudioOut::muted());
        p.state = State::Playing;
        p.paused = false;
        p
    }

    fn idle() -> InputState {
        InputState::default()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn paddle_returns_speed_the_ball_up() {
        let mut p = serving();
        p.ball.x = p2_left() - BALL_SIZE - 2.0;
        p.ball.y = 230.0;
        p.update(FRAME, &idle());
        assert!(p.ball_vx < 0.0);
        assert!(close(p.speed_mult, 1.05));

        p.ball.x = PADDLE_MARGIN + PADDLE_W + 2.0;
        p.ball.y = 230.0;
        p.update(FRAME, &idle());
        assert!(p.ball_vx > 0.0);
        assert!(close(p.speed_mult, 1.10));
    }

    fn p2_left() -> f32 {
        FIELD_W - PADDLE_MARGIN - PADDLE_W
    }

    #[test]
    fn ball_moving_away_is_not_returned_twice() {
        let mut p = serving();
        p.ball.x = p2_left() - 5.0;
        p.ball.y = 230.0;
        p.ball_vx = -BALL_SPEED;
        p.update(FRAME, &idle());
        assert!(p.ball_vx < 0.0);
        assert!(close(p.speed_mult, 1.0));
    }

    #[test]
    fn left_crossing_scores_once_for_player_two() {
        let mut p = serving();
        p.speed_mult = 1.3;
        p.ball.x = 2.0;
        p.ball.y = 100.0;
        p.ball_vx = -BALL_SPEED;
        p.update(FRAME, &idle());
        assert_eq!((p.p1_score, p.p2_score), (0, 1));
        assert!(p.paused);
        assert_eq!(p.speed_mult, 1.0);
        assert!(close(p.ball.center_x(), FIELD_W / 2.0));
        assert!(close(p.ball.center_y(), FIELD_H / 2.0));
        assert!(p.ball_vx < 0.0, "serve goes toward the player who conceded");

        for _ in 0..10 {
            p.update(FRAME, &idle());
        }
        assert_eq!(p.p2_score, 1);
    }

    #[test]
    fn right_crossing_scores_for_player_one() {
        let mut p = serving();
        p.ball.x = FIELD_W - BALL_SIZE - 1.0;
        p.ball.y = 10.0;
        p.update(FRAME, &idle());
        assert_eq!((p.p1_score, p.p2_score), (1, 0));
        assert!(p.ball_vx > 0.0);
    }

    #[test]
    fn walls_flip_vertical_velocity() {
        let mut p = serving();
        p.ball.y = 2.0;
        p.ball_vy = -BALL_SPEED;
        p.update(FRAME, &idle());
        assert!(p.ball_vy > 0.0);

        p.ball.y = FIELD_H - BALL_SIZE - 1.0;
        p.update(FRAME, &idle());
        assert!(p.ball_vy < 0.0);
    }

    #[test]
    fn pause_freezes_ball_and_ai() {
        let mut p = serving();
        p.paused = true;
        p.ball.x = 600.0;
        p.ball.y = 10.0;
        let (ball, p2) = (p.ball, p.p2);
        p.update(FRAME, &idle());
        assert_eq!(p.ball, ball);
        assert_eq!(p.p2, p2);
    }

    #[test]
    fn ai_waits_for_the_ball_to_cross_centre() {
        let mut p = serving();
        p.ball.x = 100.0;
        p.ball.y = 10.0;
        let y = p.p2.y;
        p.update(FRAME, &idle());
        assert_eq!(p.p2.y, y);

        p.ball.x = 500.0;
        p.ball.y = 10.0;
        p.update(FRAME, &idle());
        assert_eq!(p.p2.y, y - AI_SPEED[1]);
    }

    #[test]
    fn hard_ai_steps_faster() {
        let mut p = serving();
        p.difficulty = 2;
        p.ball.x = 500.0;
        p.ball.y = 400.0;
        let y = p.p2.y;
        p.update(FRAME, &idle());
        assert_eq!(p.p2.y, y + AI_SPEED[2]);
    }

    #[test]
    fn easy_ai_chases_a_decoy_above_itself() {
        let mut p = serving();
        p.difficulty = 0;
        p.ball.x = 500.0;
        // Ball centre just below the paddle centre, inside the 20 unit band
        p.ball.y = p.p2.center_y() + 5.0 - BALL_SIZE / 2.0;
        let y = p.p2.y;
        p.update(FRAME, &idle());
        assert_eq!(p.p2.y, y - AI_SPEED[0]);
    }

    #[test]
    fn paddles_are_clamped() {
        let mut p = serving();
        p.paused = true;
        p.p1.y = -50.0;
        p.p2.y = FIELD_H;
        p.update(FRAME, &idle());
        assert_eq!(p.p1.y, 0.0);
        assert_eq!(p.p2.y, FIELD_H - PADDLE_H);
    }

    #[test]
    fn stick_moves_player_outside_deadzone() {
        let mut p = serving();
        p.paused = true;
        let y = p.p1.y;
        let mut input = idle();
        input.axes[1] = 0.15;
        p.update(FRAME, &input);
        assert_eq!(p.p1.y, y);
        input.axes[1] = 0.5;
        p.update(FRAME, &input);
        assert_eq!(p.p1.y, y + 3.0);
        let keys = InputState {
            held: vec![Key::Up],
            ..idle()
        };
        p.update(FRAME, &keys);
        assert_eq!(p.p1.y, y + 3.0 - PLAYER_STEP);
    }

    #[test]
    fn difficulty_changes_only_while_paused() {
        let mut p = serving();
        p.handle_input(InputEvent::Key(Key::Digit(3)));
        assert_eq!(p.difficulty, 1);
        p.handle_input(InputEvent::Key(Key::Space));
        assert!(p.paused);
        p.handle_input(InputEvent::Key(Key::Digit(3)));
        assert_eq!(p.difficulty, 2);
        p.handle_input(InputEvent::Button(Button::RightShoulder));
        assert_eq!(p.difficulty, 0);
        p.handle_input(InputEvent::Hat(-1, 0));
        assert_eq!(p.difficulty, 2);
        p.handle_input(InputEvent::Button(Button::Start));
        assert!(!p.paused);
    }

    #[test]
    fn escape_and_b_exit() {
        let mut p = serving();
        assert_eq!(p.handle_input(InputEvent::Key(Key::Cancel)), FrameSignal::Exit);
        assert_eq!(p.handle_input(InputEvent::Button(Button::B)), FrameSignal::Exit);
        assert_eq!(p.handle_input(InputEvent::Key(Key::Up)), FrameSignal::Running);
    }

    #[test]
    fn reset_starts_a_fresh_match() {
        let mut p = serving();
        p.p1_score = 3;
        p.p2_score = 2;
        p.speed_mult = 2.0;
        p.difficulty = 2;
        p.p1.y = 0.0;
        p.p2.y = FIELD_H - PADDLE_H;
        p.ball.center_on(100.0, 50.0);
        p.ball_vx = -BALL_SPEED;
        p.ball_vy = -BALL_SPEED;

        p.reset();
        assert_eq!((p.p1_score, p.p2_score), (0, 0));
        assert_eq!(p.get_score(), 0);
        assert!(close(p.speed_mult, 1.0));
        assert!(p.paused);
        assert!(close(p.ball_vx, BALL_SPEED));
        assert!(close(p.ball_vy, BALL_SPEED));
        assert!(close(p.p1.y, FIELD_H / 2.0 - PADDLE_H / 2.0));
        assert!(close(p.p2.y, p.p1.y));
        assert!(close(p.ball.center_x(), FIELD_W / 2.0));
        assert!(close(p.ball.center_y(), FIELD_H / 2.0));
        assert_eq!(p.difficulty, 2, "difficulty is a setting, not match state");
    }

    #[test]
    fn intro_plays_chord_and_fades_out() {
        let recorder = Rc::new(Recorder::default());
        let mut p = Pong::new(&AudioOut::from_playback(recorder.clone()));
        assert_eq!(*recorder.played.borrow(), vec![(SAMPLE_RATE * 3) as usize]);

        // 85 frames in, 90 held, 85 out
        for _ in 0..259 {
            p.update(FRAME, &idle());
        }
        assert!(matches!(p.state, State::Intro { phase: IntroPhase::FadeOut, .. }));
        p.update(FRAME, &idle());
        assert_eq!(p.state, State::Playing);
        assert!(p.paused, "first serve waits for the player");
    }

    #[test]
    fn key_skips_intro() {
        let mut p = Pong::new(&AudioOut::muted());
        p.handle_input(InputEvent::Key(Key::Confirm));
        assert_eq!(p.state, State::Playing);
    }

    #[test]
    fn renders_field() {
        use ratatui::backend::TestBackend;
        use ratatui::Terminal;

        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        let mut p = serving();
        p.paused = true;
        terminal
            .draw(|f| {
                let area = f.area();
                p.render(f, area)
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains('●'));
        assert!(text.contains("MEDIUM"));
    }
}
