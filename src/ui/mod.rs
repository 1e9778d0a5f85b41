pub mod home;

use ratatui::prelude::*;
use ratatui::widgets::*;

/// A fixed-size character canvas that games draw their field into before
/// handing it to ratatui as a paragraph.
pub struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Vec<(char, Style)>>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, bg: Color) -> Self {
        Self {
            width,
            height,
            cells: vec![vec![(' ', Style::default().bg(bg)); width]; height],
        }
    }

    /// Out-of-bounds writes are dropped.
    pub fn set(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            self.cells[y][x] = (ch, style);
        }
    }

    pub fn fill(&mut self, x: i32, y: i32, w: i32, h: i32, ch: char, style: Style) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, ch, style);
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> Option<char> {
        self.cells.get(y).and_then(|row| row.get(x)).map(|c| c.0)
    }

    pub fn into_lines(self) -> Vec<Line<'static>> {
        self.cells
            .into_iter()
            .map(|row| {
                let spans: Vec<Span<'static>> = row
                    .into_iter()
                    .map(|(ch, style)| Span::styled(String::from(ch), style))
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

/// Scales an RGB color toward black; `alpha` 255 is the color itself.
pub fn fade(color: Color, alpha: u8) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let k = |c: u8| (c as u16 * alpha as u16 / 255) as u8;
            Color::Rgb(k(r), k(g), k(b))
        }
        other => {
            if alpha < 128 {
                Color::Black
            } else {
                other
            }
        }
    }
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}

/// Draws a bordered panel with the given lines over whatever is underneath.
pub fn render_overlay(frame: &mut Frame, area: Rect, title: &str, accent: Color, lines: Vec<Line>) {
    let w = 44u16.min(area.width.saturating_sub(4));
    let h = (lines.len() as u16 + 2).min(area.height);
    let overlay_area = centered_rect(w, h, area);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(accent))
        .title(title.to_string())
        .title_style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(Color::Rgb(15, 15, 25)));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(Color::Rgb(15, 15, 25)));
    frame.render_widget(p, inner);
}

/// Status bar separator, shared by every game's header line.
pub fn separator() -> Span<'static> {
    Span::styled(" │ ", Style::default().fg(Color::DarkGray))
}

pub fn help_line(items: &[(&str, &str)]) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, what)) in items.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("│ ", Style::default().fg(Color::Rgb(60, 60, 60))));
        }
        spans.push(Span::styled(
            format!("{key} "),
            Style::default().fg(Color::Rgb(80, 200, 255)),
        ));
        spans.push(Span::styled(
            format!("{what} "),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}
