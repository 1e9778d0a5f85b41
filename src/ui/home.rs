use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::games::GameKind;

const BANNER: &str = r#"
 ╔═════════════════════════════════════════════════════════════════════════════╗
 ║  ██████╗ ██╗   ██╗███████╗████████╗         ██████╗ █████╗ ██████╗ ███████╗ ║
 ║  ██╔══██╗██║   ██║██╔════╝╚══██╔══╝         ██╔════╝██╔══██╗██╔══██╗██╔════╝ ║
 ║  ██████╔╝██║   ██║███████╗   ██║   ███████╗ ██║     ███████║██║  ██║█████╗   ║
 ║  ██╔══██╗██║   ██║╚════██║   ██║   ╚══════╝ ██║     ██╔══██║██║  ██║██╔══╝   ║
 ║  ██║  ██║╚██████╔╝███████║   ██║            ╚██████╗██║  ██║██████╔╝███████╗ ║
 ║  ╚═╝  ╚═╝ ╚═════╝ ╚══════╝   ╚═╝             ╚═════╝╚═╝  ╚═╝╚═════╝ ╚══════╝ ║
 ╚═════════════════════════════════════════════════════════════════════════════╝"#;

const KEY_COLOR: Color = Color::Rgb(80, 200, 255);
const DESC_COLOR: Color = Color::Rgb(140, 140, 140);
const GOLD: Color = Color::Rgb(255, 220, 80);

struct GameTile {
    icon: &'static str,
    desc: &'static str,
    color: Color,
    border_color: Color,
    controls: &'static [(&'static str, &'static str)],
}

fn tile(kind: GameKind) -> GameTile {
    match kind {
        GameKind::Tetris => GameTile {
            icon: "▦",
            desc: "Stack falling blocks,\nclear full rows!",
            color: Color::Rgb(0, 200, 255),
            border_color: Color::Rgb(0, 100, 130),
            controls: &[
                ("← / →", "Move piece"),
                ("↑ / X / J", "Rotate"),
                ("↓", "Soft drop"),
                ("Space", "Hard drop"),
                ("Esc / P", "Menu"),
            ],
        },
        GameKind::Pong => GameTile {
            icon: "◐",
            desc: "Rally against\nthe machine!",
            color: Color::Rgb(255, 50, 100),
            border_color: Color::Rgb(130, 25, 50),
            controls: &[
                ("↑ / ↓", "Move paddle"),
                ("Space / P", "Serve / pause"),
                ("1-3  [ ]", "Difficulty (paused)"),
                ("Esc / K", "Quit"),
            ],
        },
        GameKind::Snake => GameTile {
            icon: "◆",
            desc: "Eat, grow and\ndon't bite yourself!",
            color: Color::Rgb(0, 255, 200),
            border_color: Color::Rgb(0, 130, 100),
            controls: &[
                ("↑ ↓ ← →", "Steer"),
                ("Enter / J", "Restart after a crash"),
                ("K", "Quit after a crash"),
                ("Esc", "Quit"),
            ],
        },
    }
}

fn key_line(key: &str, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("    {key:<17}"), Style::default().fg(KEY_COLOR)),
        Span::styled(what.to_string(), Style::default().fg(DESC_COLOR)),
    ])
}

fn render_game_tile(frame: &mut Frame, area: Rect, index: usize, kind: GameKind, selected: bool) {
    let tile = tile(kind);
    let border_color = if selected { GOLD } else { tile.border_color };
    let border_type = if selected { BorderType::Double } else { BorderType::Rounded };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let name_color = if selected { Color::Rgb(255, 255, 255) } else { tile.color };
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("[{}] ", index + 1),
            Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{} ", tile.icon), Style::default().fg(tile.color)),
        Span::styled(kind.name(), Style::default().fg(name_color).add_modifier(Modifier::BOLD)),
    ])];

    let desc_color = if selected {
        Color::Rgb(180, 180, 200)
    } else {
        Color::Rgb(120, 120, 140)
    };
    for desc_line in tile.desc.split('\n') {
        lines.push(Line::from(Span::styled(desc_line, Style::default().fg(desc_color))));
    }

    if selected {
        lines.push(Line::from(Span::styled(
            "▶ Enter to play",
            Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        )));
    }

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn game_controls(kind: GameKind) -> Vec<Line<'static>> {
    let tile = tile(kind);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {} {}", tile.icon, kind.name()),
            Style::default().fg(tile.color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(tile.controls.iter().map(|(key, what)| key_line(key, what)));
    lines.push(key_line("-", "Back to this screen"));
    lines
}

pub fn render_home(
    frame: &mut Frame,
    area: Rect,
    selected_game: usize,
    last_played: Option<(GameKind, u32)>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Banner
            Constraint::Length(2),  // Subtitle
            Constraint::Length(8),  // Game tiles
            Constraint::Min(8),     // Controls area
            Constraint::Length(2),  // Footer
        ])
        .split(area);

    let banner = Paragraph::new(BANNER)
        .style(Style::default().fg(KEY_COLOR))
        .alignment(Alignment::Center);
    frame.render_widget(banner, chunks[0]);

    let subtitle = Paragraph::new(Line::from(Span::styled(
        "  ⚡ Classics ⚡  ",
        Style::default()
            .fg(GOLD)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(subtitle, chunks[1]);

    let games_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(60, 150, 200)))
        .title(" 🎮 Games: ←→ Select, Enter to Play ")
        .title_style(Style::default().fg(Color::Rgb(200, 120, 255)).add_modifier(Modifier::BOLD));
    let games_inner = games_block.inner(chunks[2]);
    frame.render_widget(games_block, chunks[2]);

    let kinds = GameKind::all();
    let tile_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, kinds.len() as u32); kinds.len()])
        .split(games_inner);
    for (i, &kind) in kinds.iter().enumerate() {
        render_game_tile(frame, tile_cols[i], i, kind, selected_game == i);
    }

    let ctrl_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[3]);

    let controls = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  🔧 Navigation",
            Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        )),
        key_line("← →", "Select game"),
        key_line("1-3", "Launch game"),
        key_line("Enter / J", "Play selected"),
        key_line("Esc / Ctrl+C", "Quit"),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(60, 150, 200)))
            .title(" ⌨ Navigation Control ")
            .title_style(Style::default().fg(Color::Rgb(200, 120, 255)).add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(controls, ctrl_cols[0]);

    let kind = kinds[selected_game.min(kinds.len() - 1)];
    let accent = tile(kind).color;
    let game_ctrl = Paragraph::new(game_controls(kind)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Rgb(50, 100, 140)))
            .title(format!(" 🎮 {} Control ", kind.name()))
            .title_style(Style::default().fg(accent).add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(game_ctrl, ctrl_cols[1]);

    let mut footer = vec![
        Span::styled("  🦀 ", Style::default().fg(Color::Rgb(255, 100, 50))),
        Span::styled(
            concat!("v", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Rgb(80, 80, 100)),
        ),
    ];
    if let Some((kind, score)) = last_played {
        footer.push(Span::styled("  │  ", Style::default().fg(Color::Rgb(40, 40, 60))));
        footer.push(Span::styled(
            format!("Last: {} ", kind.name()),
            Style::default().fg(Color::Rgb(100, 100, 130)),
        ));
        footer.push(Span::styled(
            score.to_string(),
            Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(footer)).alignment(Alignment::Center), chunks[4]);
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;

    fn draw(selected: usize, last: Option<(GameKind, u32)>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                render_home(f, area, selected, last)
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn lists_every_game() {
        let text = draw(0, None);
        for kind in GameKind::all() {
            assert!(text.contains(kind.name()), "{}", kind.name());
        }
        assert!(!text.contains("Last:"));
    }

    #[test]
    fn shows_controls_for_the_selection() {
        let text = draw(1, None);
        assert!(text.contains("Cyber Pong Control"));
        assert!(text.contains("Move paddle"));
        assert!(text.contains("Esc / K"));
    }

    #[test]
    fn footer_reports_the_last_game() {
        let text = draw(2, Some((GameKind::Snake, 120)));
        assert!(text.contains("Last: Neon Snake"));
        assert!(text.contains("120"));
    }
}
