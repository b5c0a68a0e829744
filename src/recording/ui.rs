//! Terminal user interface for the microphone tester.
//!
//! Draws the waveform surface, the start/stop control with the elapsed
//! readout, and the playback/download controls once a clip exists.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::clip::RecordingClip;
use super::timer::MAX_RECORDING;
use super::visualizations::{SURFACE_HEIGHT, SURFACE_WIDTH};

const PAGE_BG: Color = Color::Rgb(15, 23, 42);
const SURFACE_BG: Color = Color::Rgb(11, 16, 32);
const TRACE: Color = Color::Rgb(34, 211, 238);
const TEXT: Color = Color::Rgb(229, 231, 235);
const START_BG: Color = Color::Rgb(22, 163, 74);
const STOP_BG: Color = Color::Rgb(220, 38, 38);
const BORDER: Color = Color::Rgb(31, 41, 55);

/// User input during a tester frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TesterCommand {
    /// No key pressed
    Continue,
    /// Start when idle, stop when recording (Enter or Space)
    Toggle,
    /// Play the last clip ('p')
    Play,
    /// Save the last clip ('d')
    Download,
    /// Exit (Escape, 'q', Ctrl+C)
    Quit,
}

/// Everything one frame needs to draw.
#[derive(Debug, Clone, Copy)]
pub struct TesterView<'a> {
    pub recording: bool,
    pub elapsed: &'a str,
    pub points: &'a [(f64, f64)],
    pub clip: Option<&'a RecordingClip>,
    pub playing: bool,
    pub status: Option<&'a str>,
}

/// Terminal session for the tester. Restores the terminal on cleanup or drop.
pub struct MicTesterTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl MicTesterTui {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If the alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Draws one frame.
    pub fn render(&mut self, view: &TesterView<'_>) -> anyhow::Result<()> {
        self.terminal.draw(|frame| draw_tester(frame, view))?;
        Ok(())
    }

    /// Reads pending key presses without blocking.
    ///
    /// Returns the first key that maps to a command.
    pub fn handle_input(&mut self) -> anyhow::Result<TesterCommand> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let command = match key.code {
                    KeyCode::Enter | KeyCode::Char(' ') => TesterCommand::Toggle,
                    KeyCode::Char('p') => TesterCommand::Play,
                    KeyCode::Char('d') => TesterCommand::Download,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        TesterCommand::Quit
                    }
                    KeyCode::Char('q') | KeyCode::Esc => TesterCommand::Quit,
                    _ => TesterCommand::Continue,
                };
                if command != TesterCommand::Continue {
                    tracing::debug!("Key {:?} -> {:?}", key.code, command);
                    return Ok(command);
                }
            }
        }
        Ok(TesterCommand::Continue)
    }

    /// Leaves the alternate screen and restores the cursor.
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for MicTesterTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Lays out and draws the tester screen.
pub fn draw_tester(frame: &mut Frame, view: &TesterView<'_>) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(PAGE_BG)), area);

    let [title_area, surface_area, controls_area, clip_area, status_area, tip_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

    frame.render_widget(
        Paragraph::new("Microphone Test")
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT).bold()),
        title_area,
    );

    let points = view.points;
    let surface = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BORDER)),
        )
        .background_color(SURFACE_BG)
        .marker(Marker::Braille)
        .x_bounds([0.0, SURFACE_WIDTH])
        .y_bounds([0.0, SURFACE_HEIGHT])
        .paint(move |ctx| {
            for pair in points.windows(2) {
                ctx.draw(&CanvasLine {
                    x1: pair[0].0,
                    y1: pair[0].1,
                    x2: pair[1].0,
                    y2: pair[1].1,
                    color: TRACE,
                });
            }
        });
    frame.render_widget(surface, surface_area);

    let control = if view.recording {
        Span::styled(" [Enter] Stop ", Style::default().bg(STOP_BG).fg(Color::White))
    } else {
        Span::styled(
            format!(" [Enter] Start (max {}s) ", MAX_RECORDING.as_secs()),
            Style::default().bg(START_BG).fg(Color::White),
        )
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            control,
            Span::raw("  "),
            Span::styled(view.elapsed, Style::default().fg(TEXT)),
        ]))
        .alignment(Alignment::Center),
        controls_area,
    );

    if let Some(clip) = view.clip {
        let play = if view.playing {
            "[p] Playing..."
        } else {
            "[p] Play"
        };
        let lines = vec![
            Line::from(vec![
                Span::styled(play, Style::default().fg(TRACE)),
                Span::styled(
                    format!(
                        "  {:.1} s, {}",
                        clip.duration().as_secs_f64(),
                        clip.media_type()
                    ),
                    Style::default().fg(TEXT).dim(),
                ),
            ]),
            Line::from(Span::styled(
                format!("[d] Download recording ({})", clip.file_name()),
                Style::default().fg(TRACE).underlined(),
            )),
        ];
        frame.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center),
            clip_area,
        );
    }

    if let Some(status) = view.status {
        frame.render_widget(
            Paragraph::new(status)
                .alignment(Alignment::Center)
                .style(Style::default().fg(TEXT)),
            status_area,
        );
    }

    frame.render_widget(
        Paragraph::new("Tip: use headphones to avoid feedback. q to quit.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(TEXT).dim()),
        tip_area,
    );
}
