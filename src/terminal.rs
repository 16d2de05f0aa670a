// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based scanner
//!
//! Home menu, live camera preview rendered with Unicode half-block
//! characters, and a gallery screen backed by the native file dialog.

use crate::app::frame_processor::QrDecoder;
use crate::app::{Effect, Message, NavEvent, ScannerApp, Screen, Services};
use crate::backends::camera::types::CameraFrame;
use crate::backends::camera::{GstFrameSource, shared_source};
use crate::backends::picker::DialogImagePicker;
use crate::config::Config;
use crate::constants::ui;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::channel::mpsc;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use std::sync::Arc;
use tracing::info;

/// Run the terminal scanner
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    let services = Services {
        source: shared_source(GstFrameSource::new(config.camera_device)),
        decoder: Arc::new(QrDecoder::with_max_dimension(config.max_dimension)),
        picker: Arc::new(DialogImagePicker::new()),
        runtime: runtime.handle().clone(),
    };

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &config, services);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Pending decodes and dialogs are abandoned
    runtime.shutdown_background();

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
    services: Services,
) -> Result<(), Box<dyn std::error::Error>> {
    let (sender, mut receiver) = mpsc::unbounded();
    let mut app = ScannerApp::new(config, services, sender);
    let mut focus = HomeFocus::default();

    info!("Terminal scanner started");

    'main: loop {
        // Results from the analyzer and the gallery flow
        while let Ok(message) = receiver.try_recv() {
            if app.update(message).contains(&Effect::Quit) {
                break 'main;
            }
        }
        app.update(Message::Tick);

        let frame_widget = FrameWidget {
            frame: app.preview(),
            mirror: config.mirror_preview,
        };

        terminal.draw(|f| {
            let area = f.area();
            let state = app.state();

            let title_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: 1,
            };
            let body_area = Rect {
                x: area.x,
                y: area.y + 1,
                width: area.width,
                height: area.height.saturating_sub(2),
            };
            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };

            f.render_widget(
                TitleBar {
                    title: state.screen.title(),
                },
                title_area,
            );

            match state.screen {
                Screen::Home => f.render_widget(HomeMenu { focus }, body_area),
                Screen::Camera => {
                    let preview_area = Rect {
                        height: body_area.height.saturating_sub(1),
                        ..body_area
                    };
                    let label_area = Rect {
                        y: body_area.y + preview_area.height,
                        height: 1,
                        ..body_area
                    };
                    f.render_widget(&frame_widget, preview_area);
                    f.render_widget(
                        Label {
                            text: &state.scanned_label(),
                        },
                        label_area,
                    );
                }
                Screen::Gallery => {
                    let label_area = Rect {
                        y: body_area.y + body_area.height / 2,
                        height: 1,
                        ..body_area
                    };
                    let text = if state.pending_pick.is_some() {
                        "Choose an image in the file dialog...".to_string()
                    } else {
                        state.scanned_label()
                    };
                    f.render_widget(Label { text: &text }, label_area);
                }
            }

            let hints = key_hints(state.screen);
            let status = StatusBar {
                message: state.notification.text().unwrap_or(hints),
                highlighted: state.notification.current().is_some(),
            };
            f.render_widget(status, status_area);
        })?;

        // Handle input with timeout for frame updates
        if event::poll(ui::POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(message) = key_to_message(app.state().screen, &mut focus, key)
            && app.update(message).contains(&Effect::Quit)
        {
            break;
        }
    }

    app.shutdown();
    Ok(())
}

/// Selected button on the home screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum HomeFocus {
    #[default]
    Camera,
    Gallery,
}

impl HomeFocus {
    fn toggle(self) -> Self {
        match self {
            HomeFocus::Camera => HomeFocus::Gallery,
            HomeFocus::Gallery => HomeFocus::Camera,
        }
    }

    fn event(self) -> NavEvent {
        match self {
            HomeFocus::Camera => NavEvent::OpenCamera,
            HomeFocus::Gallery => NavEvent::OpenGallery,
        }
    }
}

/// Map a key press to a message for the current screen
fn key_to_message(screen: Screen, focus: &mut HomeFocus, key: KeyEvent) -> Option<Message> {
    // Ctrl+C quits from anywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Message::Quit);
    }

    match screen {
        Screen::Home => match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Tab | KeyCode::BackTab => {
                *focus = focus.toggle();
                None
            }
            KeyCode::Enter => Some(Message::Navigate(focus.event())),
            KeyCode::Char('c') => Some(Message::Navigate(NavEvent::OpenCamera)),
            KeyCode::Char('g') => Some(Message::Navigate(NavEvent::OpenGallery)),
            KeyCode::Char('q') => Some(Message::Quit),
            _ => None,
        },
        Screen::Camera | Screen::Gallery => match key.code {
            KeyCode::Esc | KeyCode::Backspace => Some(Message::Navigate(NavEvent::Back)),
            _ => None,
        },
    }
}

fn key_hints(screen: Screen) -> &'static str {
    match screen {
        Screen::Home => "↑/↓ select | Enter open | 'c' camera | 'g' gallery | 'q' quit",
        Screen::Camera | Screen::Gallery => "Esc back | Ctrl+C quit",
    }
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
    mirror: bool,
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.as_deref().filter(|f| f.width > 0 && f.height > 0) else {
            // No frame yet - show placeholder
            centered_string(area, buf, "Waiting for camera...", Style::default());
            return;
        };

        // Each terminal cell displays 2 vertical pixels using half-block characters
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let column = if self.mirror {
                    display_width - 1 - tx
                } else {
                    tx
                };
                let src_x = (column as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (r, g, b) = frame.sample_rgb(src_x, src_y_top);
                let top_color = Color::Rgb(r, g, b);
                let (r, g, b) = frame.sample_rgb(src_x, src_y_bottom);
                let bottom_color = Color::Rgb(r, g, b);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top_color);
                    cell.set_bg(bottom_color);
                }
            }
        }
    }
}

/// The two home screen buttons
struct HomeMenu {
    focus: HomeFocus,
}

impl Widget for HomeMenu {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let buttons = [
            (HomeFocus::Camera, "[ Open Camera ]"),
            (HomeFocus::Gallery, "[ Open Gallery ]"),
        ];
        let top = area.y + area.height.saturating_sub(3) / 2;

        for (row, (focus, text)) in buttons.into_iter().enumerate() {
            let y = top + (row as u16) * 2;
            if y >= area.y + area.height {
                break;
            }
            let style = if focus == self.focus {
                Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
            } else {
                Style::default()
            };
            centered_string(Rect { y, height: 1, ..area }, buf, text, style);
        }
    }
}

/// One centered line of text
struct Label<'a> {
    text: &'a str,
}

impl Widget for Label<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        centered_string(area, buf, self.text, Style::default().add_modifier(Modifier::BOLD));
    }
}

struct TitleBar<'a> {
    title: &'a str,
}

impl Widget for TitleBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        fill_line(area, buf, Color::Blue);
        centered_string(
            area,
            buf,
            self.title,
            Style::default().fg(Color::White).bg(Color::Blue),
        );
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    highlighted: bool,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = if self.highlighted {
            Color::Yellow
        } else {
            Color::DarkGray
        };
        let fg = if self.highlighted {
            Color::Black
        } else {
            Color::White
        };
        fill_line(area, buf, bg);

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, Style::default().fg(fg).bg(bg));
    }
}

fn fill_line(area: Rect, buf: &mut Buffer, bg: Color) {
    for x in area.x..area.x + area.width {
        if let Some(cell) = buf.cell_mut((x, area.y)) {
            cell.set_char(' ');
            cell.set_bg(bg);
        }
    }
}

fn centered_string(area: Rect, buf: &mut Buffer, text: &str, style: Style) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let text: String = text.chars().take(area.width as usize).collect();
    let len = text.chars().count() as u16;
    let x = area.x + (area.width.saturating_sub(len)) / 2;
    let y = area.y + area.height / 2;
    buf.set_string(x, y, text, style);
}
