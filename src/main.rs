use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points, Rectangle};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use offside_review::api::{HttpApi, LoginOutcome};
use offside_review::config::{self, ReviewConfig};
use offside_review::decision::{DecisionAction, SaveStatus};
use offside_review::detection::Team;
use offside_review::error::Rejection;
use offside_review::notify::{Notifications, ToastKind};
use offside_review::persist;
use offside_review::provider::{Provider, spawn_provider};
use offside_review::state::{Command, Delta, ReviewState, Screen, apply_delta};

const PITCH_LENGTH: f64 = 12000.0;
const PITCH_WIDTH: f64 = 7000.0;
const TEAM_A_COLOR: Color = Color::Rgb(0, 191, 255);
const TEAM_B_COLOR: Color = Color::Rgb(255, 20, 147);
const REFEREE_COLOR: Color = Color::Rgb(255, 215, 0);

struct App {
    state: ReviewState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<Command>>,
}

impl App {
    fn new(state: ReviewState, cmd_tx: Option<mpsc::Sender<Command>>) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn send(&mut self, command: Command) {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[WARN] Server connection unavailable");
            return;
        };
        if tx.send(command).is_err() {
            self.state.push_log("[WARN] Request could not be queued");
            self.state.notifications.alert("Server connection lost.");
        }
    }

    // Rejections are already surfaced by the state itself.
    fn dispatch(&mut self, result: Result<Command, Rejection>) {
        if let Ok(command) = result {
            self.send(command);
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.should_quit = true;
            return;
        }
        if self.state.notifications.current_alert().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.state.notifications.dismiss_alert();
            }
            return;
        }
        if key.code == KeyCode::F(1) {
            self.state.help_overlay = !self.state.help_overlay;
            return;
        }
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.state.help_overlay = false;
            }
            return;
        }

        match self.state.screen {
            Screen::Picker => self.on_picker_key(key, ctrl),
            Screen::Review => self.on_review_key(key),
            Screen::Adjust => self.on_adjust_key(key),
            Screen::Defenders => self.on_defenders_key(key),
            Screen::Decision => self.on_decision_key(key),
        }
    }

    fn on_picker_key(&mut self, key: KeyEvent, ctrl: bool) {
        if !self.state.picker_visible {
            return;
        }
        match key.code {
            KeyCode::Char('r') if ctrl => {
                let result = self.state.submit_upload(Instant::now());
                self.dispatch(result);
            }
            KeyCode::Char(c) if !ctrl => self.state.path_input.push(c),
            KeyCode::Backspace => {
                self.state.path_input.pop();
            }
            KeyCode::Enter => {
                let path = PathBuf::from(self.state.path_input.trim());
                let _ = self.state.select_image(&path);
            }
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn on_review_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('p') => self.state.adjustments_open = !self.state.adjustments_open,
            KeyCode::Char('+') | KeyCode::Char('=') => self.state.adjust_confidence(1),
            KeyCode::Char('-') => self.state.adjust_confidence(-1),
            KeyCode::Char('d') => {
                let result = self.state.request_rerun(Instant::now());
                self.dispatch(result);
            }
            KeyCode::Char('m') => {
                let _ = self.state.open_adjustment_form();
            }
            KeyCode::Char('r') | KeyCode::Enter => {
                if let Ok(Some(command)) = self.state.request_offside() {
                    self.send(command);
                }
            }
            KeyCode::Char('x') => {
                let _ = self.state.cancel();
            }
            _ => {}
        }
    }

    fn on_adjust_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Enter {
            if let Ok(commands) = self.state.apply_adjustments(Instant::now()) {
                for command in commands {
                    self.send(command);
                }
            }
            return;
        }
        if key.code == KeyCode::Esc {
            self.state.close_adjustment_form();
            return;
        }
        let Some(form) = self.state.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => form.select_next(),
            KeyCode::Char('k') | KeyCode::Up => form.select_prev(),
            KeyCode::Char('a') | KeyCode::Char('1') => form.set_team(Team::A),
            KeyCode::Char('b') | KeyCode::Char('2') => form.set_team(Team::B),
            KeyCode::Char('t') | KeyCode::Char(' ') => form.toggle_team(),
            KeyCode::Char('x') | KeyCode::Delete => form.toggle_delete(),
            KeyCode::Char('g') => form.toggle_goalkeeper(),
            _ => {}
        }
    }

    fn on_defenders_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left
            | KeyCode::Right
            | KeyCode::Tab
            | KeyCode::Char('h')
            | KeyCode::Char('l') => {
                self.state.defending_choice = self.state.defending_choice.other();
            }
            KeyCode::Char('a') => self.state.defending_choice = Team::A,
            KeyCode::Char('b') => self.state.defending_choice = Team::B,
            KeyCode::Enter => {
                let team = self.state.defending_choice;
                let result = self.state.assign_defending_team(team);
                self.dispatch(result);
            }
            _ => {}
        }
    }

    fn on_decision_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') => {
                let result = self.state.decide(DecisionAction::Confirm);
                self.dispatch(result);
            }
            KeyCode::Char('o') => {
                let result = self.state.decide(DecisionAction::Override);
                self.dispatch(result);
            }
            KeyCode::Char('n') => {
                let _ = self.state.cancel();
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    config::load_dotenv();
    let _log_guard = init_logging();

    let config = ReviewConfig::from_env()?;
    info!(base_url = %config.base_url, "starting offside review");

    let api = HttpApi::new(config.clone())?;
    let login = api.login();

    let provider = Provider::new(api, persist::pitch_dir());
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(provider, tx, cmd_rx);

    let mut state = ReviewState::new(
        config.form,
        config.classify_payload,
        Notifications::new(config.toast_duration),
    );
    match login {
        Ok(LoginOutcome::LoggedIn) => state.push_log("[INFO] Signed in"),
        Ok(LoginOutcome::Skipped) => {}
        Err(err) => {
            warn!("login failed: {err}");
            state.push_log(format!("[WARN] Login failed: {err}"));
            state.notifications.alert(
                "Login failed. Check OFFSIDE_USERNAME and OFFSIDE_PASSWORD.",
            );
        }
    }
    if let Some(path) = parse_image_arg() {
        state.path_input = path.display().to_string();
        let _ = state.select_image(&path);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(state, Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn init_logging() -> Option<WorkerGuard> {
    let dir = persist::log_dir();
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(&dir, "offside_review.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env("OFFSIDE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("offside_review=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

fn parse_image_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--image=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--image" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.state.tick(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let state = &app.state;
    let progress_height = if state.progress.is_visible() { 1 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(progress_height),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match state.screen {
        Screen::Picker => render_picker(frame, chunks[1], state),
        Screen::Review => render_review(frame, chunks[1], state),
        Screen::Adjust => render_adjust(frame, chunks[1], state),
        Screen::Defenders => render_defenders(frame, chunks[1], state),
        Screen::Decision => render_decision(frame, chunks[1], state),
    }

    if state.progress.is_visible() {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Green))
            .percent(state.progress.percent())
            .label(format!("{}%", state.progress.percent()));
        frame.render_widget(gauge, chunks[2]);
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[3]);

    frame.render_widget(Paragraph::new(footer_text(state)), chunks[4]);

    let area = frame.size();
    render_toasts(frame, area, state);
    if let Some(message) = state.notifications.current_alert() {
        render_alert(frame, area, message);
    } else if state.help_overlay {
        render_help_overlay(frame, area);
    }
}

fn header_text(state: &ReviewState) -> String {
    let screen = match state.screen {
        Screen::Picker => "UPLOAD",
        Screen::Review => "REVIEW",
        Screen::Adjust => "ADJUST PLAYERS",
        Screen::Defenders => "DEFENDING TEAM",
        Screen::Decision => "DECISION",
    };
    let image = state
        .image
        .as_ref()
        .map(|img| img.file_name.clone())
        .unwrap_or_else(|| "no image".to_string());
    format!(
        "OFFSIDE REVIEW | {screen} | {image}\nConfidence: {:.2}",
        state.confidence
    )
}

fn footer_text(state: &ReviewState) -> String {
    let hints = match state.screen {
        Screen::Picker => {
            "Type path | Enter Preview | Ctrl-R Run Detection | F1 Help | Esc/Ctrl-Q Quit"
        }
        Screen::Review => {
            "r Offside | m Adjust players | +/- Confidence | d Re-run | p Panel | x Cancel | ? Help | q Quit"
        }
        Screen::Adjust => {
            "j/k Move | a/b Team | t Toggle team | g Goalkeeper | x Delete | Enter Apply | Esc Back"
        }
        Screen::Defenders => "←/→ Choose | a/b Team | Enter Confirm",
        Screen::Decision => "c Confirm | o Override | n New review | q Quit",
    };
    hints.to_string()
}

fn render_picker(frame: &mut Frame, area: Rect, state: &ReviewState) {
    let mut lines = Vec::new();
    if state.picker_visible {
        lines.push(format!("Image path: {}_", state.path_input));
    } else {
        lines.push("Image submitted".to_string());
    }
    lines.push(String::new());
    match state.image.as_ref() {
        Some(img) => {
            lines.push(format!("Selected: {}", img.file_name));
            lines.push(format!("Type: {}  Size: {} bytes", img.mime, img.bytes.len()));
            let preview: String = img.preview.chars().take(48).collect();
            lines.push(format!("Preview: {preview}..."));
        }
        None => lines.push("No image selected".to_string()),
    }
    lines.push(String::new());
    lines.push(format!("[ {} ]", state.run_action.label()));

    let picker = Paragraph::new(lines.join("\n"))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Upload").borders(Borders::ALL));
    frame.render_widget(picker, area);
}

fn render_review(frame: &mut Frame, area: Rect, state: &ReviewState) {
    let panel_width = if state.adjustments_open { 34 } else { 0 };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(panel_width)])
        .split(area);

    render_pitch(frame, columns[0], state);
    if state.adjustments_open {
        let panel = Paragraph::new(adjustments_text(state))
            .wrap(Wrap { trim: false })
            .block(Block::default().title("Adjustments").borders(Borders::ALL));
        frame.render_widget(panel, columns[1]);
    }
}

fn adjustments_text(state: &ReviewState) -> String {
    let mut lines = Vec::new();
    if let Some(snapshot) = state.snapshot.as_ref() {
        if let Some(source) = snapshot.file_path() {
            lines.push(format!("Source: {source}"));
        }
        lines.push(format!("Players: {}", snapshot.player_count()));
        lines.push(format!("Referees: {}", snapshot.refs_xy.xy.len()));
        lines.push(format!(
            "Ball: {}",
            if snapshot.ball_xy.is_empty() { "not found" } else { "found" }
        ));
        lines.push(format!(
            "Goalkeeper: {}",
            if snapshot.has_goalkeeper() { "yes" } else { "unknown" }
        ));
    }
    lines.push(String::new());
    lines.push(format!("Confidence: {:.2}", state.confidence));
    lines.push(String::new());
    if state.classify_in_flight {
        lines.push("Classifying offside...".to_string());
    } else {
        lines.push("r  Confirm / offside".to_string());
    }
    lines.push("m  Manual team change".to_string());
    lines.push("d  Re-run detection".to_string());
    lines.push("x  Cancel detection".to_string());
    lines.join("\n")
}

fn render_pitch(frame: &mut Frame, area: Rect, state: &ReviewState) {
    let title = match state.pitch.as_ref() {
        Some(pitch) if state.pitch_visible => format!("Pitch ({})", pitch.path.display()),
        _ => "Pitch".to_string(),
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    let Some(snapshot) = state.snapshot.as_ref().filter(|_| state.pitch_visible) else {
        let empty = Paragraph::new("No pitch rendered yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let flip = |xy: [f64; 2]| (xy[0], PITCH_WIDTH - xy[1]);
    let mut team_a = Vec::new();
    let mut team_b = Vec::new();
    let mut unknown = Vec::new();
    let mut labels = Vec::new();
    for point in snapshot.player_points() {
        let coords = flip(point.xy);
        match point.team {
            Some(Team::A) => team_a.push(coords),
            Some(Team::B) => team_b.push(coords),
            None => unknown.push(coords),
        }
        if let Some(id) = point.tracker_id {
            let label = if point.goalkeeper { format!("{id}GK") } else { id.to_string() };
            labels.push((coords, label));
        }
    }
    let refs: Vec<(f64, f64)> = snapshot.refs_xy.xy.iter().copied().map(flip).collect();
    let ball: Vec<(f64, f64)> = snapshot.ball_xy.xy.iter().copied().map(flip).collect();

    let canvas = Canvas::default()
        .block(block)
        .x_bounds([0.0, PITCH_LENGTH])
        .y_bounds([0.0, PITCH_WIDTH])
        .paint(move |ctx| {
            ctx.draw(&Rectangle {
                x: 0.0,
                y: 0.0,
                width: PITCH_LENGTH,
                height: PITCH_WIDTH,
                color: Color::Green,
            });
            ctx.draw(&CanvasLine {
                x1: PITCH_LENGTH / 2.0,
                y1: 0.0,
                x2: PITCH_LENGTH / 2.0,
                y2: PITCH_WIDTH,
                color: Color::Green,
            });
            ctx.draw(&Points {
                coords: &team_a,
                color: TEAM_A_COLOR,
            });
            ctx.draw(&Points {
                coords: &team_b,
                color: TEAM_B_COLOR,
            });
            ctx.draw(&Points {
                coords: &unknown,
                color: Color::Gray,
            });
            ctx.draw(&Points {
                coords: &refs,
                color: REFEREE_COLOR,
            });
            ctx.draw(&Points {
                coords: &ball,
                color: Color::White,
            });
            for ((x, y), label) in &labels {
                ctx.print(*x, *y, label.clone());
            }
        });
    frame.render_widget(canvas, area);
}

fn render_adjust(frame: &mut Frame, area: Rect, state: &ReviewState) {
    let block = Block::default().title("Manual team change").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(form) = state.form.as_ref() else {
        frame.render_widget(Paragraph::new("No form open"), inner);
        return;
    };
    if form.rows.is_empty() {
        frame.render_widget(Paragraph::new("No players detected"), inner);
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(form.selected, form.rows.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let row = &form.rows[idx];
        let row_area = Rect {
            x: inner.x,
            y: inner.y + i as u16,
            width: inner.width,
            height: 1,
        };
        let selected = idx == form.selected;
        let mut style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if row.delete {
            style = style.fg(Color::Red).add_modifier(Modifier::CROSSED_OUT);
        }
        let team = |t: Team| if row.team == Some(t) { "(*)" } else { "( )" };
        let mut text = format!(
            "{} Player {:>4} ({:<10}) {} Team A {} Team B  [{}] Delete",
            if selected { ">" } else { " " },
            row.tracker_id,
            row.class_name,
            team(Team::A),
            team(Team::B),
            if row.delete { "x" } else { " " },
        );
        if form.options.goalkeeper_toggle {
            text.push_str(&format!("  [{}] Goalkeeper", if row.goalkeeper { "x" } else { " " }));
        }
        frame.render_widget(Paragraph::new(text).style(style), row_area);
    }
}

fn render_defenders(frame: &mut Frame, area: Rect, state: &ReviewState) {
    let option = |team: Team| {
        if state.defending_choice == team {
            format!("[x] {}", team.label())
        } else {
            format!("[ ] {}", team.label())
        }
    };
    let text = [
        "No goalkeeper was detected.".to_string(),
        "Which team is defending?".to_string(),
        String::new(),
        format!("{}    {}", option(Team::A), option(Team::B)),
    ]
    .join("\n");
    let prompt = Paragraph::new(text)
        .block(Block::default().title("Defending team").borders(Borders::ALL));
    frame.render_widget(prompt, area);
}

fn render_decision(frame: &mut Frame, area: Rect, state: &ReviewState) {
    let mut lines = Vec::new();
    match state.decision.as_ref() {
        Some(controller) => {
            lines.push(format!(
                "Algorithm decision: {}",
                controller.algorithm_decision.label()
            ));
            lines.push(String::new());
            if controller.controls_visible {
                lines.push("c  Confirm decision".to_string());
                lines.push(format!(
                    "o  Override to {}",
                    controller.algorithm_decision.flip().label()
                ));
            }
            if let Some(text) = controller.final_text() {
                lines.push(text);
            }
            match controller.save_status.as_ref() {
                Some(SaveStatus::Pending) => lines.push("Saving...".to_string()),
                Some(SaveStatus::Saved { .. }) => lines.push("Saved".to_string()),
                Some(SaveStatus::Failed) => lines.push("Not saved (see console)".to_string()),
                None => {}
            }
        }
        None => lines.push("No decision yet".to_string()),
    }
    if let Some(url) = state.redirect_url.as_ref() {
        lines.push(String::new());
        lines.push(format!("Results page: {url}"));
    }
    let panel = Paragraph::new(lines.join("\n"))
        .block(Block::default().title("Offside decision").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn console_text(state: &ReviewState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_toasts(frame: &mut Frame, area: Rect, state: &ReviewState) {
    let now = Instant::now();
    let width = 44.min(area.width);
    for (i, (toast, fading)) in state.notifications.visible(now).enumerate() {
        let y = area.y + 1 + (i as u16) * 3;
        if y + 3 > area.y + area.height {
            break;
        }
        let toast_area = Rect {
            x: area.x + area.width - width,
            y,
            width,
            height: 3,
        };
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Info => Color::Cyan,
            ToastKind::Warning => Color::Yellow,
            ToastKind::Danger => Color::Red,
        };
        let mut style = Style::default().fg(color);
        if fading {
            style = style.add_modifier(Modifier::DIM);
        }
        frame.render_widget(Clear, toast_area);
        let widget = Paragraph::new(toast.message.as_str())
            .style(style)
            .block(Block::default().borders(Borders::ALL).border_style(style));
        frame.render_widget(widget, toast_area);
    }
}

fn render_alert(frame: &mut Frame, area: Rect, message: &str) {
    let popup_area = centered_rect(50, 30, area);
    frame.render_widget(Clear, popup_area);
    let text = format!("{message}\n\n[ OK ]  (Enter)");
    let alert = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(Block::default().title("Alert").borders(Borders::ALL))
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(alert, popup_area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Offside Review - Help",
        "",
        "Upload:",
        "  type path    Image file to review",
        "  Enter        Preview the image",
        "  Ctrl-R       Run detection",
        "",
        "Review:",
        "  r            Offside classification",
        "  m            Manual team change",
        "  + / -        Detection confidence",
        "  d            Re-run detection",
        "  p            Show/hide adjustments",
        "  x            Cancel and start over",
        "",
        "Decision:",
        "  c / o        Confirm / override",
        "",
        "F1 toggles help, Ctrl-Q quits",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
