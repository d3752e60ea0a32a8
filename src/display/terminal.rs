// src/display/terminal.rs
//! Terminal-based front end

use crate::{
    error::{Result, TrackerError},
    provider::LocationProvider,
    tracker::{
        state::{SUBTITLE, TITLE},
        Control, LocationTracker, StatusTone, TrackerView,
    },
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    thread,
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What a key press asks the tracker to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Press the visible control
    Activate,
    Start,
    Stop,
    Quit,
}

/// Translate a key press into a user action
pub fn map_key(key: KeyEvent) -> Option<UserAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(UserAction::Quit),
        KeyCode::Enter | KeyCode::Char(' ') => Some(UserAction::Activate),
        KeyCode::Char('s') => Some(UserAction::Start),
        KeyCode::Char('t') => Some(UserAction::Stop),
        KeyCode::Char('q') | KeyCode::Esc => Some(UserAction::Quit),
        _ => None,
    }
}

pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }

    /// Run the terminal loop until the user quits.
    ///
    /// The tracker is dropped on return, cancelling any live watch.
    pub async fn run<P: LocationProvider>(&self, mut tracker: LocationTracker<P>) -> Result<()> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(stdout, Hide, DisableLineWrap) {
            let _ = restore_terminal(&mut stdout, terminal::disable_raw_mode);
            return Err(e.into());
        }

        let mut actions = spawn_key_reader();
        let outcome = self.event_loop(&mut stdout, &mut tracker, &mut actions).await;

        let restored = restore_terminal(&mut stdout, terminal::disable_raw_mode);
        drop(tracker);
        println!("Shutting down...");
        outcome.and(restored)
    }

    async fn event_loop<P: LocationProvider>(
        &self,
        stdout: &mut impl Write,
        tracker: &mut LocationTracker<P>,
        actions: &mut mpsc::UnboundedReceiver<UserAction>,
    ) -> Result<()> {
        loop {
            render(stdout, &tracker.view())?;

            tokio::select! {
                _ = tracker.next_update() => {}
                action = actions.recv() => {
                    match action {
                        Some(UserAction::Activate) => tracker.toggle(),
                        Some(UserAction::Start) => tracker.start_tracking(),
                        Some(UserAction::Stop) => tracker.stop_tracking(),
                        Some(UserAction::Quit) => return Ok(()),
                        None => {
                            return Err(TrackerError::Other("Keyboard input closed".to_string()));
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => return Ok(()),
            }
        }
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Read keys on a dedicated thread; it exits once the receiver is gone
fn spawn_key_reader() -> mpsc::UnboundedReceiver<UserAction> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        if let Some(action) = map_key(key) {
                            debug!("Key action {:?}", action);
                            if tx.send(action).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Error reading terminal input: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("Error polling terminal input: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Leave raw mode, then show the cursor and clear the screen.
///
/// Raw mode is always left even if the cursor commands fail; the first error
/// is returned.
fn restore_terminal<F>(out: &mut impl Write, disable_raw: F) -> Result<()>
where
    F: FnOnce() -> io::Result<()>,
{
    let raw = disable_raw();
    let screen = execute!(out, Show, EnableLineWrap, Clear(ClearType::All), MoveTo(0, 0));
    raw?;
    screen?;
    Ok(())
}

/// Draw the tracker view
pub fn render(stdout: &mut impl Write, view: &TrackerView) -> Result<()> {
    queue!(
        stdout,
        Clear(ClearType::All),
        MoveTo(0, 0),
        SetForegroundColor(Color::Green),
        Print(TITLE),
        MoveTo(0, 1),
        ResetColor,
        Print(SUBTITLE),
        MoveTo(0, 3)
    )?;

    let control_color = match view.control {
        Control::StartTracking => Color::Blue,
        Control::StopTracking => Color::Red,
    };
    queue!(
        stdout,
        SetForegroundColor(control_color),
        Print(format!("[ {} ]", view.control.label())),
        ResetColor,
        MoveTo(0, 5)
    )?;

    match view.tone {
        StatusTone::Error => queue!(
            stdout,
            SetForegroundColor(Color::Red),
            Print(&view.status),
            ResetColor
        )?,
        StatusTone::Normal => queue!(stdout, Print(&view.status))?,
    }

    queue!(
        stdout,
        MoveTo(0, 7),
        SetForegroundColor(Color::DarkGrey),
        Print("Enter/Space: press button   s: start   t: stop   q: quit"),
        ResetColor
    )?;

    stdout.flush()?;
    Ok(())
}
