use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::task::JoinHandle;
use crate::app::{point_in_rect, App, SOCIAL_LINK};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('o') if ctrl => open_link(SOCIAL_LINK),

        KeyCode::Enter => {
            if let Some(index) = app.chat.selected_example {
                app.chat.click_shortcut(index);
            } else if !app.chat.is_loading() {
                app.chat.submit_input();
            }
        }
        KeyCode::Tab => app.chat.select_next_example(),

        // Transcript scrolling
        KeyCode::Up => app.chat.scroll_up(1),
        KeyCode::Down => app.chat.scroll_down(1),
        KeyCode::PageUp => {
            let half = half_page(app);
            app.chat.scroll_up(half);
        }
        KeyCode::PageDown => {
            let half = half_page(app);
            app.chat.scroll_down(half);
        }

        // Input editing
        KeyCode::Backspace => app.chat.backspace(),
        KeyCode::Delete => app.chat.delete(),
        KeyCode::Left => app.chat.cursor_left(),
        KeyCode::Right => app.chat.cursor_right(),
        KeyCode::Home => app.chat.cursor_home(),
        KeyCode::End => app.chat.cursor_end(),
        KeyCode::Char(c) if !ctrl => {
            app.chat.selected_example = None;
            app.chat.insert_char(c);
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;
    let in_messages = app.messages_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollUp if in_messages => app.chat.scroll_up(3),
        MouseEventKind::ScrollDown if in_messages => app.chat.scroll_down(3),
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(index) = app.shortcut_at(x, y) {
                app.chat.click_shortcut(index);
            } else if app.link_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false) {
                open_link(SOCIAL_LINK);
            }
        }
        _ => {}
    }
}

fn half_page(app: &App) -> u16 {
    app.messages_area
        .map(|r| r.height.saturating_sub(2) / 2)
        .unwrap_or(5)
        .max(1)
}

/// Hand the link to the platform opener; failures only get logged.
fn open_link(url: &str) {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };

    match spawn_opener(opener, url) {
        Ok(_) => tracing::info!(url, "opened social link"),
        Err(e) => tracing::warn!(error = %e, opener, "could not open link"),
    }
}

/// Start `opener` and reap it from a detached task so no zombie is left.
fn spawn_opener(opener: &str, url: &str) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = Command::new(opener)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let opener = opener.to_string();
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                if !status.success() {
                    tracing::warn!(%status, opener = %opener, "link opener exited with failure");
                }
                Some(status)
            }
            Err(e) => {
                tracing::warn!(error = %e, opener = %opener, "failed to wait for link opener");
                None
            }
        }
    }))
}
