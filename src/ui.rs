use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::{App, TAGLINE, TITLE};
use crate::chat::{ChatMessage, ChatPanel, INPUT_PLACEHOLDER};

const ACCENT: Color = Color::Rgb(255, 140, 60);
const USER_COLOR: Color = Color::Cyan;
const ASSISTANT_COLOR: Color = Color::Yellow;

/// Wrap text to fit within a given width, returning multiple lines
/// Uses word boundaries for wrapping; words wider than a line are split
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace().flat_map(|w| split_long_word(w, width)) {
        let word_len = word.width();

        if current_len == 0 {
            current_line = word;
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(&word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word;
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Break a word (usually a URL) that is wider than `width` into pieces that fit.
fn split_long_word(word: &str, width: usize) -> Vec<String> {
    if word.width() <= width {
        return vec![word.to_string()];
    }

    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_width = 0;
    for c in word.chars() {
        let w = c.width().unwrap_or(0);
        if piece_width + w > width && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            piece_width = 0;
        }
        piece.push(c);
        piece_width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Slice of the input that fits in `width` columns with the cursor visible,
/// plus the cursor's column inside that slice.
fn visible_input(input: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = input.chars().collect();
    let cursor = cursor.min(chars.len());
    let char_width = |c: &char| c.width().unwrap_or(0);

    // Leave a column for the cursor itself
    let mut start = 0;
    while start < cursor && chars[start..cursor].iter().map(char_width).sum::<usize>() >= width {
        start += 1;
    }

    let mut visible = String::new();
    let mut used = 0;
    for c in &chars[start..] {
        let w = char_width(c);
        if used + w > width {
            break;
        }
        visible.push(*c);
        used += w;
    }

    let cursor_x = chars[start..cursor].iter().map(char_width).sum::<usize>();
    (visible, cursor_x as u16)
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

/// Pre-wrapped transcript, plus where the example shortcuts landed.
struct TranscriptLayout {
    lines: Vec<Line<'static>>,
    /// (line index, prompt index, label width)
    shortcuts: Vec<(usize, usize, u16)>,
}

fn shortcut_label(prompt: &str) -> String {
    format!("[ {} ]", prompt)
}

fn push_message(lines: &mut Vec<Line<'static>>, label: &'static str, color: Color, text: &str, width: usize) {
    lines.push(Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    for paragraph in text.lines() {
        for wrapped in wrap_text_to_width(paragraph, width) {
            lines.push(parse_markdown_line(&wrapped));
        }
    }
    lines.push(Line::default());
}

fn layout_transcript(chat: &ChatPanel, width: usize) -> TranscriptLayout {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut shortcuts = Vec::new();

    for msg in chat.transcript() {
        match msg {
            ChatMessage::User(text) => push_message(&mut lines, "You:", USER_COLOR, text, width),
            ChatMessage::Assistant(text) => {
                push_message(&mut lines, "Naatu AI:", ASSISTANT_COLOR, text, width)
            }
            ChatMessage::ExamplePrompts(prompts) => {
                for (index, prompt) in prompts.iter().enumerate() {
                    let label = shortcut_label(prompt);
                    let style = if chat.selected_example == Some(index) {
                        Style::default().bg(ACCENT).fg(Color::Black).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(ACCENT)
                    };
                    let label_width = label.width().min(width) as u16;
                    shortcuts.push((lines.len(), index, label_width));
                    lines.push(Line::from(Span::styled(label, style)));
                }
                lines.push(Line::default());
            }
        }
    }

    // Typing indicator, never part of the transcript
    if chat.is_loading() {
        lines.push(Line::from(Span::styled(
            "Naatu AI:",
            Style::default().fg(ASSISTANT_COLOR).add_modifier(Modifier::BOLD),
        )));
        let dots = ".".repeat((chat.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    TranscriptLayout { lines, shortcuts }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    frame.render_widget(app.particles.frame_at(app.elapsed()), area);

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [_, column, _] = Layout::horizontal([
        Constraint::Percentage(6),
        Constraint::Percentage(88),
        Constraint::Percentage(6),
    ])
    .areas(body_area);

    let [messages_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(column);

    render_header(app, frame, header_area);
    render_messages(app, frame, messages_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &mut App, frame: &mut Frame, area: Rect) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(ACCENT));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let link_text = " ◎ @naatu__ruchulu ";
    let link_width = (link_text.chars().count() as u16).min(inner.width);
    let [brand_area, link_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(link_width),
    ])
    .areas(inner);

    let brand = vec![
        Line::from(vec![
            Span::styled(" 🌶 ", Style::default().fg(Color::Red)),
            Span::styled(TITLE, Style::default().fg(ACCENT).bold()),
        ]),
        Line::from(Span::styled(
            format!("    {}", TAGLINE),
            Style::default().fg(Color::Gray).italic(),
        )),
    ];
    frame.render_widget(Paragraph::new(brand), brand_area);

    let link_row = Rect { height: link_area.height.min(1), ..link_area };
    let link = Paragraph::new(Span::styled(
        link_text,
        Style::default().fg(Color::Magenta).underlined(),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(link, link_row);

    app.link_area = (!link_row.is_empty()).then_some(link_row);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");
    let inner = block.inner(area);

    app.messages_area = Some(area);

    let layout = layout_transcript(&app.chat, inner.width as usize);
    let total_lines = layout.lines.len() as u16;
    let chat = &mut app.chat;

    chat.max_scroll = total_lines.saturating_sub(inner.height);
    if chat.follow_tail {
        chat.scroll = chat.max_scroll;
    } else {
        chat.scroll = chat.scroll.min(chat.max_scroll);
    }

    // Bring a freshly highlighted shortcut into view
    if std::mem::take(&mut chat.reveal_selected) {
        let selected_line = layout
            .shortcuts
            .iter()
            .find(|s| Some(s.1) == chat.selected_example)
            .map(|s| s.0 as u16);
        if let Some(line) = selected_line {
            if line < chat.scroll {
                chat.scroll = line;
            } else if line >= chat.scroll + inner.height {
                chat.scroll = (line + 1).saturating_sub(inner.height).min(chat.max_scroll);
            }
            chat.follow_tail = chat.scroll >= chat.max_scroll;
        }
    }
    let scroll = chat.scroll;

    app.shortcut_areas = layout
        .shortcuts
        .iter()
        .filter_map(|&(line, index, width)| {
            let line = line as u16;
            if line < scroll || line >= scroll + inner.height {
                return None;
            }
            Some((Rect::new(inner.x, inner.y + line - scroll, width, 1), index))
        })
        .collect();

    let messages = Paragraph::new(layout.lines)
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(messages, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    frame.render_widget(Clear, area);

    let chat = &app.chat;
    let loading = chat.is_loading();

    let (title, border_color) = if loading {
        (" Waiting for a reply... ", Color::DarkGray)
    } else {
        (" Ask ", ACCENT)
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_input(chat.input(), chat.cursor(), inner_width);

    let input = if chat.input().is_empty() {
        Paragraph::new(Span::styled(
            INPUT_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let color = if loading { Color::DarkGray } else { USER_COLOR };
        Paragraph::new(visible_text).style(Style::default().fg(color))
    };

    frame.render_widget(input.block(input_block), area);

    if !loading && inner_width > 0 && area.height > 2 {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
    ];
    if app.chat.example_prompts().is_some() {
        hints.extend([
            Span::styled(" Tab ", key_style),
            Span::styled(" suggestions ", label_style),
        ]);
    }
    hints.extend([
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" ^O ", key_style),
        Span::styled(" instagram ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::SubmitSource;
    use crate::client::tests::{echo_router, spawn_endpoint};
    use crate::client::AskClient;
    use crate::particles::ParticleField;
    use axum::{routing::post, Json, Router};
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    fn test_app() -> App {
        App::with_parts(
            ParticleField::generate(20, &mut rand::thread_rng()),
            ChatPanel::new(AskClient::new("http://127.0.0.1:9/ask")),
        )
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        let mut text = String::new();
        for row in buffer.content.chunks(width) {
            for cell in row {
                text.push_str(cell.symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text_to_width("how spicy is the pickle", 10),
            vec!["how spicy", "is the", "pickle"]
        );
        assert_eq!(wrap_text_to_width("", 10), vec![String::new()]);
    }

    #[test]
    fn splits_words_wider_than_the_line() {
        assert_eq!(
            wrap_text_to_width("see abcdefghij now", 4),
            vec!["see", "abcd", "efgh", "ij", "now"]
        );
        // Wide characters count by display width
        assert_eq!(wrap_text_to_width("辛い辛い辛い", 4), vec!["辛い", "辛い", "辛い"]);
    }

    #[test]
    fn input_window_tracks_display_width() {
        assert_eq!(visible_input("hello", 5, 10), ("hello".to_string(), 5));
        assert_eq!(visible_input("abcdefgh", 8, 4), ("fgh".to_string(), 3));

        let (text, cursor_x) = visible_input("辛い味", 3, 10);
        assert_eq!(text, "辛い味");
        assert_eq!(cursor_x, 6);

        let (text, cursor_x) = visible_input("辛い味です", 5, 6);
        assert!(text.width() <= 6);
        assert!(cursor_x < 6);
        assert!(text.ends_with("です"));
    }

    #[tokio::test]
    async fn long_unbroken_answer_is_fully_visible() {
        let url = format!("https://naaturuchulu.example/{}END", "x".repeat(85 - 32));
        assert_eq!(url.chars().count(), 85);
        let answer = url.clone();
        let router = Router::new().route(
            "/ask",
            post(move || {
                let answer = answer.clone();
                async move { Json(json!({ "answer": answer })) }
            }),
        );
        let endpoint = spawn_endpoint(router).await;
        let mut app = App::with_parts(
            ParticleField::generate(20, &mut rand::thread_rng()),
            ChatPanel::new(AskClient::new(&endpoint)),
        );

        assert!(app.chat.submit("Where can I order?", SubmitSource::Typed));
        app.chat.wait_reply().await;
        assert_eq!(
            app.chat.transcript().last(),
            Some(&ChatMessage::Assistant(url.clone()))
        );

        let mut terminal = Terminal::new(TestBackend::new(60, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("END"));
        let inner_width = app.messages_area.unwrap().width as usize - 2;
        assert!(inner_width < 85);
        assert_eq!(wrap_text_to_width(&url, inner_width).concat(), url);
    }

    #[test]
    fn markdown_bold_becomes_styled_span() {
        let line = parse_markdown_line("made with **Guntur** chillies");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Guntur");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let unclosed = parse_markdown_line("**oops");
        assert_eq!(unclosed.spans[0].content, "**oops");
    }

    #[test]
    fn shortcuts_are_laid_out_once_each() {
        let app = test_app();
        let layout = layout_transcript(&app.chat, 60);
        let indexes: Vec<usize> = layout.shortcuts.iter().map(|s| s.1).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn typing_indicator_only_while_pending() {
        let mut app = test_app();
        let idle = layout_transcript(&app.chat, 60).lines.len();

        assert!(app.chat.submit("Q", SubmitSource::Typed));
        let pending = layout_transcript(&app.chat, 60);
        let rendered: Vec<String> = pending.lines.iter().map(|l| l.to_string()).collect();
        assert!(rendered.iter().any(|l| l.starts_with("Thinking")));
        // Examples gone, user message and indicator added
        assert!(pending.shortcuts.is_empty());
        assert_ne!(pending.lines.len(), idle);
        assert_eq!(app.chat.transcript().len(), 3);
    }

    #[test]
    fn renders_shell_and_records_hit_areas() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains(TITLE));
        assert!(text.contains(TAGLINE));
        assert!(text.contains("[ How spicy is it? ]"));
        assert!(text.contains(INPUT_PLACEHOLDER));

        assert_eq!(app.shortcut_areas.len(), 3);
        assert!(app.link_area.is_some());
        let (area, index) = app.shortcut_areas[0];
        assert_eq!(index, 0);
        assert_eq!(app.shortcut_at(area.x, area.y), Some(0));
    }

    #[test]
    fn long_transcript_follows_tail() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(60, 14)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert!(app.chat.follow_tail);
        assert_eq!(app.chat.scroll, app.chat.max_scroll);

        app.chat.scroll_up(100);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert_eq!(app.chat.scroll, 0);
        assert!(!app.chat.follow_tail);
    }

    #[tokio::test]
    async fn new_messages_repin_after_scrolling_up() {
        let endpoint = spawn_endpoint(echo_router()).await;
        let mut app = App::with_parts(
            ParticleField::generate(20, &mut rand::thread_rng()),
            ChatPanel::new(AskClient::new(&endpoint)),
        );
        let mut terminal = Terminal::new(TestBackend::new(60, 14)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(app.chat.max_scroll > 0);

        app.chat.scroll_up(100);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(!app.chat.follow_tail);

        assert!(app.chat.submit("Q", SubmitSource::Typed));
        assert!(app.chat.follow_tail);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert_eq!(app.chat.scroll, app.chat.max_scroll);

        app.chat.scroll_up(100);
        app.chat.wait_reply().await;
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert!(app.chat.follow_tail);
        assert!(app.chat.max_scroll > 0);
        assert_eq!(app.chat.scroll, app.chat.max_scroll);
        assert!(screen_text(&terminal).contains("echo: Q"));
    }

    #[test]
    fn highlighted_shortcut_scrolls_into_view() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(60, 14)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        app.chat.scroll_up(100);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert_eq!(app.chat.scroll, 0);
        assert!(!app.shortcut_areas.iter().any(|&(_, i)| i == 0));

        app.chat.select_next_example();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(app.shortcut_areas.iter().any(|&(_, i)| i == 0));

        // Manual scrolling afterwards is not overridden
        app.chat.scroll_up(100);
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert_eq!(app.chat.scroll, 0);
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(4, 3)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
    }
}
