//! Chat panel state: the transcript, the input buffer and the single
//! in-flight answer request.

use anyhow::Result;
use futures_util::FutureExt;
use tokio::task::{JoinError, JoinHandle};

use crate::client::AskClient;

pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having a little trouble connecting. Please try again.";

pub const INPUT_PLACEHOLDER: &str = "Ask anything about NAATU Chicken Pickle...";

const GREETING: &str =
    "Hi there! I'm the Naatu Ruchulu expert. I know everything about our authentic chicken pickle.";
const PROMPT_INTRO: &str = "Ask me anything, or try one of these questions:";
const EXAMPLE_PROMPTS: [&str; 3] = [
    "What are the ingredients?",
    "How spicy is it?",
    "What's the shelf life?",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    User(String),
    Assistant(String),
    /// Suggested questions shown as shortcuts until the first user message.
    ExamplePrompts(Vec<String>),
}

/// Where a submission came from. Only typed submissions clear the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitSource {
    Typed,
    Shortcut,
}

pub struct ChatPanel {
    client: AskClient,
    transcript: Vec<ChatMessage>,
    input: String,
    cursor: usize, // char index into input
    loading: bool,
    task: Option<JoinHandle<Result<String>>>,

    // View state
    pub scroll: u16,
    pub follow_tail: bool,
    pub max_scroll: u16, // updated during render
    pub animation_frame: u8,
    pub selected_example: Option<usize>,
    pub reveal_selected: bool, // consumed by the next render
}

impl ChatPanel {
    pub fn new(client: AskClient) -> Self {
        let transcript = vec![
            ChatMessage::Assistant(GREETING.to_string()),
            ChatMessage::Assistant(PROMPT_INTRO.to_string()),
            ChatMessage::ExamplePrompts(EXAMPLE_PROMPTS.iter().map(|p| p.to_string()).collect()),
        ];

        Self {
            client,
            transcript,
            input: String::new(),
            cursor: 0,
            loading: false,
            task: None,
            scroll: 0,
            follow_tail: true,
            max_scroll: 0,
            animation_frame: 0,
            selected_example: None,
            reveal_selected: false,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Prompts of the example group still in the transcript, if any.
    pub fn example_prompts(&self) -> Option<&[String]> {
        self.transcript.iter().find_map(|msg| match msg {
            ChatMessage::ExamplePrompts(prompts) => Some(prompts.as_slice()),
            _ => None,
        })
    }

    /// Send `text` as a question. Returns false when the submission was
    /// rejected (blank text or a request already pending).
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: &str, source: SubmitSource) -> bool {
        if self.loading || text.trim().is_empty() {
            return false;
        }

        self.transcript
            .retain(|msg| !matches!(msg, ChatMessage::ExamplePrompts(_)));
        self.selected_example = None;
        self.transcript.push(ChatMessage::User(text.to_string()));

        if source == SubmitSource::Typed {
            self.input.clear();
            self.cursor = 0;
        }

        self.loading = true;
        self.animation_frame = 0;
        self.pin_to_bottom();

        tracing::info!(?source, chars = text.chars().count(), "question submitted");

        let client = self.client.clone();
        let question = text.to_string();
        self.task = Some(tokio::spawn(async move { client.ask(&question).await }));
        true
    }

    /// Enter in the input field.
    pub fn submit_input(&mut self) -> bool {
        if self.loading {
            return false;
        }
        let text = self.input.clone();
        self.submit(&text, SubmitSource::Typed)
    }

    /// Activate the example shortcut at `index`.
    pub fn click_shortcut(&mut self, index: usize) -> bool {
        let Some(prompt) = self
            .example_prompts()
            .and_then(|prompts| prompts.get(index))
            .cloned()
        else {
            return false;
        };
        self.submit(&prompt, SubmitSource::Shortcut)
    }

    /// Record the reply if the in-flight request has finished. Never blocks.
    pub fn poll_reply(&mut self) -> bool {
        let finished = self.task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return false;
        }
        let Some(mut task) = self.task.take() else {
            return false;
        };
        match (&mut task).now_or_never() {
            Some(outcome) => {
                self.record_reply(outcome);
                true
            }
            None => {
                // Not actually ready yet; keep waiting
                self.task = Some(task);
                false
            }
        }
    }

    /// Wait for the in-flight request, if any, and record its reply.
    pub async fn wait_reply(&mut self) {
        if let Some(task) = self.task.take() {
            let outcome = task.await;
            self.record_reply(outcome);
        }
    }

    fn record_reply(&mut self, outcome: std::result::Result<Result<String>, JoinError>) {
        let reply = match outcome {
            Ok(Ok(answer)) => {
                tracing::info!(chars = answer.chars().count(), "answer received");
                answer
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "answer request failed");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "answer task did not complete");
                FALLBACK_REPLY.to_string()
            }
        };

        self.transcript.push(ChatMessage::Assistant(reply));
        self.loading = false;
        self.pin_to_bottom();
    }

    // Input editing, ignored while a request is pending

    pub fn insert_char(&mut self, c: char) {
        if self.loading {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.loading || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.loading {
            return;
        }
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Cycle the highlighted example shortcut (Tab).
    pub fn select_next_example(&mut self) {
        let count = self.example_prompts().map_or(0, |p| p.len());
        self.selected_example = match (count, self.selected_example) {
            (0, _) => None,
            (_, None) => Some(0),
            (n, Some(i)) if i + 1 >= n => None,
            (_, Some(i)) => Some(i + 1),
        };
        self.reveal_selected = self.selected_example.is_some();
    }

    // Scrolling

    pub fn pin_to_bottom(&mut self) {
        self.follow_tail = true;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
        if self.scroll >= self.max_scroll {
            self.follow_tail = true;
        }
    }

    /// Advance the typing indicator (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

impl Drop for ChatPanel {
    fn drop(&mut self) {
        // A reply that lands after teardown has nowhere to go
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
