use crate::attachment::{encode_file, Attachment};
use crate::config::Config;
use crate::controller::{AttachmentGeneration, ConversationController, ExchangeId, PendingExchange};
use crate::conversation::GroundingSource;
use crate::disclaimer::DisclaimerStore;
use crate::gemini::{GeminiService, GeminiSettings};
use crate::strings::{INPUT_PLACEHOLDER, SUGGESTIONS};
use crate::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::Style;
use std::path::PathBuf;
use std::sync::Arc;
use throbber_widgets_tui::ThrobberState;
use tokio::sync::mpsc;
use tui_textarea::{Input, TextArea};

/// Everything that can change app state. Stream events travel through the
/// same channel as key presses, so they are applied one at a time in the
/// order they were sent.
#[derive(Debug, PartialEq, Clone)]
pub enum Action {
    Render,
    Resize(u16, u16),
    Quit,
    Error(String),
    UserInput(KeyEvent),
    Scroll(i16),
    SendMessage,
    SendSuggestion(usize),
    StreamDelta(ExchangeId, String),
    StreamSettled(ExchangeId, Vec<GroundingSource>),
    StreamFailed(ExchangeId, String),
    ClearConversation,
    EnterAttachPrompt,
    AttachFile(PathBuf),
    AttachmentLoaded(AttachmentGeneration, Attachment),
    RemoveAttachment,
    AcceptDisclaimer,
    SwitchMode(Mode),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Mode {
    Insert,
    Normal,
    AttachPath,
}

pub struct App<'a> {
    pub gemini: Arc<GeminiService>,
    pub action_tx: mpsc::UnboundedSender<Action>,
    pub controller: ConversationController,
    pub input: TextArea<'a>,
    pub attach_input: TextArea<'a>,
    pub vertical_scroll: u16,
    pub auto_scroll: bool,
    pub mode: Mode,
    /// Last transient failure, cleared by the next accepted send.
    pub error: Option<String>,
    /// Set at startup when no API key can be resolved.
    pub config_error: Option<String>,
    pub show_help: bool,
    pub show_disclaimer: bool,
    pub spinner_state: ThrobberState,
    pub theme: Theme,
    disclaimer: DisclaimerStore,
}

fn new_input<'a>() -> TextArea<'a> {
    let mut textarea = TextArea::default();
    // Disable default cursor line style (underline)
    textarea.set_cursor_line_style(Style::default());
    textarea.set_placeholder_text(INPUT_PLACEHOLDER);
    textarea
}

impl<'a> App<'a> {
    pub fn new(action_tx: mpsc::UnboundedSender<Action>, config: Config, disclaimer: DisclaimerStore) -> Self {
        let gemini = GeminiService::new(GeminiSettings::from(&config));

        let config_error = match gemini.resolve_api_key() {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "starting without a usable API key");
                Some(e.to_string())
            }
        };

        Self {
            gemini: Arc::new(gemini),
            action_tx,
            controller: ConversationController::new(),
            input: new_input(),
            attach_input: TextArea::default(),
            vertical_scroll: 0,
            auto_scroll: true,
            mode: Mode::Insert,
            error: None,
            config_error,
            show_help: false,
            show_disclaimer: !disclaimer.is_accepted(),
            spinner_state: ThrobberState::default(),
            theme: Theme::from(config.theme),
            disclaimer,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    fn reset_input(&mut self) {
        self.input = new_input();
    }

    /// Starts an exchange for `text` if the controller accepts it.
    fn start_exchange(&mut self, text: &str) -> bool {
        let Some(pending) = self.controller.begin_send(text) else {
            return false;
        };
        self.error = None;
        self.reset_input();
        self.auto_scroll = true;
        self.spawn_stream(pending);
        true
    }

    fn spawn_stream(&self, pending: PendingExchange) {
        let gemini = Arc::clone(&self.gemini);
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let PendingExchange {
                exchange,
                text,
                attachment,
                history,
                ..
            } = pending;

            let delta_tx = tx.clone();
            let result = gemini
                .send_turn(&text, &history, attachment.as_ref(), move |delta| {
                    let _ = delta_tx.send(Action::StreamDelta(exchange, delta.to_string()));
                })
                .await;

            match result {
                Ok(reply) => {
                    let _ = tx.send(Action::StreamSettled(exchange, reply.sources));
                }
                Err(e) => {
                    tracing::warn!(error = %e, ?exchange, "exchange failed");
                    let _ = tx.send(Action::StreamFailed(exchange, e.to_string()));
                }
            }
        });
    }

    fn spawn_attachment_load(&self, path: PathBuf) {
        let tx = self.action_tx.clone();
        let generation = self.controller.attachment_generation();
        tokio::spawn(async move {
            match encode_file(&path).await {
                Ok(attachment) => {
                    let _ = tx.send(Action::AttachmentLoaded(generation, attachment));
                }
                Err(e) => {
                    let _ = tx.send(Action::Error(e.to_string()));
                }
            }
        });
    }

    fn scroll_to_bottom(&mut self) {
        self.auto_scroll = true;
    }

    pub async fn update(&mut self, action: Action) -> bool {
        match action {
            Action::Error(e) => {
                self.error = Some(e);
                true
            }
            Action::SwitchMode(mode) => {
                self.mode = mode;
                true
            }
            Action::Scroll(delta) => {
                if delta > 0 {
                    self.vertical_scroll = self.vertical_scroll.saturating_add(delta as u16);
                } else {
                    self.vertical_scroll = self.vertical_scroll.saturating_sub(delta.unsigned_abs());
                }
                self.auto_scroll = false;
                true
            }
            Action::SendMessage => {
                let text = self.input.lines().join("\n");
                self.start_exchange(&text)
            }
            Action::SendSuggestion(idx) => match SUGGESTIONS.get(idx) {
                Some(suggestion) => self.start_exchange(suggestion.prompt),
                None => false,
            },
            Action::StreamDelta(exchange, delta) => {
                let applied = self.controller.apply_delta(exchange, &delta);
                if applied && self.auto_scroll {
                    self.scroll_to_bottom();
                }
                applied
            }
            Action::StreamSettled(exchange, sources) => self.controller.settle(exchange, sources),
            Action::StreamFailed(exchange, detail) => {
                if self.controller.fail(exchange) {
                    self.error = Some(detail);
                    true
                } else {
                    false
                }
            }
            Action::ClearConversation => {
                self.controller.clear();
                self.reset_input();
                self.vertical_scroll = 0;
                self.auto_scroll = true;
                self.error = None;
                true
            }
            Action::EnterAttachPrompt => {
                self.mode = Mode::AttachPath;
                self.attach_input = TextArea::default();
                self.attach_input.set_cursor_line_style(Style::default());
                self.attach_input.set_placeholder_text("/path/to/contract.jpg");
                true
            }
            Action::AttachFile(path) => {
                self.mode = Mode::Insert;
                self.spawn_attachment_load(path);
                true
            }
            Action::AttachmentLoaded(generation, attachment) => {
                self.controller.accept_loaded_attachment(generation, attachment)
            }
            Action::RemoveAttachment => {
                self.controller.remove_attachment();
                true
            }
            Action::AcceptDisclaimer => {
                if let Err(e) = self.disclaimer.accept() {
                    tracing::warn!(error = %e, "could not persist disclaimer acceptance");
                    self.error = Some(format!("Failed to save disclaimer state: {}", e));
                }
                self.show_disclaimer = false;
                true
            }
            Action::UserInput(key) => {
                self.handle_key(key);
                true
            }
            Action::Render | Action::Resize(_, _) | Action::Quit => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if key.code == KeyCode::Char('c') && ctrl {
            let _ = self.action_tx.send(Action::Quit);
            return;
        }

        if self.show_disclaimer {
            match key.code {
                KeyCode::Enter => {
                    let _ = self.action_tx.send(Action::AcceptDisclaimer);
                }
                KeyCode::Char('q') => {
                    let _ = self.action_tx.send(Action::Quit);
                }
                _ => {}
            }
            return;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::F(1)) {
                self.show_help = false;
            }
            return;
        }

        // New chat
        if key.code == KeyCode::Char('n') && ctrl {
            let _ = self.action_tx.send(Action::ClearConversation);
            return;
        }
        if key.code == KeyCode::Char('a') && ctrl {
            let _ = self.action_tx.send(Action::EnterAttachPrompt);
            return;
        }
        if key.code == KeyCode::Char('x') && ctrl {
            let _ = self.action_tx.send(Action::RemoveAttachment);
            return;
        }
        if let KeyCode::F(n @ 2..=4) = key.code {
            if self.controller.messages().is_empty() {
                let _ = self.action_tx.send(Action::SendSuggestion(usize::from(n - 2)));
            }
            return;
        }

        match self.mode {
            Mode::Insert => match key.code {
                KeyCode::Esc => {
                    let _ = self.action_tx.send(Action::SwitchMode(Mode::Normal));
                }
                KeyCode::F(1) => self.show_help = true,
                KeyCode::PageUp => {
                    self.vertical_scroll = self.vertical_scroll.saturating_sub(5);
                    self.auto_scroll = false;
                }
                KeyCode::PageDown => {
                    self.vertical_scroll = self.vertical_scroll.saturating_add(5);
                    self.auto_scroll = false;
                }
                KeyCode::Enter if !key.modifiers.contains(KeyModifiers::SHIFT) => {
                    let _ = self.action_tx.send(Action::SendMessage);
                }
                _ => {
                    self.input.input(Input::from(key));
                }
            },
            Mode::Normal => match key.code {
                KeyCode::Char('i') | KeyCode::Enter => {
                    let _ = self.action_tx.send(Action::SwitchMode(Mode::Insert));
                }
                KeyCode::Char('q') => {
                    let _ = self.action_tx.send(Action::Quit);
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    self.vertical_scroll = self.vertical_scroll.saturating_add(1);
                    self.auto_scroll = false;
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.vertical_scroll = self.vertical_scroll.saturating_sub(1);
                    self.auto_scroll = false;
                }
                KeyCode::PageUp => {
                    self.vertical_scroll = self.vertical_scroll.saturating_sub(10);
                    self.auto_scroll = false;
                }
                KeyCode::PageDown => {
                    self.vertical_scroll = self.vertical_scroll.saturating_add(10);
                    self.auto_scroll = false;
                }
                KeyCode::Char('G') | KeyCode::End => self.scroll_to_bottom(),
                KeyCode::F(1) => self.show_help = true,
                _ => {}
            },
            Mode::AttachPath => match key.code {
                KeyCode::Esc => {
                    let _ = self.action_tx.send(Action::SwitchMode(Mode::Insert));
                }
                KeyCode::Enter => {
                    let path = self.attach_input.lines().join("").trim().to_string();
                    if path.is_empty() {
                        let _ = self.action_tx.send(Action::SwitchMode(Mode::Insert));
                    } else {
                        let _ = self.action_tx.send(Action::AttachFile(PathBuf::from(path)));
                    }
                }
                _ => {
                    self.attach_input.input(Input::from(key));
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::ERROR_REPLY;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tempfile::tempdir;

    fn test_config() -> Config {
        Config {
            api_base_url: "http://127.0.0.1:9".to_string(),
            api_key: Some("test-key".to_string()),
            ..Config::default()
        }
    }

    fn test_app(tx: mpsc::UnboundedSender<Action>) -> App<'static> {
        let mut app = App::new(tx, test_config(), DisclaimerStore::new("/nonexistent/legalai/state.toml"));
        app.show_disclaimer = false;
        app
    }

    fn key(code: KeyCode) -> Action {
        Action::UserInput(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[tokio::test]
    async fn test_app_initialization() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let app = test_app(tx);

        assert!(app.controller.messages().is_empty());
        assert_eq!(app.mode, Mode::Insert);
        assert!(!app.is_loading());
        assert!(app.config_error.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_at_startup() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = Config {
            api_key: None,
            api_key_env: "LEGALAI_APP_TEST_UNSET".to_string(),
            ..Config::default()
        };
        let app = App::new(tx, config, DisclaimerStore::new("/nonexistent/legalai/state.toml"));
        let msg = app.config_error.expect("config error expected");
        assert!(msg.contains("LEGALAI_APP_TEST_UNSET"));
    }

    #[tokio::test]
    async fn test_user_typing() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        app.update(key(KeyCode::Char('a'))).await;
        assert_eq!(app.input.lines()[0], "a");
    }

    #[tokio::test]
    async fn test_enter_requests_send() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        app.update(key(KeyCode::Enter)).await;
        assert_eq!(rx.try_recv().ok(), Some(Action::SendMessage));
    }

    #[tokio::test]
    async fn test_scroll_logic() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        app.vertical_scroll = 10;
        app.update(key(KeyCode::PageUp)).await;
        assert_eq!(app.vertical_scroll, 5);
        assert!(!app.auto_scroll);

        app.update(key(KeyCode::PageDown)).await;
        assert_eq!(app.vertical_scroll, 10);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        app.update(Action::Error("Connection failed".to_string())).await;
        assert_eq!(app.error, Some("Connection failed".to_string()));
    }

    #[tokio::test]
    async fn test_help_menu_toggle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        app.update(key(KeyCode::F(1))).await;
        assert!(app.show_help);

        app.update(key(KeyCode::Esc)).await;
        assert!(!app.show_help);

        app.update(key(KeyCode::F(1))).await;
        app.update(key(KeyCode::Char('q'))).await;
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_loading_stays_true_during_stream() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        let pending = app.controller.begin_send("Hello").unwrap();
        assert!(app.is_loading(), "Should be loading after user message");

        app.update(Action::StreamDelta(pending.exchange, "H".to_string())).await;
        assert!(app.is_loading(), "Should STILL be loading after first token");

        app.update(Action::StreamSettled(pending.exchange, Vec::new())).await;
        assert!(!app.is_loading(), "Should stop loading after completion");
    }

    #[tokio::test]
    async fn test_stream_failure_shows_fixed_reply() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        let pending = app.controller.begin_send("Hello").unwrap();
        app.update(Action::StreamDelta(pending.exchange, "Part".to_string())).await;
        app.update(Action::StreamFailed(pending.exchange, "boom".to_string())).await;

        let reply = &app.controller.messages()[1];
        assert_eq!(reply.text, ERROR_REPLY);
        assert!(reply.is_error);
        assert_eq!(app.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_any_mode() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);
        app.mode = Mode::AttachPath;

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        app.update(Action::UserInput(ctrl_c)).await;

        match rx.try_recv() {
            Ok(Action::Quit) => {}
            Ok(other) => panic!("Expected Quit, got {:?}", other),
            Err(_) => panic!("Expected Quit, got nothing"),
        }
    }

    #[tokio::test]
    async fn test_disclaimer_gates_input() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dir = tempdir().unwrap();
        let store = DisclaimerStore::new(dir.path().join("state.toml"));
        let mut app = App::new(tx, test_config(), store.clone());
        assert!(app.show_disclaimer);

        app.update(key(KeyCode::Char('a'))).await;
        assert!(app.input.lines()[0].is_empty());

        app.update(key(KeyCode::Enter)).await;
        let action = rx.try_recv().unwrap();
        assert_eq!(action, Action::AcceptDisclaimer);
        app.update(action).await;

        assert!(!app.show_disclaimer);
        assert!(store.is_accepted());
    }

    #[tokio::test]
    async fn test_attach_prompt_flow() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        let ctrl_a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL);
        app.update(Action::UserInput(ctrl_a)).await;
        let action = rx.try_recv().unwrap();
        assert_eq!(action, Action::EnterAttachPrompt);
        app.update(action).await;
        assert_eq!(app.mode, Mode::AttachPath);

        for c in "x.png".chars() {
            app.update(key(KeyCode::Char(c))).await;
        }
        app.update(key(KeyCode::Enter)).await;
        assert_eq!(rx.try_recv().ok(), Some(Action::AttachFile(PathBuf::from("x.png"))));
    }

    #[tokio::test]
    async fn test_attachment_replace_and_remove() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);
        let att = |mime: &str| Attachment {
            mime_type: mime.to_string(),
            data: "QUJD".to_string(),
        };

        let generation = app.controller.attachment_generation();
        app.update(Action::AttachmentLoaded(generation, att("image/png"))).await;
        app.update(Action::AttachmentLoaded(generation, att("image/jpeg"))).await;
        assert_eq!(app.controller.pending_attachment().unwrap().mime_type, "image/jpeg");

        app.update(Action::RemoveAttachment).await;
        assert!(app.controller.pending_attachment().is_none());
    }

    #[tokio::test]
    async fn test_new_chat_drops_attachment_still_loading() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);
        let generation = app.controller.attachment_generation();

        app.update(Action::ClearConversation).await;
        let redraw = app
            .update(Action::AttachmentLoaded(
                generation,
                Attachment {
                    mime_type: "image/png".to_string(),
                    data: "QUJD".to_string(),
                },
            ))
            .await;

        assert!(!redraw);
        assert!(app.controller.pending_attachment().is_none());
    }

    #[tokio::test]
    async fn test_suggestion_keys_only_on_empty_chat() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        app.update(key(KeyCode::F(3))).await;
        assert_eq!(rx.try_recv().ok(), Some(Action::SendSuggestion(1)));

        app.controller.begin_send("band").unwrap();
        app.update(key(KeyCode::F(3))).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app(tx);

        let pending = app.controller.begin_send("Savol").unwrap();
        app.input.insert_str("draft");
        app.update(Action::ClearConversation).await;

        assert!(app.controller.messages().is_empty());
        assert!(app.input.lines()[0].is_empty());
        assert!(!app.is_loading());
        assert!(!app.update(Action::StreamDelta(pending.exchange, "late".to_string())).await);
        assert!(app.controller.messages().is_empty());
    }
}
