//! Event loop wiring the terminal, the session, and the connection
//!
//! One loop consumes keyboard events, session completions (history and
//! directory fetches), and connection events, applying each to the
//! session controller before redrawing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use palaver_core::{ApiClient, ChatSession, SessionEvent, SocketClient, SocketEvent};
use tokio::sync::mpsc;

use crate::app::App;
use crate::config::{AppConfig, UiConfig};
use crate::input::{InputState, KeyInput};
use crate::terminal::TerminalGuard;
use crate::ui;

pub struct Runtime {
    app: App,
    input: InputState,
    socket: SocketClient,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    socket_rx: mpsc::UnboundedReceiver<SocketEvent>,
    ui_config: UiConfig,
}

impl Runtime {
    pub fn new(
        config: AppConfig,
        username: String,
        cookie: Option<String>,
    ) -> anyhow::Result<Self> {
        let client_config = config.client_config();
        let api = Arc::new(ApiClient::new(&client_config).context("build HTTP client")?);
        if let Some(ref cookie) = cookie {
            api.set_session_cookie(cookie);
        }

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (socket_tx, socket_rx) = mpsc::unbounded_channel();
        let socket = SocketClient::connect(&client_config, &username, socket_tx);
        let session = ChatSession::new(username, api, socket.handle(), session_tx);

        let app = App::new(session);
        app.session.fetch_directory();

        Ok(Self {
            app,
            input: InputState::new(),
            socket,
            session_rx,
            socket_rx,
            ui_config: config.ui,
        })
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut terminal = TerminalGuard::new().context("initialize terminal")?;
        let mut events = EventStream::new();

        loop {
            terminal.draw(|frame| ui::render(frame, &self.app, &self.input, &self.ui_config))?;

            tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL)
                        {
                            self.app.quit();
                        } else if let Some(key) = KeyInput::from_key_code(key.code) {
                            self.input.handle_key(key, &mut self.app);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                Some(event) = self.session_rx.recv() => {
                    self.app.session.handle_event(event);
                }
                Some(event) = self.socket_rx.recv() => {
                    self.app.session.handle_event(SessionEvent::Socket(event));
                }
                // Periodic redraw so connection state changes show up even
                // between events.
                () = tokio::time::sleep(Duration::from_millis(200)) => {}
            }

            if self.app.should_quit {
                break;
            }
        }

        self.socket.disconnect();
        Ok(())
    }
}
