pub mod proxy;
pub mod session;
pub mod terminal;
pub mod view;

use crate::config::persona::{ Persona, QuickReply };
use crate::models::chat::{ Message, Role };
use proxy::ChatTransport;
use session::{ ChatSession, HistoryStore };
use view::ChatView;

use std::sync::Arc;
use log::{ debug, warn };

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Owns the conversation and drives one proxy call per user turn.
pub struct ChatController<V: ChatView> {
    session: ChatSession,
    store: Box<dyn HistoryStore>,
    transport: Arc<dyn ChatTransport>,
    view: V,
    persona: Persona,
    history_limit: usize,
    is_open: bool,
    unread: bool,
}

impl<V: ChatView> ChatController<V> {
    pub fn new(
        store: Box<dyn HistoryStore>,
        transport: Arc<dyn ChatTransport>,
        view: V,
        persona: Persona,
        history_limit: usize,
    ) -> Self {
        let history = store.load().unwrap_or_else(|e| {
            warn!("Could not read chat history, starting fresh: {}", e);
            Vec::new()
        });

        Self {
            session: ChatSession::new(history),
            store,
            transport,
            view,
            persona,
            history_limit,
            is_open: false,
            unread: false,
        }
    }

    /// Starts with the panel already visible, before anything is rendered.
    pub fn opened(mut self) -> Self {
        self.is_open = true;
        self.view.set_open(true);
        self
    }

    /// Renders the stored history and greets first-time visitors.
    pub fn init(&mut self) {
        self.view.render_history(self.session.messages());
        if self.session.is_empty() {
            let greeting = self.persona.greeting.clone();
            self.append(Message::assistant(greeting));
        }
    }

    /// Returns `false` without touching anything when `text` is blank.
    pub async fn submit(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.handle_user_message(text.to_string()).await;
        true
    }

    pub async fn submit_quick_reply(&mut self, index: usize) -> bool {
        let message = match self.persona.quick_replies.get(index) {
            Some(reply) => reply.message.clone(),
            None => return false,
        };
        self.handle_user_message(message).await;
        true
    }

    async fn handle_user_message(&mut self, text: String) {
        let context = self.session.recent(self.history_limit).to_vec();
        self.append(Message::user(text.clone()));

        self.view.show_composing();
        debug!("Sending turn with {} messages of context", context.len());
        let reply = self.transport.send_message(&context, &text).await;
        self.view.hide_composing();

        self.append(Message::assistant(reply));
    }

    fn append(&mut self, message: Message) {
        let role = message.role;
        self.session.push(message);

        if let Err(e) = self.store.save(self.session.messages()) {
            warn!("Could not persist chat history: {}", e);
        }
        if let Some(last) = self.session.messages().last() {
            self.view.render_message(last);
        }
        if role == Role::Assistant && !self.is_open {
            self.unread = true;
            self.view.set_unread(true);
        }
    }

    pub fn open(&mut self) {
        if self.is_open {
            return;
        }
        self.is_open = true;
        self.view.set_open(true);
        self.view.render_history(self.session.messages());
        if self.unread {
            self.unread = false;
            self.view.set_unread(false);
        }
    }

    pub fn close(&mut self) {
        self.is_open = false;
        self.view.set_open(false);
    }

    pub fn toggle(&mut self) {
        if self.is_open { self.close() } else { self.open() }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn quick_replies(&self) -> &[QuickReply] {
        &self.persona.quick_replies
    }

    pub fn view(&self) -> &V {
        &self.view
    }
}
