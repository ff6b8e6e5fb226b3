use chrono::Local;
use std::io::Write;

use crate::models::chat::{ Message, Role };

/// Rendering seam between the controller and whatever displays the chat.
pub trait ChatView {
    fn render_history(&mut self, messages: &[Message]);
    fn render_message(&mut self, message: &Message);
    fn show_composing(&mut self);
    fn hide_composing(&mut self);
    fn set_unread(&mut self, unread: bool);
    fn set_open(&mut self, open: bool);
}

/// Line-oriented view. Nothing is printed while the panel is closed except
/// the unread badge.
pub struct TerminalView<W: Write> {
    out: W,
    open: bool,
    composing: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, open: false, composing: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_message(&mut self, message: &Message) {
        let who = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        let time = message.timestamp.with_timezone(&Local).format("%H:%M");
        let _ = writeln!(self.out, "[{}] {}: {}", time, who, message.text);
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn render_history(&mut self, messages: &[Message]) {
        if !self.open {
            return;
        }
        for message in messages {
            self.write_message(message);
        }
        let _ = self.out.flush();
    }

    fn render_message(&mut self, message: &Message) {
        if !self.open {
            return;
        }
        self.write_message(message);
        let _ = self.out.flush();
    }

    fn show_composing(&mut self) {
        if !self.open {
            return;
        }
        self.composing = true;
        let _ = write!(self.out, "Assistant is typing...");
        let _ = self.out.flush();
    }

    fn hide_composing(&mut self) {
        if !self.composing {
            return;
        }
        self.composing = false;
        // Carriage return plus erase-line clears the indicator in place.
        let _ = write!(self.out, "\r\x1b[2K");
        let _ = self.out.flush();
    }

    fn set_unread(&mut self, unread: bool) {
        if unread {
            let _ = writeln!(self.out, "(1 new message, type /open to read it)");
            let _ = self.out.flush();
        }
    }

    fn set_open(&mut self, open: bool) {
        self.open = open;
    }
}
