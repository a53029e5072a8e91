use std::fmt::Write as _;
use tutorly_chat::{ChatNotice, MessagePayload, MessageRecord, ThreadId, ThreadPreview, ThreadState};
use tutorly_types::UserId;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Open(ThreadId),
    Older,
    Chat(UserId),
    Send(String),
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "list" | "ls" => Command::List,
            "open" => Command::Open(parse_id(rest, "open <thread-id>")?),
            "older" => Command::Older,
            "chat" => Command::Chat(parse_id(rest, "chat <user-id>")?),
            "send" if !rest.is_empty() => Command::Send(rest.to_string()),
            "send" => return Err("usage: send <text>".to_string()),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(Some(command))
    }
}

fn parse_id(value: &str, usage: &str) -> Result<i64, String> {
    value.parse().map_err(|_| format!("usage: {}", usage))
}

pub const HELP: &str = "\
list               show chats, newest first
open <thread-id>   open a chat and mark it read
older              load older messages of the open chat
chat <user-id>     start or resume a chat with a user
send <text>        send a message to the open chat
quit               leave";

pub fn render_previews(previews: &[ThreadPreview]) -> String {
    if previews.is_empty() {
        return "no chats".to_string();
    }

    let mut out = String::new();
    for preview in previews {
        let unread = if preview.has_unread { "*" } else { " " };
        let locked = if preview.is_locked { " [locked]" } else { "" };
        let _ = writeln!(
            out,
            "{} [{}] {}{}  {}  {}",
            unread, preview.id, preview.name, locked, preview.display_time, preview.last_message
        );
    }
    out.trim_end().to_string()
}

pub fn render_message(message: &MessageRecord) -> String {
    let time = message.created_at.format("%Y-%m-%d %H:%M");
    let sender = if message.sent_by_current_user { "you" } else { message.sender.as_str() };
    match &message.payload {
        MessagePayload::Text(text) => format!("{} {}: {}", time, sender, text),
        MessagePayload::TutorRequest(request) => format!(
            "{} {}: [tutor request] {}{} min at {:.2}/h ({:?})",
            time,
            sender,
            request
                .assignment_title
                .as_deref()
                .map(|title| format!("{}, ", title))
                .unwrap_or_default(),
            request.lesson_duration_minutes,
            request.hourly_rate,
            request.status
        ),
    }
}

pub fn render_thread(thread: &ThreadState) -> String {
    let mut out = format!("== {} (chat {}) ==", thread.title(), thread.id());
    if thread.is_locked() {
        out.push_str(" locked");
    }
    for message in thread.messages() {
        out.push('\n');
        out.push_str(&render_message(message));
    }
    if thread.has_more_history() {
        out.push_str("\n(type 'older' for earlier messages)");
    }
    out
}

pub fn render_notice(notice: &ChatNotice) -> Option<String> {
    match notice {
        ChatNotice::Incoming { .. } => None,
        ChatNotice::ConnectionChanged(state) => Some(format!("-- connection {:?}", state)),
        ChatNotice::ConnectionLost(reason) => Some(format!("-- connection lost: {}", reason)),
    }
}
