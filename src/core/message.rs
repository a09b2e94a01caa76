use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_system(self) -> bool {
        self == Role::System
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role.is_system()
    }
}

/// Ordered message history for one session.
///
/// A system message can only enter the log through [`ConversationLog::seeded`],
/// which keeps it at index 0 for the lifetime of the log. Everything else is
/// appended at the back, popped from the back on rollback, or dropped from the
/// front by [`ConversationLog::trim_to_window`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a log with the given system instruction. Blank instructions
    /// produce an empty log.
    pub fn seeded(system_text: impl Into<String>) -> Self {
        let system_text = system_text.into();
        if system_text.trim().is_empty() {
            return Self::new();
        }
        Self {
            messages: vec![Message::system(system_text)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Remove the newest message. The seeded system message is never popped.
    pub fn pop(&mut self) -> Option<Message> {
        match self.messages.last() {
            Some(last) if !last.is_system() => self.messages.pop(),
            _ => None,
        }
    }

    pub fn system(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.is_system())
    }

    pub fn has_system(&self) -> bool {
        self.system().is_some()
    }

    /// Messages after the leading system message.
    pub fn conversation(&self) -> &[Message] {
        if self.has_system() {
            &self.messages[1..]
        } else {
            &self.messages
        }
    }

    /// Keep at most `2 * max_turns` non-system messages, dropping the oldest.
    ///
    /// Counts raw messages rather than user/assistant pairs, so the retained
    /// tail may begin with an assistant reply. Returns how many were dropped.
    pub fn trim_to_window(&mut self, max_turns: usize) -> usize {
        let limit = max_turns.saturating_mul(2);
        let offset = usize::from(self.has_system());
        let non_system = self.messages.len() - offset;
        if non_system <= limit {
            return 0;
        }
        let excess = non_system - limit;
        self.messages.drain(offset..offset + excess);
        excess
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
