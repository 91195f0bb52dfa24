use super::report::Submitter;
use super::UserId;

/// Entry commands understood outside the free-text flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    MyId,
    Finish,
    Unknown(String),
}

impl Command {
    /// Parses `/name` or `/name@botname`, ignoring any arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "cancel" => Command::Cancel,
            "myid" => Command::MyId,
            "finish" => Command::Finish,
            _ => Command::Unknown(name),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputContent {
    Command(Command),
    Text(String),
}

/// One inbound message, already stripped of transport details.
#[derive(Debug, Clone)]
pub struct InputEvent {
    pub chat_id: i64,
    pub from: Submitter,
    pub content: InputContent,
}

impl InputEvent {
    /// Classifies raw message text as a command or free text.
    pub fn from_text(chat_id: i64, from: Submitter, text: &str) -> Self {
        let content = match Command::parse(text) {
            Some(cmd) => InputContent::Command(cmd),
            None => InputContent::Text(text.to_string()),
        };
        Self { chat_id, from, content }
    }

    pub fn user_id(&self) -> UserId {
        self.from.id
    }
}

/// Reply-option keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever the client currently shows.
    Keep,
    /// Hide the keyboard; free text is expected.
    Remove,
    /// Rows of button labels.
    Options(Vec<Vec<String>>),
}

impl Keyboard {
    pub fn rows<const N: usize>(rows: [&[&str]; N]) -> Self {
        Keyboard::Options(
            rows.iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }
}

/// A prompt produced by the controller, not yet addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
    pub markdown: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: Keyboard::Keep, markdown: false }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn markdown(mut self) -> Self {
        self.markdown = true;
        self
    }

    pub fn to(self, chat_id: i64) -> Output {
        Output {
            chat_id,
            text: self.text,
            keyboard: self.keyboard,
            markdown: self.markdown,
        }
    }
}

/// An addressed outgoing message, ready for a `Messenger`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Keyboard,
    pub markdown: bool,
}
