//! Dialogue queue types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// One-shot completion callback
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Presentation options for one line of dialogue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DialogueOptions {
    /// Play the narration voice line with this entry
    pub play_audio: bool,
    /// Show the manual "continue" control
    pub show_advance_button: bool,
    /// Advance automatically after narration ends (or right away when silent)
    pub auto_advance: bool,
    /// Delay before an automatic advance
    #[serde(with = "duration_millis")]
    pub auto_advance_delay: Duration,
}

impl Default for DialogueOptions {
    fn default() -> Self {
        Self {
            play_audio: true,
            show_advance_button: true,
            auto_advance: false,
            auto_advance_delay: Duration::ZERO,
        }
    }
}

impl DialogueOptions {
    pub fn silent(mut self) -> Self {
        self.play_audio = false;
        self
    }

    pub fn without_button(mut self) -> Self {
        self.show_advance_button = false;
        self
    }

    pub fn auto_advance(mut self, delay: Duration) -> Self {
        self.auto_advance = true;
        self.auto_advance_delay = delay;
        self
    }
}

/// A queued line of narrative text
pub struct DialogueEntry {
    pub text: String,
    pub options: DialogueOptions,
    pub on_complete: Option<Callback>,
}

impl DialogueEntry {
    pub fn new(text: impl Into<String>, options: DialogueOptions) -> Self {
        Self {
            text: text.into(),
            options,
            on_complete: None,
        }
    }

    pub fn on_complete(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for DialogueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueEntry")
            .field("text", &self.text)
            .field("options", &self.options)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// An option button of a choice prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    /// Value handed to the callback; the option index when absent
    #[serde(default)]
    pub value: Option<Value>,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Visual flavour of a toast message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// Serde adapter storing a `Duration` as whole milliseconds
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
