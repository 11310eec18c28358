use crate::i18n::Language;

/// Inline keyboard attached to a reply. Rendering is up to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    LanguagePicker,
    Consent(Language),
    GuestMenu(Language),
    MemberMenu(Language),
    About {
        language: Language,
        landing_url: Option<String>,
    },
    MiniApp {
        language: Language,
        url: String,
    },
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}
