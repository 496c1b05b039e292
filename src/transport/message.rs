use crate::hub::Message;

/// A decoded inbound frame.
///
/// Clients are expected to send `{"message":"<text>"}`, but anything else is
/// still relayed: the raw text becomes the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Structured(Message),
    Raw(String),
}

impl Inbound {
    pub fn decode(data: &[u8]) -> Self {
        match serde_json::from_slice::<Message>(data) {
            Ok(message) => Inbound::Structured(message),
            Err(_) => Inbound::Raw(String::from_utf8_lossy(data).into_owned()),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Inbound::Raw(_))
    }

    pub fn into_message(self) -> Message {
        match self {
            Inbound::Structured(message) => message,
            Inbound::Raw(text) => Message { message: text },
        }
    }
}
