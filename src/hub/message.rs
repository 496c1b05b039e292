use serde::{Deserialize, Serialize};

/// A relayed chat message.
///
/// This is the wire form in both directions: `{"message":"<text>"}`.
///
/// # Example
///
/// ```rust
/// use relaycast::hub::Message;
///
/// let msg = Message::new("hello");
/// assert_eq!(serde_json::to_string(&msg).unwrap(), r#"{"message":"hello"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
