//! Inbound frame normalization.
//!
//! Binary and text frames both become a plain byte payload; the frame type
//! is not preserved. Control frames never reach the feed.

use std::fmt::Display;

use axum::body::Bytes;
use axum::extract::ws::Message;

/// What the reader does with one item from the socket stream.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A data frame, normalized to bytes.
    Payload(Bytes),
    /// Ping or pong; answered by the transport itself.
    Control,
    /// The peer sent a close frame.
    Closed,
    /// The transport could not decode the frame. Dropped without surfacing.
    Malformed(String),
}

/// Classifies one item read from the socket.
pub fn normalize<E: Display>(item: Result<Message, E>) -> Inbound {
    match item {
        Ok(Message::Binary(payload)) => Inbound::Payload(payload),
        Ok(Message::Text(text)) => Inbound::Payload(Bytes::copy_from_slice(text.as_str().as_bytes())),
        Ok(Message::Ping(_) | Message::Pong(_)) => Inbound::Control,
        Ok(Message::Close(_)) => Inbound::Closed,
        Err(error) => Inbound::Malformed(error.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::extract::ws::{CloseFrame, Utf8Bytes, close_code};

    use super::*;

    fn ok(message: Message) -> Result<Message, String> {
        Ok(message)
    }

    #[test]
    fn binary_frame_is_passed_through() {
        let payload = Bytes::from_static(&[0, 159, 146, 150]);
        assert_eq!(
            normalize(ok(Message::Binary(payload.clone()))),
            Inbound::Payload(payload)
        );
    }

    #[test]
    fn text_frame_becomes_utf8_bytes() {
        let inbound = normalize(ok(Message::Text(Utf8Bytes::from_static("héllo"))));
        assert_eq!(inbound, Inbound::Payload(Bytes::from("héllo".as_bytes())));
    }

    #[test]
    fn control_frames_are_not_data() {
        assert_eq!(normalize(ok(Message::Ping(Bytes::new()))), Inbound::Control);
        assert_eq!(normalize(ok(Message::Pong(Bytes::new()))), Inbound::Control);
    }

    #[test]
    fn close_frame_signals_closed() {
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static("bye"),
        };
        assert_eq!(normalize(ok(Message::Close(Some(frame)))), Inbound::Closed);
        assert_eq!(normalize(ok(Message::Close(None))), Inbound::Closed);
    }

    #[test]
    fn stream_error_is_malformed() {
        let item: Result<Message, String> = Err("truncated frame".to_string());
        assert_eq!(
            normalize(item),
            Inbound::Malformed("truncated frame".to_string())
        );
    }
}
