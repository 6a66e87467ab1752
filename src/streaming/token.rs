//! Stream tokens: the path segment naming the message that holds a file.
//!
//! A token is URL-safe base64 of `"{chat_id}:{message_id}"`. A bare decimal
//! message id refers to the default chat.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reelgate_common::{ChatId, Error, MessageId, MessageRef, Result};

pub fn encode_token(message: MessageRef) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}:{}", message.chat_id, message.message_id))
}

pub fn decode_token(token: &str, default_chat: ChatId) -> Result<MessageRef> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        let id = token
            .parse()
            .map_err(|_| Error::decode(format!("message id out of range: {token}")))?;
        return Ok(MessageRef::new(default_chat, MessageId(id)));
    }

    let raw = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .map_err(|e| Error::decode(format!("invalid stream token: {e}")))?;
    let text = String::from_utf8(raw).map_err(|_| Error::decode("stream token is not UTF-8"))?;

    let (chat, message) = text
        .split_once(':')
        .ok_or_else(|| Error::decode("stream token has no separator"))?;
    let chat = chat
        .parse()
        .map_err(|_| Error::decode(format!("invalid chat id in token: {chat}")))?;
    let message = message
        .parse()
        .map_err(|_| Error::decode(format!("invalid message id in token: {message}")))?;

    Ok(MessageRef::new(ChatId(chat), MessageId(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const DEFAULT: ChatId = ChatId(-100500);

    #[test]
    fn decodes_chat_and_message() {
        let message = MessageRef::new(ChatId(-1001234), MessageId(77));
        let token = encode_token(message);
        assert!(!token.contains('='));
        assert_eq!(decode_token(&token, DEFAULT).unwrap(), message);
    }

    #[test]
    fn accepts_padded_tokens() {
        let token = format!("{}==", encode_token(MessageRef::new(ChatId(1), MessageId(2))));
        assert_eq!(
            decode_token(&token, DEFAULT).unwrap(),
            MessageRef::new(ChatId(1), MessageId(2))
        );
    }

    #[test]
    fn bare_number_uses_default_chat() {
        assert_eq!(
            decode_token("42", DEFAULT).unwrap(),
            MessageRef::new(DEFAULT, MessageId(42))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(decode_token("!!!", DEFAULT), Err(Error::Decode(_)));
        assert_matches!(decode_token("", DEFAULT), Err(Error::Decode(_)));
        let no_sep = URL_SAFE_NO_PAD.encode("12345");
        assert_matches!(decode_token(&no_sep, DEFAULT), Err(Error::Decode(_)));
        let bad_id = URL_SAFE_NO_PAD.encode("1:x");
        assert_matches!(decode_token(&bad_id, DEFAULT), Err(Error::Decode(_)));
    }
}
