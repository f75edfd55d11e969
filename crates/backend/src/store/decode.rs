//! Best-effort text decoding for message files.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use tracing::trace;

/// Decode raw file bytes into text without ever failing.
///
/// A byte-order mark wins; otherwise valid UTF-8 is taken as-is and anything
/// else goes through encoding detection. Undecodable sequences become U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
  if bytes.is_empty() {
    return String::new();
  }

  if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
    let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    return text.into_owned();
  }

  if let Ok(text) = std::str::from_utf8(bytes) {
    return text.to_owned();
  }

  let mut detector = EncodingDetector::new();
  detector.feed(bytes, true);
  let encoding = detector.guess(None, true);
  let (text, used, had_errors) = encoding.decode(bytes);
  trace!(encoding = used.name(), had_errors, "Decoded non-UTF-8 message");
  text.into_owned()
}
