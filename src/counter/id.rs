//! Counter id minting.
//!
//! An id is the hex encoding of `"<name>:<unix-millis>"`. It is opaque to
//! callers but can be decoded back for diagnostics.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

const SEPARATOR: char = ':';

/// Mints ids with strictly increasing timestamps.
///
/// Two counters created within the same millisecond would otherwise get the
/// same id when they share a name.
#[derive(Debug, Default)]
pub struct IdMinter {
  last_millis: AtomicI64,
}

impl IdMinter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mint an id for `name` at the current time.
  pub fn mint(&self, name: &str) -> String {
    let millis = self.next_millis(Utc::now().timestamp_millis());
    encode_id(name, millis)
  }

  fn next_millis(&self, now: i64) -> i64 {
    let mut last = self.last_millis.load(Ordering::SeqCst);
    loop {
      let next = now.max(last + 1);
      match self
        .last_millis
        .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
      {
        Ok(_) => return next,
        Err(actual) => last = actual,
      }
    }
  }
}

pub fn encode_id(name: &str, millis: i64) -> String {
  hex::encode(format!("{}{}{}", name, SEPARATOR, millis))
}

/// Recover the name and creation time an id was minted from.
///
/// Returns `None` for ids that were not produced by [`encode_id`].
pub fn decode_id(id: &str) -> Option<(String, i64)> {
  let bytes = hex::decode(id).ok()?;
  let raw = String::from_utf8(bytes).ok()?;
  let (name, millis) = raw.rsplit_once(SEPARATOR)?;
  let millis = millis.parse().ok()?;
  Some((name.to_string(), millis))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_encode_decode() {
    let id = encode_id("Coffee", 1_700_000_000_000);
    assert_eq!(
      decode_id(&id),
      Some(("Coffee".to_string(), 1_700_000_000_000))
    );
  }

  #[test]
  fn test_name_containing_separator() {
    let id = encode_id("a:b", 42);
    assert_eq!(decode_id(&id), Some(("a:b".to_string(), 42)));
  }

  #[test]
  fn test_decode_rejects_foreign_ids() {
    assert_eq!(decode_id("not hex"), None);
    assert_eq!(decode_id(&hex::encode("no separator")), None);
    assert_eq!(decode_id(&hex::encode("name:notanumber")), None);
    assert_eq!(decode_id("ff"), None);
  }

  #[test]
  fn test_same_millisecond_gets_distinct_ids() {
    let minter = IdMinter::new();
    assert_eq!(minter.next_millis(100), 100);
    assert_eq!(minter.next_millis(100), 101);
    assert_eq!(minter.next_millis(50), 102);
    assert_eq!(minter.next_millis(200), 200);
  }

  #[test]
  fn test_mint_is_unique_for_same_name() {
    let minter = IdMinter::new();
    let a = minter.mint("Unnamed");
    let b = minter.mint("Unnamed");
    assert_ne!(a, b);
    assert_eq!(decode_id(&a).unwrap().0, "Unnamed");
  }
}
