use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, used for cache busting and for
/// deriving per-request callback names.
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Fresh JSONP callback name. Uniqueness only needs to defeat caches and
/// collisions, so a timestamp suffix is enough.
pub fn fresh_callback() -> String {
    format!("cb_{}", unix_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_is_identifier_shaped() {
        let cb = fresh_callback();
        assert!(cb.starts_with("cb_"));
        assert!(cb[3..].chars().all(|c| c.is_ascii_digit()));
    }
}
