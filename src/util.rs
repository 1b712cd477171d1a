// src/util.rs — Small display helpers

/// Clip a string to at most `max_bytes` bytes without splitting a UTF-8
/// character. Used for single-line listings and log context.
pub fn clip(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..end]
}

/// Render a millisecond duration for humans: "340ms" below a second,
/// "2.4s" at or above.
pub fn format_elapsed_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── clip ───────────────────────────────────────────────────

    #[test]
    fn test_clip_fits_unchanged() {
        assert_eq!(clip("pit lane", 20), "pit lane");
        assert_eq!(clip("pit lane", 8), "pit lane");
        assert_eq!(clip("", 5), "");
    }

    #[test]
    fn test_clip_cuts_at_limit() {
        assert_eq!(clip("safety car deployment", 6), "safety");
        assert_eq!(clip("abc", 0), "");
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        // the chequered flag is a 4-byte scalar; a cut inside it must back
        // up to the previous boundary
        let s = "\u{1F3C1}\u{1F3C1}\u{1F3C1}";
        assert_eq!(clip(s, 3), "");
        assert_eq!(clip(s, 4), "\u{1F3C1}");
        assert_eq!(clip(s, 7), "\u{1F3C1}");
        assert_eq!(clip(s, 8), "\u{1F3C1}\u{1F3C1}");
    }

    // ─── format_elapsed_ms ──────────────────────────────────────

    #[test]
    fn test_format_elapsed_sub_second() {
        assert_eq!(format_elapsed_ms(0), "0ms");
        assert_eq!(format_elapsed_ms(999), "999ms");
    }

    #[test]
    fn test_format_elapsed_seconds() {
        assert_eq!(format_elapsed_ms(1000), "1.0s");
        assert_eq!(format_elapsed_ms(2440), "2.4s");
    }
}
