//! Code fence recognition for line-by-line scanning.
//!
//! Code fences in `CommonMark` use backticks or tildes (three or more). The
//! closing fence must use the same character, be at least as long as the
//! opening fence, and carry no info string.

/// An opening fence line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence<'a> {
    /// Backtick or tilde.
    pub ch: char,
    /// Number of fence characters.
    pub len: usize,
    /// First word of the info string (empty when absent).
    pub lang: &'a str,
}

impl Fence<'_> {
    /// Whether `line` closes this fence.
    pub(crate) fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let count = trimmed.chars().take_while(|&c| c == self.ch).count();
        if count == 0 || count < self.len {
            return false;
        }

        // After fence chars, only whitespace is allowed
        trimmed[count * self.ch.len_utf8()..]
            .chars()
            .all(char::is_whitespace)
    }

    /// Whether an opening fence found inside this one could plausibly be
    /// meant to close it instead.
    pub(crate) fn shadows(&self, inner: &Fence<'_>) -> bool {
        inner.ch == self.ch && inner.len >= self.len
    }
}

/// Detect whether a line opens a code fence.
pub(crate) fn detect(line: &str) -> Option<Fence<'_>> {
    let trimmed = line.trim_start();
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }

    let len = trimmed.chars().take_while(|&c| c == ch).count();
    if len < 3 {
        return None;
    }

    let info = trimmed[len..].trim();
    // Backtick fences may not carry backticks in their info string
    if ch == '`' && info.contains('`') {
        return None;
    }
    let lang = info.split_whitespace().next().unwrap_or_default();

    Some(Fence { ch, len, lang })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_backtick_fence() {
        let fence = detect("```mermaid").unwrap();

        assert_eq!(fence.ch, '`');
        assert_eq!(fence.len, 3);
        assert_eq!(fence.lang, "mermaid");
    }

    #[test]
    fn test_detect_tilde_fence_with_attributes() {
        let fence = detect("~~~~ mermaid theme=dark").unwrap();

        assert_eq!(fence.ch, '~');
        assert_eq!(fence.len, 4);
        assert_eq!(fence.lang, "mermaid");
    }

    #[test]
    fn test_detect_bare_fence() {
        let fence = detect("```").unwrap();

        assert_eq!(fence.lang, "");
    }

    #[test]
    fn test_indented_fence() {
        assert!(detect("   ```rust").is_some());
    }

    #[test]
    fn test_two_backticks_not_fence() {
        assert!(detect("``inline code``").is_none());
        assert!(detect("This is a regular line").is_none());
        assert!(detect("").is_none());
    }

    #[test]
    fn test_backtick_in_info_not_fence() {
        assert!(detect("``` foo`bar").is_none());
    }

    #[test]
    fn test_closing_fence() {
        let fence = detect("```").unwrap();

        assert!(fence.is_closed_by("```"));
        assert!(fence.is_closed_by("  ```  "));
        // Longer closing fence is valid
        assert!(fence.is_closed_by("````"));
    }

    #[test]
    fn test_shorter_fence_not_closing() {
        let fence = detect("````").unwrap();

        assert!(!fence.is_closed_by("```"));
        assert!(fence.is_closed_by("````"));
    }

    #[test]
    fn test_mixed_fence_chars() {
        let fence = detect("```").unwrap();

        assert!(!fence.is_closed_by("~~~"));
    }

    #[test]
    fn test_info_string_does_not_close() {
        let fence = detect("```").unwrap();

        assert!(!fence.is_closed_by("```mermaid"));
        assert!(!fence.is_closed_by("plain text"));
    }

    #[test]
    fn test_shadows() {
        let outer = detect("````").unwrap();

        assert!(outer.shadows(&detect("````mermaid").unwrap()));
        assert!(outer.shadows(&detect("`````mermaid").unwrap()));
        assert!(!outer.shadows(&detect("```mermaid").unwrap()));
        assert!(!outer.shadows(&detect("~~~~mermaid").unwrap()));
    }
}
