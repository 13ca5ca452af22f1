/// Scroll cursor over a reflowed line sequence.
///
/// The cursor owns nothing but the offset of the first visible line. Scroll
/// operations clamp instead of failing so the view is always renderable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub scroll: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }

    /// Scroll towards the end, clamping at the last line. An empty line
    /// sequence pins the cursor at 0.
    pub fn scroll_down(&mut self, n: usize, total_lines: usize) {
        let max = total_lines.saturating_sub(1);
        self.scroll = (self.scroll + n).min(max);
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    /// Set the scroll offset verbatim. Jump targets come from indexes built
    /// over the same line sequence, so they are trusted; a stale target past
    /// the end is tolerated and the next scroll operation recovers.
    pub fn jump(&mut self, line: usize) {
        self.scroll = line;
    }

    /// The window of lines visible in a viewport of `height` rows. Short
    /// near end-of-document, empty past the end or for an empty document.
    pub fn visible_window<'a>(&self, lines: &'a [String], height: usize) -> &'a [String] {
        let start = self.scroll.min(lines.len());
        let end = self.scroll.saturating_add(height).min(lines.len());
        &lines[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn test_scroll_down_clamps_at_last_line() {
        let mut cursor = Cursor::new();
        cursor.scroll_down(100, 20);
        assert_eq!(cursor.scroll, 19);
        cursor.scroll_down(1, 20);
        assert_eq!(cursor.scroll, 19);
    }

    #[test]
    fn test_scroll_up_clamps_at_zero() {
        let mut cursor = Cursor::new();
        cursor.scroll_down(7, 20);
        cursor.scroll_up(1000);
        assert_eq!(cursor.scroll, 0);
    }

    #[test]
    fn test_empty_document_stays_at_zero() {
        let mut cursor = Cursor::new();
        cursor.scroll_down(5, 0);
        assert_eq!(cursor.scroll, 0);
        assert!(cursor.visible_window(&[], 10).is_empty());
    }

    #[test]
    fn test_visible_window_is_bounded() {
        let content = lines(10);
        let mut cursor = Cursor::new();
        cursor.scroll_down(7, content.len());
        let window = cursor.visible_window(&content, 5);
        assert_eq!(window, &content[7..10]);
    }

    #[test]
    fn test_jump_does_not_reclamp() {
        let content = lines(10);
        let mut cursor = Cursor::new();
        cursor.jump(50);
        assert_eq!(cursor.scroll, 50);
        // out-of-range cursor still renders (as an empty window)
        assert!(cursor.visible_window(&content, 5).is_empty());
        cursor.scroll_up(1000);
        assert_eq!(cursor.scroll, 0);
    }
}
