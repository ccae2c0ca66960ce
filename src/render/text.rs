//! Greedy word wrapping with real font metrics.

use super::canvas::{FontFace, LumaCanvas, Weight};

/// Wrap `text` into lines no wider than `max_width`
///
/// Words are packed greedily; a new line starts on the first word that
/// would overflow. A single word wider than `max_width` gets a line of its
/// own and is never split. Whitespace-only input yields no lines.
pub fn wrap_text<F>(text: &str, max_width: u32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> u32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrapped lines plus the face and weight they were measured with
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub face: FontFace,
    pub weight: Weight,
}

impl TextBlock {
    /// Wrap `text` to `max_width`, keeping at most `max_lines` lines
    ///
    /// Lines past the cap are dropped without an ellipsis.
    pub fn wrap(text: &str, face: FontFace, weight: Weight, max_width: u32, max_lines: usize) -> Self {
        let mut lines = wrap_text(text, max_width, |s| face.measure(s, weight));
        if lines.len() > max_lines {
            tracing::debug!("Truncating {} wrapped lines to {}", lines.len(), max_lines);
            lines.truncate(max_lines);
        }
        Self { lines, face, weight }
    }

    /// Vertical space taken by the block
    pub fn height(&self, line_spacing: u32) -> u32 {
        self.lines.len() as u32 * (self.face.height() + line_spacing)
    }

    /// Draw the block starting at `top`; returns the y position after the last line
    pub fn draw(&self, canvas: &mut LumaCanvas, left: i32, top: i32, line_spacing: u32) -> i32 {
        let style = self.face.style(self.weight);
        let advance = (self.face.height() + line_spacing) as i32;
        let mut y = top;
        for line in &self.lines {
            canvas.draw_text(line, style, left, y);
            y += advance;
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 px per character, like a monospace face
    fn fixed(s: &str) -> u32 {
        s.chars().count() as u32 * 10
    }

    #[test]
    fn test_wrap_packs_greedily() {
        let lines = wrap_text("aa bb cc dd", 50, fixed);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn test_wrap_keeps_long_word_whole() {
        let lines = wrap_text("a extraordinarily b", 50, fixed);
        assert_eq!(lines, vec!["a", "extraordinarily", "b"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_text("   ", 100, fixed).is_empty());
        assert!(wrap_text("", 100, fixed).is_empty());
    }

    #[test]
    fn test_wrapped_lines_fit_unless_single_word() {
        let text = "The Pallas's cat is a small wild cat with long and dense light grey fur, \
                    and rounded ears set low on the sides of the head. Supercalifragilistic!";
        for max_width in [1, 30, 55, 80, 120, 400] {
            for line in wrap_text(text, max_width, fixed) {
                assert!(
                    fixed(&line) <= max_width || !line.contains(' '),
                    "line '{}' exceeds {}",
                    line,
                    max_width
                );
            }
        }
    }

    #[test]
    fn test_wrap_with_font_metrics() {
        let face = FontFace::for_size(14);
        let max_width = 100;
        let lines = wrap_text(
            "greedy packing of words onto lines using measured widths",
            max_width,
            |s| face.measure(s, Weight::Regular),
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(face.measure(line, Weight::Regular) <= max_width);
        }
    }

    #[test]
    fn test_block_caps_lines() {
        let face = FontFace::for_size(14);
        let block = TextBlock::wrap("one two three four five six", face, Weight::Regular, 1, 4);
        assert_eq!(block.lines, vec!["one", "two", "three", "four"]);
        assert_eq!(block.height(4), 4 * (face.height() + 4));
    }
}
