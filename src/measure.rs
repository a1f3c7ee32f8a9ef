use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub struct TextMetrics {
    pub max_cell_width: usize,
    pub padding: usize,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            max_cell_width: 32,
            padding: 1,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> usize {
        UnicodeWidthStr::width(text)
    }

    /// Cut `text` to at most `max_cell_width` terminal columns, marking the
    /// cut with an ellipsis.
    pub fn fit(&self, text: &str) -> String {
        if self.text_width(text) <= self.max_cell_width {
            return text.to_string();
        }

        let budget = self.max_cell_width.saturating_sub(1);
        let mut out = String::new();
        let mut used = 0;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > budget {
                break;
            }
            used += w;
            out.push(ch);
        }
        out.push('…');
        out
    }

    /// Pad `text` with spaces to `width` columns.
    pub fn pad(&self, text: &str, width: usize) -> String {
        let fill = width.saturating_sub(self.text_width(text));
        format!("{}{}", text, " ".repeat(fill))
    }

    /// Width of each column: the widest fitted cell, header included.
    pub fn column_widths(&self, header: &[String], rows: &[Vec<String>]) -> Vec<usize> {
        header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rows.iter()
                    .filter_map(|row| row.get(i))
                    .chain(std::iter::once(name))
                    .map(|cell| self.text_width(&self.fit(cell)))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_width() {
        let m = TextMetrics::default();
        assert_eq!(m.text_width("User"), 4);
    }

    #[test]
    fn test_unicode_width() {
        let m = TextMetrics::default();
        // 全角文字は幅2
        assert_eq!(m.text_width("ユーザー"), 8);
    }

    #[test]
    fn test_fit_short_text_unchanged() {
        let m = TextMetrics::default();
        assert_eq!(m.fit("orders"), "orders");
    }

    #[test]
    fn test_fit_truncates_wide_text() {
        let m = TextMetrics {
            max_cell_width: 5,
            padding: 1,
        };
        assert_eq!(m.fit("abcdefgh"), "abcd…");
        // Each kana is 2 columns wide, only two fit before the ellipsis
        assert_eq!(m.fit("ユーザー名"), "ユー…");
    }

    #[test]
    fn test_pad_uses_display_width() {
        let m = TextMetrics::default();
        assert_eq!(m.pad("名前", 6), "名前  ");
        assert_eq!(m.pad("toolong", 3), "toolong");
    }

    #[test]
    fn test_column_widths() {
        let m = TextMetrics::default();
        let header = vec!["id".to_string(), "name".to_string()];
        let rows = vec![vec!["100".to_string(), "ab".to_string()]];
        assert_eq!(m.column_widths(&header, &rows), vec![3, 4]);
    }
}
