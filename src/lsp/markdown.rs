//! Plain text → markdown.

const SPECIAL: &[char] = &[
    '\\', '`', '*', '_', '{', '}', '[', ']', '(', ')', '#', '+', '-', '.', '!',
];

/// Render plain schema text as markdown.
///
/// A single line break between two non-blank lines becomes a paragraph
/// break, then every markdown-significant character is backslash escaped.
pub fn to_markdown(plain: &str) -> String {
    let mut out = String::with_capacity(plain.len() + plain.len() / 4);
    for c in collapse_line_breaks(plain).chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn is_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn collapse_line_breaks(plain: &str) -> String {
    let chars: Vec<char> = plain.chars().collect();
    let mut out = String::with_capacity(plain.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let width = match (c, chars.get(i + 1)) {
            ('\r', Some('\n')) => 2,
            ('\n', _) => 1,
            _ => 0,
        };
        if width == 0 {
            out.push(c);
            i += 1;
            continue;
        }
        let before = i.checked_sub(1).map(|p| chars[p]);
        let after = chars.get(i + width).copied();
        let single = matches!((before, after), (Some(b), Some(a)) if !is_break(b) && !is_break(a));
        if single {
            out.push_str("\n\n");
        } else {
            out.extend(&chars[i..i + width]);
        }
        i += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_special_character() {
        assert_eq!(
            to_markdown(r"\`*_{}[]()#+-.!"),
            r"\\\`\*\_\{\}\[\]\(\)\#\+\-\.\!"
        );
    }

    #[test]
    fn plain_words_are_untouched() {
        assert_eq!(to_markdown("current working directory"), "current working directory");
        assert_eq!(to_markdown(""), "");
    }

    #[test]
    fn single_line_breaks_become_paragraphs() {
        assert_eq!(to_markdown("first\nsecond"), "first\n\nsecond");
        assert_eq!(to_markdown("first\r\nsecond"), "first\n\nsecond");
        assert_eq!(to_markdown("a\nb\nc"), "a\n\nb\n\nc");
    }

    #[test]
    fn existing_paragraphs_are_kept() {
        assert_eq!(to_markdown("first\n\nsecond"), "first\n\nsecond");
        assert_eq!(to_markdown("trailing\n"), "trailing\n");
        assert_eq!(to_markdown("\nleading"), "\nleading");
    }

    #[test]
    fn escaping_runs_after_collapsing() {
        assert_eq!(to_markdown("v1.0\n- item"), "v1\\.0\n\n\\- item");
    }
}
