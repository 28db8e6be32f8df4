//! Plain-text to HTML paragraph conversion for email bodies.

/// Turn each non-blank line into a `<p>` block.
///
/// Lines that already are paragraph blocks are kept as they are, so
/// normalizing twice gives the same result as normalizing once. Inline
/// markup inside a line is passed through untouched.
pub fn normalize_body(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if is_paragraph(line) {
                line.to_string()
            } else {
                format!("<p>{line}</p>")
            }
        })
        .collect()
}

fn is_paragraph(line: &str) -> bool {
    (line.starts_with("<p>") || line.starts_with("<p ")) && line.ends_with("</p>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks_become_paragraphs() {
        assert_eq!(normalize_body("Hello\nWorld"), "<p>Hello</p><p>World</p>");
        assert_eq!(
            normalize_body("Hi {{firstName}},\r\n\r\nSee <a href=\"x\">this</a>.\n"),
            "<p>Hi {{firstName}},</p><p>See <a href=\"x\">this</a>.</p>"
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for input in [
            "Hello\nWorld",
            "one line",
            "  padded  \n\n\n  lines  ",
            "<p>already</p>\nmixed",
            "<p class=\"lead\">styled</p>",
            "",
        ] {
            let once = normalize_body(input);
            assert_eq!(normalize_body(&once), once, "{input:?}");
        }
    }

    #[test]
    fn test_blank_body_is_empty() {
        assert_eq!(normalize_body("\n \n"), "");
    }
}
