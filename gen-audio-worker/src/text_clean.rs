//! Text cleanup before segmentation, ported verbatim in spirit from the
//! teacher's `text::cleaner::clean_text`: replace problematic Unicode
//! punctuation, drop control characters, normalize whitespace, collapse
//! runs of periods.

const PROBLEMATIC_CHARS: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201c}', "\""),
    ('\u{201d}', "\""),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2026}', "..."),
    ('\u{00a0}', " "),
    ('\u{200b}', ""),
    ('\u{200c}', ""),
    ('\u{200d}', ""),
    ('\u{feff}', ""),
];

pub fn clean_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some((_, replacement)) = PROBLEMATIC_CHARS.iter().find(|(ch, _)| *ch == c) {
            result.push_str(replacement);
        } else if c == '\n' || c == '\t' || !c.is_control() {
            result.push(c);
        }
    }
    let result = normalize_whitespace(&result);
    fix_multiple_periods(&result)
}

fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_space = false;
    let mut newline_count = 0;

    for c in text.chars() {
        if c == '\n' {
            newline_count += 1;
            prev_was_space = false;
            if newline_count <= 2 {
                result.push('\n');
            }
        } else if c == ' ' || c == '\t' {
            newline_count = 0;
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            newline_count = 0;
            prev_was_space = false;
            result.push(c);
        }
    }
    result.trim().to_string()
}

fn fix_multiple_periods(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut period_run = 0;
    for c in text.chars() {
        if c == '.' {
            period_run += 1;
            if period_run == 1 {
                result.push('.');
            }
        } else {
            period_run = 0;
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_smart_quotes_and_dashes() {
        let text = "\u{201c}Hello\u{201d} \u{2014} world";
        assert_eq!(clean_text(text), "\"Hello\" - world");
    }

    #[test]
    fn collapses_multiple_periods() {
        assert_eq!(clean_text("Wait.. what...?"), "Wait. what.?");
    }

    #[test]
    fn normalizes_whitespace_and_blank_lines() {
        assert_eq!(clean_text("A   B\n\n\n\nC"), "A B\n\nC");
    }
}
