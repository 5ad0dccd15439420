use std::borrow::Cow;

/// Literal token marking an absent value in tab-separated feeds.
pub const NULL_SENTINEL: &str = "\\N";

/// Splits on commas that sit outside a pair of double quotes.
///
/// Quotes are left in place; [`unquote_field`] strips them once the caller
/// has checked the field count.
pub fn split_quoted_comma(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (index, character) in line.char_indices() {
        match character {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&line[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);

    fields
}

pub fn unquote_field(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        let inner = &trimmed[1..trimmed.len() - 1];
        if inner.contains("\"\"") {
            return Cow::Owned(inner.replace("\"\"", "\""));
        }
        return Cow::Borrowed(inner);
    }
    Cow::Borrowed(trimmed)
}

/// Splits on every tab, keeping empty trailing fields. Sentinel fields
/// come back as `None`.
pub fn split_tab_literal(line: &str) -> Vec<Option<&str>> {
    line.split('\t')
        .map(|field| (field != NULL_SENTINEL).then_some(field))
        .collect()
}
