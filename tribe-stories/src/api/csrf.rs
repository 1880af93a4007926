//! CSRF token extraction
//!
//! The backend embeds its token in every page as
//! `<meta name="csrf-token" content="...">`; mutating requests must echo it
//! back in the `X-CSRF-TOKEN` header.

/// Header carrying the token on mutating requests
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

const META_NAME: &str = "csrf-token";

/// Find the `csrf-token` meta tag in an HTML document and return its content
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let mut offset = 0;

    while let Some(found) = lower[offset..].find("<meta") {
        let start = offset + found + "<meta".len();
        let end = lower[start..].find('>').map(|e| start + e)?;
        // Attribute values keep their original case
        let attrs = parse_attributes(&html[start..end]);

        let is_csrf = attrs
            .iter()
            .any(|(k, v)| k == "name" && v.eq_ignore_ascii_case(META_NAME));
        if is_csrf {
            return attrs
                .into_iter()
                .find(|(k, _)| k == "content")
                .map(|(_, v)| v)
                .filter(|v| !v.is_empty());
        }
        offset = end;
    }
    None
}

/// Parse `key="value" key='value' key=value flag` into lowercase-keyed pairs
fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = tag.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace() || *c == '/').is_some() {}
        let Some(&(key_start, _)) = chars.peek() else {
            break;
        };

        let mut key_end = tag.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '/' {
                key_end = i;
                break;
            }
            chars.next();
        }
        let key = tag[key_start..key_end].to_ascii_lowercase();

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if chars.next_if(|(_, c)| *c == '=').is_none() {
            if !key.is_empty() {
                attrs.push((key, String::new()));
            }
            continue;
        }
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let value = match chars.peek() {
            Some(&(i, quote)) if quote == '"' || quote == '\'' => {
                chars.next();
                let value_start = i + 1;
                let mut value_end = tag.len();
                for (j, c) in chars.by_ref() {
                    if c == quote {
                        value_end = j;
                        break;
                    }
                }
                tag[value_start..value_end].to_string()
            }
            Some(&(i, _)) => {
                let mut value_end = tag.len();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_whitespace() {
                        value_end = j;
                        break;
                    }
                    chars.next();
                }
                tag[i..value_end].to_string()
            }
            None => String::new(),
        };
        attrs.push((key, value));
    }

    attrs
}
