//! Rich-text descriptions are edited as HTML and cleaned before they are
//! submitted. Only inline formatting and lists survive; anything
//! executable is removed together with its content. Cleaning an already
//! clean string returns it unchanged.

const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i",
    "li", "ol", "p", "pre", "s", "span", "strong", "sub", "sup", "u", "ul",
];

const VOID_TAGS: &[&str] = &["br", "hr"];

const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea",
];

const SAFE_SCHEMES: &[&str] = &["http:", "https:", "mailto:", "tel:"];

/// Strip everything but a whitelist of formatting tags.
///
/// ```
/// use shared::sanitize::sanitize_html;
///
/// let clean = sanitize_html(r#"<p onclick="x()">hi<script>alert(1)</script></p>"#);
/// assert_eq!(clean, "<p>hi</p>");
/// ```
pub fn sanitize_html(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('<') {
        let start = pos + offset;
        out.push_str(&input[pos..start]);

        if lower[start..].starts_with("<!--") {
            pos = match lower[start + 4..].find("-->") {
                Some(end) => start + 4 + end + 3,
                None => input.len(),
            };
            continue;
        }

        let Some(close) = find_tag_end(input, start + 1) else {
            out.push_str("&lt;");
            pos = start + 1;
            continue;
        };

        let inner = &input[start + 1..close];
        pos = close + 1;

        let Some(tag) = parse_tag(inner) else {
            out.push_str("&lt;");
            pos = start + 1;
            continue;
        };

        if DROPPED_WITH_CONTENT.contains(&tag.name.as_str()) {
            if !tag.closing {
                let needle = format!("</{}", tag.name);
                pos = match lower[pos..].find(&needle) {
                    Some(found) => {
                        let after = pos + found;
                        match input[after..].find('>') {
                            Some(gt) => after + gt + 1,
                            None => input.len(),
                        }
                    }
                    None => input.len(),
                };
            }
            continue;
        }

        if !ALLOWED_TAGS.contains(&tag.name.as_str()) {
            continue;
        }

        if tag.closing {
            if !VOID_TAGS.contains(&tag.name.as_str()) {
                out.push_str(&format!("</{}>", tag.name));
            }
            continue;
        }

        if tag.name == "a" {
            match safe_href(tag.attributes) {
                Some(href) => out.push_str(&format!("<a href=\"{}\">", escape_attribute(&href))),
                None => out.push_str("<a>"),
            }
        } else {
            out.push_str(&format!("<{}>", tag.name));
        }
    }

    out.push_str(&input[pos..]);
    out
}

struct Tag<'a> {
    name: String,
    closing: bool,
    attributes: &'a str,
}

fn parse_tag(inner: &str) -> Option<Tag<'_>> {
    let (closing, rest) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let name_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    Some(Tag {
        name: rest[..name_len].to_ascii_lowercase(),
        closing,
        attributes: &rest[name_len..],
    })
}

/// Index of the `>` closing a tag, skipping quoted attribute values
fn find_tag_end(input: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(from + i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

fn safe_href(attributes: &str) -> Option<String> {
    let lower = attributes.to_ascii_lowercase();
    let mut search = 0;
    while let Some(found) = lower[search..].find("href") {
        let at = search + found;
        search = at + 4;
        let preceded_ok = at == 0 || lower[..at].ends_with(|c: char| c.is_whitespace());
        let rest = attributes[at + 4..].trim_start();
        if !preceded_ok || !rest.starts_with('=') {
            continue;
        }
        let value = rest[1..].trim_start();
        let raw = match value.chars().next() {
            Some(q @ ('"' | '\'')) => value[1..].split(q).next().unwrap_or_default(),
            _ => value.split(|c: char| c.is_whitespace() || c == '/').next().unwrap_or_default(),
        };
        return is_safe_url(raw).then(|| raw.trim().to_string());
    }
    None
}

fn is_safe_url(url: &str) -> bool {
    let compact: String = decode_entities(url)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.find(':') {
        Some(colon) => {
            let before = &compact[..colon];
            // a colon after a path or query separator is not a scheme
            if before.contains(['/', '?', '#']) {
                return true;
            }
            SAFE_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
        }
        None => true,
    }
}

/// Length of the character reference starting at `text[0]`, if any
fn entity_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('&')?;
    let end = body.find(';')?;
    let name = &body[..end];
    let valid = match name.strip_prefix('#') {
        Some(num) => match num.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()),
        },
        None => !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()),
    };
    valid.then_some(end + 2)
}

/// Decode the character reference at the start of `text`, returning the
/// character and how many bytes it spans. Numeric references may omit the
/// trailing `;`.
fn decode_reference(text: &str) -> Option<(char, usize)> {
    let body = text.strip_prefix('&')?;
    if let Some(num) = body.strip_prefix('#') {
        let (digits, radix, prefix) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 3),
            None => (num, 10, 2),
        };
        let len = digits
            .find(|c: char| !c.is_digit(radix))
            .unwrap_or(digits.len());
        let value = u32::from_str_radix(&digits[..len], radix).ok()?;
        let semicolon = usize::from(digits[len..].starts_with(';'));
        let c = char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER);
        return Some((c, prefix + len + semicolon));
    }
    let end = body.find(';')?;
    let c = match body[..end].to_ascii_lowercase().as_str() {
        "amp" => '&',
        "colon" => ':',
        "tab" => '\t',
        "newline" => '\n',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => return None,
    };
    Some((c, end + 2))
}

/// Decode the references a browser would resolve before reading a URL
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_reference(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape for a double-quoted attribute, leaving existing character
/// references alone
fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        match c {
            '&' if entity_len(&value[i..]).is_some() => out.push('&'),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}
