//! Recovery pass for feeds that fail XML parsing.
//!
//! Real-world feeds ship HTML entities XML never defined, stray control
//! characters, and bytes that are not UTF-8. The sanitizer decodes with a
//! Latin-1 fallback, rewrites the known entity offenders as numeric
//! character references, and strips the control characters XML forbids.

/// Undefined-in-XML HTML entities mapped to numeric character references.
const UNDEFINED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", "&#160;"),
    ("&ndash;", "&#8211;"),
    ("&mdash;", "&#8212;"),
    ("&lsquo;", "&#8216;"),
    ("&rsquo;", "&#8217;"),
    ("&ldquo;", "&#8220;"),
    ("&rdquo;", "&#8221;"),
    ("&bull;", "&#8226;"),
    ("&hellip;", "&#8230;"),
    ("&trade;", "&#8482;"),
    ("&copy;", "&#169;"),
    ("&reg;", "&#174;"),
    ("&deg;", "&#176;"),
    ("&plusmn;", "&#177;"),
    ("&times;", "&#215;"),
    ("&divide;", "&#247;"),
    ("&laquo;", "&#171;"),
    ("&raquo;", "&#187;"),
    ("&cent;", "&#162;"),
    ("&pound;", "&#163;"),
    ("&euro;", "&#8364;"),
    ("&frac12;", "&#189;"),
    ("&frac14;", "&#188;"),
    ("&frac34;", "&#190;"),
    ("&eacute;", "&#233;"),
    ("&egrave;", "&#232;"),
    ("&ecirc;", "&#234;"),
    ("&agrave;", "&#224;"),
    ("&acirc;", "&#226;"),
    ("&ocirc;", "&#244;"),
    ("&ucirc;", "&#251;"),
    ("&ccedil;", "&#231;"),
    ("&iuml;", "&#239;"),
];

/// Sanitize feed bytes so a second parse attempt can succeed.
pub fn sanitize_feed_xml(content: &[u8]) -> String {
    // UTF-8 first; Latin-1 as the total fallback (every byte maps).
    let mut text = match std::str::from_utf8(content) {
        Ok(s) => s.to_string(),
        Err(_) => content.iter().map(|&b| b as char).collect(),
    };

    for (entity, replacement) in UNDEFINED_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }

    // Strip XML-invalid control characters, keeping tab/newline/CR.
    text.retain(|c| !is_forbidden_control(c));

    text
}

/// 0x00–0x08, 0x0B, 0x0C, 0x0E–0x1F, 0x7F.
fn is_forbidden_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}
