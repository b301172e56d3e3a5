//! Script injection for the host → content direction.
//!
//! The only outbound primitive the embedding offers is "evaluate this
//! script in the view". Responses and events are delivered by calling one of
//! two well-known global receivers with the encoded message as a single
//! string argument:
//!
//! ```text
//! window.__tetherOnResponse("{\"callbackId\":\"cb_1\",...}");
//! ```
//!
//! The encoded JSON is re-escaped as a JavaScript string literal. Besides
//! quotes, backslashes and control characters this escapes U+2028/U+2029
//! (line terminators in pre-ES2019 engines) and `<` (so a payload can never
//! close an enclosing `<script>` element).

use std::fmt::Write as _;

/// Escape `raw` as a double-quoted JavaScript string literal.
#[must_use]
pub fn escape_script_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().saturating_add(2));
    out.push('"');
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            '<' => out.push_str("\\u003c"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            },
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `name` can be used as a global receiver: an ASCII JavaScript
/// identifier.
#[must_use]
pub fn is_valid_receiver_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Build the script that invokes `receiver` with `json`.
#[must_use]
pub fn injection_script(receiver: &str, json: &str) -> String {
    format!("window.{receiver}({});", escape_script_string(json))
}

/// Parse a script produced by [`injection_script`] back into the receiver
/// name and the original JSON. Returns `None` for anything else.
#[must_use]
pub fn parse_injection_script(script: &str) -> Option<(String, String)> {
    let call = script.strip_prefix("window.")?.strip_suffix(");")?;
    let (receiver, literal) = call.split_once('(')?;
    if !is_valid_receiver_name(receiver) {
        return None;
    }
    let json: String = serde_json::from_str(literal).ok()?;
    Some((receiver.to_owned(), json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_newlines() {
        assert_eq!(escape_script_string("a\"b\nc"), r#""a\"b\nc""#);
        assert_eq!(escape_script_string(r"back\slash"), r#""back\\slash""#);
    }

    #[test]
    fn escapes_line_separators_and_script_close() {
        let escaped = escape_script_string("x\u{2028}y\u{2029}</script>");
        assert!(!escaped.contains('\u{2028}'));
        assert!(!escaped.contains('\u{2029}'));
        assert!(!escaped.contains("</"));
    }

    #[test]
    fn escapes_other_control_characters() {
        assert_eq!(escape_script_string("\u{0007}"), r#""\u0007""#);
    }

    #[test]
    fn injection_round_trip() {
        let json = concat!(
            r#"{"callbackId":"cb_1","code":0,"#,
            r#""msg":"line\nbreak   </script>","data":"'\"'"}"#
        );
        let script = injection_script("__tetherOnResponse", json);
        assert!(script.starts_with("window.__tetherOnResponse(\""));
        assert!(!script.contains('\n'));

        let (receiver, parsed) = parse_injection_script(&script).unwrap();
        assert_eq!(receiver, "__tetherOnResponse");
        assert_eq!(parsed, json);
    }

    #[test]
    fn parse_rejects_foreign_scripts() {
        assert!(parse_injection_script("alert(1)").is_none());
        assert!(parse_injection_script("window.a b(\"x\");").is_none());
        assert!(parse_injection_script("window.recv(notastring);").is_none());
    }

    #[test]
    fn receiver_names() {
        assert!(is_valid_receiver_name("__tetherOnEvent"));
        assert!(is_valid_receiver_name("$bridge1"));
        assert!(!is_valid_receiver_name(""));
        assert!(!is_valid_receiver_name("1bridge"));
        assert!(!is_valid_receiver_name("a.b"));
        assert!(!is_valid_receiver_name("a-b"));
    }
}
