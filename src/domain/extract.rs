//! Locate the tree object embedded in free generator text.

use serde_json::Value;

use crate::domain::error::{DomainError, DomainResult};

const FENCE: &str = "```";

/// Return the outermost object found in `text` as a standalone JSON string.
///
/// Scanning starts at the first `{` and tracks string literals so braces
/// inside text do not count. If the text ends before the object closes,
/// the missing closers are appended in nesting order. A code fence
/// outside a string literal bounds the scan.
pub fn extract_object(text: &str) -> DomainResult<String> {
    let start = text.find('{').ok_or(DomainError::NoObjectFound)?;
    let scan = &text[start..];
    let mut body = scan;

    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in scan.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c == '`' && scan[i..].starts_with(FENCE) {
            body = &scan[..i];
            break;
        }
        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&c) {
                    open.pop();
                }
                if open.is_empty() {
                    return Ok(scan[..i + c.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    let mut completed = body.trim_end().to_string();
    if in_string {
        completed.push('"');
    }
    while completed.ends_with(',') {
        completed.pop();
    }
    completed.extend(open.iter().rev());
    Ok(completed)
}

/// Extract and parse the embedded object.
pub fn parse_payload(text: &str) -> DomainResult<Value> {
    let object = extract_object(text)?;
    Ok(serde_json::from_str(&object)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("{\"a\": 1}", "{\"a\": 1}")]
    #[case("Here you go: {\"a\": {\"b\": 2}} hope it helps", "{\"a\": {\"b\": 2}}")]
    #[case("```json\n{\"a\": \"}\"}\n```", "{\"a\": \"}\"}")]
    #[case("{\"a\": [1, {\"b\": 2", "{\"a\": [1, {\"b\": 2}]}")]
    #[case("{\"a\": [1, 2],", "{\"a\": [1, 2]}")]
    fn given_generator_text_when_extracting_then_returns_object(
        #[case] text: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(extract_object(text).unwrap(), expected);
    }

    #[test]
    fn given_fence_inside_string_when_extracting_then_keeps_whole_value() {
        let text = "```json\n{\"a\": \"run ```ls``` first\", \"b\": 1}\n```";

        let value = parse_payload(text).unwrap();

        assert_eq!(value["a"], "run ```ls``` first");
        assert_eq!(value["b"], 1);
    }

    #[test]
    fn given_unclosed_object_before_fence_when_extracting_then_stops_at_fence() {
        assert_eq!(
            extract_object("{\"a\": [1\n```\ntrailing {\"b\": 2}").unwrap(),
            "{\"a\": [1]}"
        );
    }

    #[test]
    fn given_text_without_braces_when_extracting_then_fails() {
        assert!(matches!(
            extract_object("no tree here"),
            Err(DomainError::NoObjectFound)
        ));
    }

    #[test]
    fn given_truncated_string_when_parsing_then_closes_it() {
        let value = parse_payload("{\"question\": \"Which kind").unwrap();
        assert_eq!(value["question"], "Which kind");
    }
}
