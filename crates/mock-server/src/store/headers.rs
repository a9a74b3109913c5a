//! Raw header-block files.
//!
//! Stored headers are plain `Name: value` lines. A line starting with
//! whitespace continues the previous header; continuation text is trimmed and
//! joined to the value with a single space. Folded values are unfolded rather
//! than kept with their line break, as hyper rejects header values carrying
//! CR or LF. A blank line ends the block.
//! Anything else makes the block malformed, which reads as no headers at all.

/// Ordered header list as stored and returned.
pub type HeaderList = Vec<(String, String)>;

/// Parse a header block. Malformed input yields an empty list.
pub fn parse_header_block(text: &str) -> HeaderList {
    try_parse(text).unwrap_or_default()
}

fn try_parse(text: &str) -> Option<HeaderList> {
    let mut headers: HeaderList = Vec::new();

    for raw_line in text.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        if line.trim().is_empty() {
            if headers.is_empty() {
                continue;
            }
            break;
        }

        if line.starts_with([' ', '\t']) {
            let (_, value) = headers.last_mut()?;
            let continuation = line.trim();
            if value.is_empty() {
                value.push_str(continuation);
            } else {
                value.push(' ');
                value.push_str(continuation);
            }
            continue;
        }

        let (name, value) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }

    Some(headers)
}

/// Render headers back into a block that [`parse_header_block`] reads.
pub fn format_header_block(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(headers: &[(&str, &str)]) -> HeaderList {
        headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_block() {
        let parsed = parse_header_block("MyCustomHeader: test\nX-Other:  two \n");
        assert_eq!(parsed, pairs(&[("MyCustomHeader", "test"), ("X-Other", "two")]));
    }

    #[test]
    fn test_crlf_and_continuation() {
        let parsed = parse_header_block("X-Long: first\r\n    second\r\n\tthird\r\nX-B: b\r\n");
        assert_eq!(
            parsed,
            pairs(&[("X-Long", "first second third"), ("X-B", "b")])
        );
    }

    #[test]
    fn test_blank_line_ends_block() {
        let parsed = parse_header_block("\nA: 1\n\nB: 2\n");
        assert_eq!(parsed, pairs(&[("A", "1")]));
    }

    #[test]
    fn test_malformed_block_is_empty() {
        assert!(parse_header_block("A: 1\nnot a header\n").is_empty());
        assert!(parse_header_block("  leading continuation\nA: 1").is_empty());
        assert!(parse_header_block("Bad Name: x").is_empty());
    }

    #[test]
    fn test_value_may_contain_colons() {
        let parsed = parse_header_block("Location: http://example.com:8080/x");
        assert_eq!(parsed, pairs(&[("Location", "http://example.com:8080/x")]));
    }

    #[test]
    fn test_format_then_parse_preserves_order() {
        let headers = pairs(&[("Z-First", "1"), ("A-Second", "two words"), ("Z-First", "3")]);
        assert_eq!(parse_header_block(&format_header_block(&headers)), headers);
    }
}
