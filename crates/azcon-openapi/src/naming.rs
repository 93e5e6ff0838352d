//! Tool and parameter naming.
//!
//! Both functions are pure and idempotent; their outputs satisfy the
//! external naming contract `^[a-zA-Z0-9_.-]{1,64}$`.

/// Maximum length for tool names and schema keys.
const MAX_NAME_LEN: usize = 64;

/// Builds the external tool name `<api>_<snake_operation_id>`.
///
/// `SendEmail` becomes `send_email`, `GetAllTeams` becomes `get_all_teams`,
/// `V4CalendarPostItem` becomes `v4_calendar_post_item`.
pub fn tool_name(api_name: &str, operation_id: &str) -> String {
    let raw = format!("{}_{}", api_name, snake_case(operation_id)).to_lowercase();
    sanitize_key(&raw)
}

/// Snake-cases a mixed-case identifier.
///
/// Word boundaries fall on lower-to-upper transitions, digit-to-upper
/// transitions, and at the tail of a capital run that precedes a
/// capital-then-lower pair (`HTTPResponse` -> `http_response`). Any other
/// non-alphanumeric character becomes an underscore.
fn snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let boundary = match chars.get(i.wrapping_sub(1)) {
                Some(p) if i > 0 && (p.is_ascii_lowercase() || p.is_ascii_digit()) => true,
                Some(p) if i > 0 && p.is_ascii_uppercase() => chars
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

/// Prefix shared by every tool compiled from one managed API.
///
/// Matches the transformation [`tool_name`] applies, so
/// `name.starts_with(&api_prefix(api))` is exact.
pub fn api_prefix(api_name: &str) -> String {
    sanitize_key(&format!("{}_", api_name.to_lowercase()))
}

/// Normalizes a schema key to the external naming contract.
///
/// Characters outside `[A-Za-z0-9_.-]` become `_`, leading dots and dashes
/// are trimmed, underscore runs collapse, the result is capped at 64
/// characters, and an empty result becomes `param`. The mapping is
/// deterministic and idempotent: `$filter` -> `_filter`, `$top` -> `_top`.
pub fn sanitize_key(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = replaced.trim_start_matches(['.', '-']);

    let mut out = String::with_capacity(trimmed.len());
    let mut prev_underscore = false;
    for c in trimmed.chars() {
        if c == '_' {
            if !prev_underscore {
                out.push(c);
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    out.truncate(MAX_NAME_LEN);
    if out.is_empty() {
        "param".to_string()
    } else {
        out
    }
}
