use super::TuningError;

pub const NEGATION_MARKER: char = '^';

/// Parse an enable list such as `"LL,Simple"` or `"^LL128"` over `elems`.
///
/// Without the leading `^` only the listed names are enabled; with it every
/// name is enabled except the listed ones. Names compare case-insensitively,
/// unknown names are ignored.
pub fn parse_list<const N: usize>(list: &str, elems: &[&str; N]) -> Result<[bool; N], TuningError> {
    let (body, default) = match list.strip_prefix(NEGATION_MARKER) {
        Some(rest) => (rest, true),
        None => (list, false),
    };
    let mut enabled = [default; N];

    let mut tokens = String::new();
    tokens.try_reserve_exact(body.len())?;
    tokens.push_str(body);

    for token in tokens.split(',').filter(|t| !t.is_empty()) {
        for (slot, elem) in enabled.iter_mut().zip(elems) {
            if token.eq_ignore_ascii_case(elem) {
                *slot = !default;
            }
        }
    }
    Ok(enabled)
}
