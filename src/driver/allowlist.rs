//! Allowlist policy — prefix matching over requested targets.
//!
//! An empty allowlist is permissive: every target is allowed. This is a
//! deliberate default-open posture; a deny-by-default mode would be an
//! explicit opt-in, never a silent change (see `DESIGN.md`).

/// Returns `true` when `target` is permitted by `allowlist`.
///
/// The target is trimmed before comparison. Matching is case-sensitive,
/// exact-prefix: no globs, no regex. An empty allowlist permits everything.
pub fn is_allowed(target: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let trimmed = target.trim();
    allowlist
        .iter()
        .any(|entry| trimmed.starts_with(entry.as_str()))
}
