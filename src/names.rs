//! Relative display names.

/// Return `fqdn` with its trailing `"." + parent` removed.
///
/// The caller guarantees the suffix: the traversal drops PTR answers that
/// fail [`strip_parent`] before building nodes from them. A mismatch here is
/// a bug in the caller, so this panics instead of returning an error.
/// Comparison ignores ASCII case.
///
/// ```
/// use dnssd_topology::names::relative_name;
///
/// assert_eq!(
///     relative_name("instance.type.router.example.com.", "type.router.example.com."),
///     "instance"
/// );
/// ```
pub fn relative_name<'a>(fqdn: &'a str, parent: &str) -> &'a str {
    match strip_parent(fqdn, parent) {
        Some(relative) => relative,
        None => panic!("{:?} is not a child of {:?}", fqdn, parent),
    }
}

/// Non-panicking form of [`relative_name`] for names that may legitimately
/// lie outside `parent` (SRV targets).
pub fn strip_parent<'a>(fqdn: &'a str, parent: &str) -> Option<&'a str> {
    let cut = fqdn.len().checked_sub(parent.len() + 1)?;
    let (head, tail) = (fqdn.get(..cut)?, fqdn.get(cut..)?);
    let suffix = tail.strip_prefix('.')?;
    if head.is_empty() || !suffix.eq_ignore_ascii_case(parent) {
        return None;
    }
    // An odd run of trailing backslashes escapes the separator dot.
    let trailing = head.bytes().rev().take_while(|&b| b == b'\\').count();
    if trailing % 2 == 1 {
        return None;
    }
    Some(head)
}

/// Normalize `name` to end with exactly one dot.
pub fn fully_qualified(name: &str) -> String {
    format!("{}.", name.trim().trim_end_matches('.'))
}
