use unicode_normalization::UnicodeNormalization;

/// Reduce a client-supplied file name to a safe flat name.
///
/// Letters are NFKD-decomposed and anything left outside ASCII is dropped,
/// so `ą` keeps its base `a`. `/` counts as whitespace, whitespace runs
/// become `_`, and only ASCII letters, digits and `._-` survive. Leading and
/// trailing dots and underscores are trimmed, so `../../etc/passwd` becomes
/// `etc_passwd`. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' { ' ' } else { c })
        .collect();

    ascii
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
