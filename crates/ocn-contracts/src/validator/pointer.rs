//! JSON pointer (RFC 6901) path building.

use std::borrow::Cow;

/// Escape one reference token: `~` becomes `~0`, `/` becomes `~1`.
pub fn escape_token(token: &str) -> Cow<'_, str> {
    if token.contains(|c: char| c == '~' || c == '/') {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Append `token` to `parent`.
pub fn child_path(parent: &str, token: &str) -> String {
    format!("{}/{}", parent, escape_token(token))
}

/// Append an array index to `parent`.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}/{}", parent, index)
}
