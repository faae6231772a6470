//! Placeholder expansion for user-supplied config values.
//!
//! Supports `${env:NAME}` (replaced by the variable's value, or an empty
//! string when unset) and a leading `~` (replaced by the home directory).

const ENV_PREFIX: &str = "${env:";

/// Replace every `${env:NAME}` in `input`.
///
/// An unterminated placeholder is left as-is.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(ENV_PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + ENV_PREFIX.len()..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                out.push_str(&std::env::var(name).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(input: &str) -> String {
    shellexpand::tilde(input).into_owned()
}
