//! Per-shell argument escaping.
//!
//! The scanner's bootstrap scripts re-expand their arguments, so tokens that
//! travel through `bash` or `powershell` must have shell metacharacters
//! neutralized up front. Direct jar invocation passes discrete argv entries
//! to the process launcher and needs no escaping at all.

use crate::os::OsFamily;

/// Characters escaped for POSIX shells. Line breaks are stripped rather than
/// escaped, and commas are shell-safe here; the Windows set adds them.
const POSIX_SPECIAL: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '\\', '"', '\'', ' ', '\t', '*', '?', '[', '#',
    '~', '=', '%',
];

const WINDOWS_EXTRA: &[char] = &[','];

/// Escaping scheme applied to each user-supplied token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaper {
    /// No escaping; tokens become discrete argv entries.
    Identity,
    /// Backslash-prefix every POSIX shell metacharacter.
    PosixShell,
    /// Backtick-prefix the POSIX set plus comma, per PowerShell rules.
    WindowsShell,
}

impl Escaper {
    /// Escaper for a bootstrap script running on the given family.
    pub fn for_shell(os_family: OsFamily) -> Self {
        match os_family {
            OsFamily::Posix => Escaper::PosixShell,
            OsFamily::Windows => Escaper::WindowsShell,
        }
    }

    pub fn apply(&self, raw: &str) -> String {
        match self {
            Escaper::Identity => raw.to_string(),
            Escaper::PosixShell => escape_with(raw, '\\', false),
            Escaper::WindowsShell => escape_with(raw, '`', true),
        }
    }
}

fn escape_with(raw: &str, prefix: char, include_comma: bool) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        // A token can never carry a literal line break through a shell.
        if c == '\r' || c == '\n' {
            continue;
        }
        if POSIX_SPECIAL.contains(&c) || (include_comma && WINDOWS_EXTRA.contains(&c)) {
            escaped.push(prefix);
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL_INPUT: &str = "|&;<>()$`\\\"' \t\r\n\n*?[#~=%,";

    #[test]
    fn test_identity_passthrough() {
        assert_eq!(Escaper::Identity.apply(SPECIAL_INPUT), SPECIAL_INPUT);
        assert_eq!(Escaper::Identity.apply(""), "");
    }

    #[test]
    fn test_posix_escaping() {
        let expected = "\\|\\&\\;\\<\\>\\(\\)\\$\\`\\\\\\\"\\'\\ \\\t\\*\\?\\[\\#\\~\\=\\%,";
        assert_eq!(Escaper::PosixShell.apply(SPECIAL_INPUT), expected);
    }

    #[test]
    fn test_windows_escaping() {
        let expected = "`|`&`;`<`>`(`)`$```\\`\"`'` `\t`*`?`[`#`~`=`%`,";
        assert_eq!(Escaper::WindowsShell.apply(SPECIAL_INPUT), expected);
    }

    #[test]
    fn test_empty_string_yields_empty_string() {
        assert_eq!(Escaper::PosixShell.apply(""), "");
        assert_eq!(Escaper::WindowsShell.apply(""), "");
    }

    #[test]
    fn test_plain_tokens_unchanged_under_shell_escaping() {
        assert_eq!(Escaper::PosixShell.apply("--detect.cleanup"), "--detect.cleanup");
        assert_eq!(
            Escaper::PosixShell.apply("alpha,beta,gamma"),
            "alpha,beta,gamma",
            "commas are not POSIX metacharacters"
        );
        assert_eq!(
            Escaper::WindowsShell.apply("alpha,beta"),
            "alpha`,beta",
            "powershell treats commas as separators"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_posix_escaping_round_trips_through_a_real_shell() {
        let raw = "Test Project' (beta)*?$HOME";
        let escaped = Escaper::PosixShell.apply(raw);

        // The escaped token must survive the shell's own word splitting,
        // globbing, and expansion as a single literal argument.
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("printf '%s' {escaped}"))
            .output()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), raw);
    }

    #[test]
    fn test_for_shell_selection() {
        assert_eq!(Escaper::for_shell(OsFamily::Posix), Escaper::PosixShell);
        assert_eq!(Escaper::for_shell(OsFamily::Windows), Escaper::WindowsShell);
    }
}
