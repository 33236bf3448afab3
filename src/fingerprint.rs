//! Content fingerprinting for cache and single-flight identity.
//!
//! Two documents that differ only in remote `@import` directives (web-font
//! pulls that are slow and can resolve differently per fetch) must map to the
//! same key, so those fragments are stripped before hashing.

use sha2::{Digest, Sha256};

/// Fixed-width digest of canonicalized render input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hashes the canonical form of an HTML document.
    pub fn of(html: &str) -> Self {
        let canonical = canonicalize(html);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Fingerprint(hasher.finalize().into())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Removes remote `@import` directives from the document.
///
/// Scans for `@import … ;` spans and drops the ones whose source is an
/// absolute or scheme-relative URL. Local imports stay, since they affect
/// what actually renders from disk.
fn canonicalize(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find("@import") {
        let (head, tail) = rest.split_at(start);
        out.push_str(head);

        match tail.find(';') {
            Some(end) => {
                let directive = &tail[..=end];
                if !is_remote_import(directive) {
                    out.push_str(directive);
                }
                rest = &tail[end + 1..];
            }
            None => {
                // Unterminated directive; keep the remainder untouched.
                out.push_str(tail);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_remote_import(directive: &str) -> bool {
    let lower = directive.to_ascii_lowercase();
    lower.contains("http://") || lower.contains("https://") || lower.contains("url(//")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"<html><head><style>
        @import url('https://fonts.googleapis.com/css2?family=Rubik');
        body { background: #1e2430; }
    </style></head><body><div id="card">alice: 2150</div></body></html>"#;

    #[test]
    fn remote_font_import_does_not_perturb_identity() {
        let without_import = CARD.replace(
            "@import url('https://fonts.googleapis.com/css2?family=Rubik');",
            "",
        );
        assert_eq!(Fingerprint::of(CARD), Fingerprint::of(&without_import));
    }

    #[test]
    fn different_card_content_differs() {
        let other = CARD.replace("alice: 2150", "bob: 1800");
        assert_ne!(Fingerprint::of(CARD), Fingerprint::of(&other));
    }

    #[test]
    fn local_imports_are_kept() {
        let a = "<style>@import url('cards.css');</style>";
        let b = "<style>@import url('other.css');</style>";
        assert_ne!(Fingerprint::of(a), Fingerprint::of(b));
    }

    #[test]
    fn scheme_relative_imports_are_stripped() {
        let a = "<style>@import url(//cdn.example.com/font.css);</style><div/>";
        let b = "<style></style><div/>";
        assert_eq!(Fingerprint::of(a), Fingerprint::of(b));
    }

    #[test]
    fn unterminated_import_is_left_alone() {
        let html = "<style>@import url('https://fonts.example/f.css')";
        // No panic, and the fragment still contributes to identity.
        assert_ne!(Fingerprint::of(html), Fingerprint::of("<style>"));
    }

    #[test]
    fn display_is_64_hex_chars() {
        let hex = Fingerprint::of("x").to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
