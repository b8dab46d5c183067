//! `IC-Certificate` header parsing.
//!
//! The header value is a comma separated list of `name=:base64:` fields.
//! Only `certificate` and `tree` are recognised.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Name of the response header carrying certificate material.
pub const CERTIFICATE_HEADER: &str = "ic-certificate";

/// Certificate and hash tree attached to a query response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateMaterial {
    pub certificate: Option<Vec<u8>>,
    pub tree: Option<Vec<u8>>,
}

impl CertificateMaterial {
    /// Parse one header value, merging its fields over `self`.
    ///
    /// A malformed field is skipped on its own; the rest of the value is still
    /// read.
    pub fn merge_header(mut self, value: &str) -> Self {
        for field in value.split(',') {
            let Some((name, bytes)) = parse_field(field) else {
                tracing::debug!(field = %field.trim(), "Skipping malformed certificate field");
                continue;
            };

            match name {
                "certificate" => self.certificate = Some(bytes),
                "tree" => self.tree = Some(bytes),
                _ => {}
            }
        }
        self
    }

    /// Both parts, if both are present.
    pub fn parts(&self) -> Option<(&[u8], &[u8])> {
        match (&self.certificate, &self.tree) {
            (Some(certificate), Some(tree)) => Some((certificate, tree)),
            _ => None,
        }
    }
}

/// Split `name=:value:` and decode the value.
fn parse_field(field: &str) -> Option<(&str, Vec<u8>)> {
    let inner = field.trim().strip_suffix(':')?;
    let (name, value) = inner.rsplit_once("=:")?;
    let bytes = STANDARD.decode(value.trim()).ok()?;
    Some((name.trim(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_parse_both_fields() {
        let value = format!("certificate=:{}:, tree=:{}:", b64(b"cert"), b64(b"tree"));
        let material = CertificateMaterial::default().merge_header(&value);

        assert_eq!(material.certificate.as_deref(), Some(&b"cert"[..]));
        assert_eq!(material.tree.as_deref(), Some(&b"tree"[..]));
        assert!(material.parts().is_some());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let value = format!(
            "version=:{}:,certificate=:{}:",
            b64(b"2"),
            b64(b"padded!")
        );
        let material = CertificateMaterial::default().merge_header(&value);

        assert_eq!(material.certificate.as_deref(), Some(&b"padded!"[..]));
        assert_eq!(material.tree, None);
        assert!(material.parts().is_none());
    }

    #[test]
    fn test_malformed_field_skipped_alone() {
        let value = format!("certificate=garbage,tree=:{}:", b64(b"t"));
        let material = CertificateMaterial::default().merge_header(&value);

        assert_eq!(material.certificate, None);
        assert_eq!(material.tree.as_deref(), Some(&b"t"[..]));
    }

    #[test]
    fn test_bad_base64_skipped() {
        let material = CertificateMaterial::default().merge_header("tree=:!!!:");
        assert_eq!(material.tree, None);
    }

    #[test]
    fn test_merge_keeps_earlier_fields() {
        let material = CertificateMaterial::default()
            .merge_header(&format!("certificate=:{}:", b64(b"c")))
            .merge_header(&format!("tree=:{}:", b64(b"t")));

        assert!(material.parts().is_some());
    }
}
