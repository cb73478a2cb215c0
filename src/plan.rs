//! Execution plan fingerprints.
//!
//! Plans of the same query differ between runs mostly in their numeric
//! estimates (rows, costs, widths). Digits and per-line indentation are
//! removed before hashing, so two structurally identical plans share a
//! fingerprint.

use std::path::Path;

use crate::{CollectResult, read_artifact};

/// Length of a plan hash in bytes (rendered as twice as many hex chars).
pub const PLAN_HASH_BYTES: usize = 16;

/// Strips digits and surrounding whitespace from every line and joins
/// the results without a separator.
pub fn canonicalize_plan(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let stripped: String = line.chars().filter(|c| !c.is_ascii_digit()).collect();
        out.push_str(stripped.trim());
    }
    out
}

/// Hex digest of already canonicalized plan text.
pub fn digest_hex(canonical: &str) -> String {
    let hex = blake3::hash(canonical.as_bytes()).to_hex();
    hex[..PLAN_HASH_BYTES * 2].to_string()
}

/// Reads a plan dump and returns its fingerprint.
pub fn plan_hash(path: &Path) -> CollectResult<String> {
    let text = read_artifact(path)?;
    let hash = digest_hex(&canonicalize_plan(&text));
    tracing::debug!(plan = %path.display(), %hash, "hashed plan");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectError;
    use crate::testutil::temp_dir;

    const PLAN: &str = "\
 Limit  (cost=1000.00..1234.56 rows=100 width=24)
   ->  Sort  (cost=1000.00..1100.00 rows=40000 width=24)
         Sort Key: l_returnflag
         ->  Seq Scan on lineitem  (cost=0.00..172210.80 rows=5998820 width=24)
";

    #[test]
    fn canonical_form_drops_digits_and_indentation() {
        let canonical = canonicalize_plan("  Seq Scan  (rows=42)  \n\t-> Hash 7\n");
        assert_eq!(canonical, "Seq Scan  (rows=)-> Hash");
    }

    #[test]
    fn hash_is_32_hex_chars() {
        let hash = digest_hex(&canonicalize_plan(PLAN));
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let full = blake3::hash(canonicalize_plan(PLAN).as_bytes()).to_hex();
        assert!(full.as_str().starts_with(&hash));
    }

    #[test]
    fn hash_ignores_digit_changes() {
        let root = temp_dir("plan-digits");
        let a = root.join("a");
        let b = root.join("b");
        std::fs::write(&a, PLAN).expect("write a");
        let shifted: String = PLAN
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => char::from_digit((d + 3) % 10, 10).unwrap_or(c),
                None => c,
            })
            .collect();
        std::fs::write(&b, shifted).expect("write b");

        let first = plan_hash(&a).expect("hash a");
        assert_eq!(first, plan_hash(&a).expect("hash a again"));
        assert_eq!(first, plan_hash(&b).expect("hash b"));
    }

    #[test]
    fn structural_change_changes_hash() {
        let other = PLAN.replace("Seq Scan", "Index Scan");
        assert_ne!(
            digest_hex(&canonicalize_plan(PLAN)),
            digest_hex(&canonicalize_plan(&other))
        );
    }

    #[test]
    fn empty_plan_hashes_like_empty_string() {
        let root = temp_dir("plan-empty");
        let path = root.join("1");
        std::fs::write(&path, "").expect("write");
        assert_eq!(plan_hash(&path).expect("hash"), digest_hex(""));
    }

    #[test]
    fn missing_plan_is_an_error() {
        let root = temp_dir("plan-missing");
        let err = plan_hash(&root.join("3")).expect_err("missing");
        assert!(matches!(err, CollectError::MissingArtifact { .. }));
    }
}
