use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Time-windowed guard against the same lead being submitted twice.
///
/// A submission is identified by a SHA-256 fingerprint of its lower-cased email
/// and the digits of its phone number. The first submission claims the
/// fingerprint; later ones inside the window are reported as duplicates. A claim
/// is released when the lead could not be written to the ledger so the caller can
/// resubmit.
#[derive(Clone)]
pub struct DuplicateGuard {
    claims: Option<Cache<String, String>>,
}

impl DuplicateGuard {
    /// A zero window disables the guard.
    pub fn new(window: Duration) -> Self {
        let claims = (!window.is_zero()).then(|| {
            Cache::builder()
                .time_to_live(window)
                .max_capacity(10_000)
                .build()
        });
        Self { claims }
    }

    /// Computes the submission fingerprint (hex encoded).
    pub fn fingerprint(email: &str, phone: &str) -> String {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        let mut hasher = Sha256::new();
        hasher.update(email.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(digits.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Claims `fingerprint` for `lead_id`.
    ///
    /// Returns `Err` with the lead id that already holds the claim.
    pub async fn claim(&self, fingerprint: &str, lead_id: &str) -> Result<(), String> {
        let Some(claims) = &self.claims else {
            return Ok(());
        };

        let entry = claims
            .entry(fingerprint.to_string())
            .or_insert(lead_id.to_string())
            .await;

        if entry.is_fresh() {
            Ok(())
        } else {
            Err(entry.into_value())
        }
    }

    pub async fn release(&self, fingerprint: &str) {
        if let Some(claims) = &self.claims {
            claims.invalidate(fingerprint).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ignores_case_and_separators() {
        let a = DuplicateGuard::fingerprint("John@Example.com", "+91-98765-43210");
        let b = DuplicateGuard::fingerprint("john@example.com ", "+91 98765 43210");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let c = DuplicateGuard::fingerprint("john@example.com", "+91-98765-43211");
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_second_claim_is_rejected_until_released() {
        let guard = DuplicateGuard::new(Duration::from_secs(300));
        let fp = DuplicateGuard::fingerprint("john@example.com", "9876543210");

        assert!(guard.claim(&fp, "lead-1").await.is_ok());
        assert_eq!(guard.claim(&fp, "lead-2").await, Err("lead-1".to_string()));

        guard.release(&fp).await;
        assert!(guard.claim(&fp, "lead-3").await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_window_disables_guard() {
        let guard = DuplicateGuard::new(Duration::ZERO);
        assert!(guard.claim("abc", "lead-1").await.is_ok());
        assert!(guard.claim("abc", "lead-2").await.is_ok());
    }
}
