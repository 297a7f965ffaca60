//! Size limit enforcement

use crate::config::SizeLimits;
use crate::error::{BuildError, BuildResult, SizeLimitKind};

pub fn check_limit(limit: SizeLimitKind, max: usize, actual: usize) -> BuildResult<()> {
    if actual > max {
        return Err(BuildError::SizeLimitExceeded { limit, max, actual });
    }
    Ok(())
}

/// Sizes measured before anything is encrypted
#[derive(Debug, Clone, Default)]
pub struct SizeReport {
    /// Serialized header
    pub envelope: usize,
    /// Serialized capsule plaintext
    pub capsule: usize,
    /// Plaintext size of each artefact
    pub artefacts: Vec<usize>,
    pub chunk_size: usize,
}

impl SizeReport {
    /// Header, capsule and artefact plaintext combined
    pub fn projected_total(&self) -> usize {
        self.envelope + self.capsule + self.artefacts.iter().sum::<usize>()
    }

    pub fn enforce(&self, limits: &SizeLimits) -> BuildResult<()> {
        check_limit(SizeLimitKind::Chunk, limits.chunk_max_bytes, self.chunk_size)?;
        check_limit(
            SizeLimitKind::CapsulePlaintext,
            limits.capsule_plaintext_max_bytes,
            self.capsule,
        )?;
        for &size in &self.artefacts {
            check_limit(SizeLimitKind::Artefact, limits.artefact_max_bytes, size)?;
        }
        check_limit(SizeLimitKind::Envelope, limits.envelope_max_bytes, self.envelope)?;
        check_limit(
            SizeLimitKind::TotalPackage,
            limits.package_total_max_bytes,
            self.projected_total(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildErrorKind;

    fn report() -> SizeReport {
        SizeReport {
            envelope: 100,
            capsule: 1_000,
            artefacts: vec![10, 20],
            chunk_size: 64,
        }
    }

    #[test]
    fn test_at_limit_passes_and_over_fails() {
        let limits = SizeLimits {
            capsule_plaintext_max_bytes: 1_000,
            ..Default::default()
        };
        assert!(report().enforce(&limits).is_ok());

        let limits = SizeLimits {
            capsule_plaintext_max_bytes: 999,
            ..Default::default()
        };
        match report().enforce(&limits) {
            Err(BuildError::SizeLimitExceeded { limit, max, actual }) => {
                assert_eq!(limit, SizeLimitKind::CapsulePlaintext);
                assert_eq!(max, 999);
                assert_eq!(actual, 1_000);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_each_limit_is_checked() {
        let cases = [
            (
                SizeLimits {
                    artefact_max_bytes: 15,
                    ..Default::default()
                },
                SizeLimitKind::Artefact,
            ),
            (
                SizeLimits {
                    envelope_max_bytes: 99,
                    ..Default::default()
                },
                SizeLimitKind::Envelope,
            ),
            (
                SizeLimits {
                    package_total_max_bytes: 1_129,
                    ..Default::default()
                },
                SizeLimitKind::TotalPackage,
            ),
            (
                SizeLimits {
                    chunk_max_bytes: 32,
                    ..Default::default()
                },
                SizeLimitKind::Chunk,
            ),
        ];
        for (limits, expected) in cases {
            let err = report().enforce(&limits).unwrap_err();
            assert_eq!(err.kind(), BuildErrorKind::SizeLimitExceeded);
            assert!(matches!(err, BuildError::SizeLimitExceeded { limit, .. } if limit == expected));
        }
        assert_eq!(report().projected_total(), 1_130);
    }
}
