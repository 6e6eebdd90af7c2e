//! Map provider errors to failure kinds.

use crate::error::FailureKind;
use crate::provider::ProviderError;

/// The only place provider errors are interpreted.
///
/// A response without image data counts as transient.
pub fn classify(err: &ProviderError) -> FailureKind {
    match err {
        ProviderError::Auth(_) => FailureKind::Auth,
        ProviderError::Quota(_) => FailureKind::Quota,
        ProviderError::RateLimited
        | ProviderError::Http { .. }
        | ProviderError::Network(_)
        | ProviderError::MissingImage
        | ProviderError::InvalidResponse(_) => FailureKind::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_variants() {
        assert_eq!(classify(&ProviderError::Auth("x".into())), FailureKind::Auth);
        assert_eq!(classify(&ProviderError::Quota("x".into())), FailureKind::Quota);
        assert_eq!(classify(&ProviderError::RateLimited), FailureKind::Transient);
        assert_eq!(
            classify(&ProviderError::Http { status: 500, message: String::new() }),
            FailureKind::Transient
        );
        assert_eq!(classify(&ProviderError::Network("reset".into())), FailureKind::Transient);
        assert_eq!(classify(&ProviderError::MissingImage), FailureKind::Transient);
    }
}
