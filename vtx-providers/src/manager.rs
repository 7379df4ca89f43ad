//! Best-effort credential cleanup across adapters.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;
use vtx_core::ModelAdapter;

/// Tracks live adapters so their cached credentials can be dropped at once.
///
/// Holds weak references only; registering an adapter never extends its
/// lifetime.
#[derive(Default)]
pub struct CredentialManager {
    adapters: Mutex<Vec<Weak<dyn ModelAdapter>>>,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("live", &self.len())
            .finish()
    }
}

impl CredentialManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<dyn ModelAdapter>>> {
        self.adapters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an adapter for cleanup.
    pub fn register(&self, adapter: &Arc<dyn ModelAdapter>) {
        let mut adapters = self.lock();
        adapters.retain(|weak| weak.strong_count() > 0);
        adapters.push(Arc::downgrade(adapter));
    }

    /// Clears the credentials of every live adapter. Returns how many were
    /// cleared.
    pub fn clear_all(&self) -> usize {
        let live: Vec<Arc<dyn ModelAdapter>> = {
            let mut adapters = self.lock();
            adapters.retain(|weak| weak.strong_count() > 0);
            adapters.iter().filter_map(Weak::upgrade).collect()
        };

        for adapter in &live {
            debug!(alias = adapter.model_alias(), "Clearing credentials");
            adapter.clear_credentials();
        }
        live.len()
    }

    /// Number of registered adapters still alive.
    pub fn len(&self) -> usize {
        self.lock().iter().filter(|weak| weak.strong_count() > 0).count()
    }

    /// True if no live adapter is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vtx_core::{AuthError, AuthMethod, AuthResult, ChatRequest, ChatResponse};

    #[derive(Default)]
    struct Counting {
        clears: AtomicUsize,
    }

    #[async_trait]
    impl ModelAdapter for Counting {
        fn model_alias(&self) -> &str {
            "counting"
        }

        fn auth_method(&self) -> AuthMethod {
            AuthMethod::BearerToken
        }

        async fn authenticate(&self) -> AuthResult {
            AuthResult::ok(self.auth_method())
        }

        async fn send_request(&self, _request: &ChatRequest) -> Result<ChatResponse, AuthError> {
            Ok(ChatResponse::default())
        }

        async fn validate_dependencies(&self) -> bool {
            true
        }

        fn clear_credentials(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_clear_all_reaches_live_adapters() {
        let manager = CredentialManager::new();
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        let first_dyn: Arc<dyn ModelAdapter> = first.clone();
        let second_dyn: Arc<dyn ModelAdapter> = second.clone();
        manager.register(&first_dyn);
        manager.register(&second_dyn);

        assert_eq!(manager.clear_all(), 2);
        assert_eq!(first.clears.load(Ordering::SeqCst), 1);
        assert_eq!(second.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_adapters_are_skipped() {
        let manager = CredentialManager::new();
        {
            let adapter: Arc<dyn ModelAdapter> = Arc::new(Counting::default());
            manager.register(&adapter);
            assert_eq!(manager.len(), 1);
        }
        assert!(manager.is_empty());
        assert_eq!(manager.clear_all(), 0);
    }
}
