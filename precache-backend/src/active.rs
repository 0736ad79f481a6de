use std::sync::Arc;

use precache_core::GenerationId;
use tokio::sync::watch;

/// Records which generation of a store currently serves traffic.
///
/// Every clone observes the same value, so workers and interceptors that
/// share a store agree on which generation is live. A generation is
/// *superseded* once another one has been promoted after it.
///
/// ```
/// use precache_backend::ActiveGeneration;
/// use precache_core::GenerationId;
///
/// let active = ActiveGeneration::default();
/// let v1 = GenerationId::new_static("v1");
/// let v2 = GenerationId::new_static("v2");
///
/// active.promote(v1.clone());
/// assert!(!active.is_superseded(&v1));
///
/// assert_eq!(active.promote(v2.clone()), Some(v1.clone()));
/// assert!(active.is_superseded(&v1));
/// ```
#[derive(Debug, Clone)]
pub struct ActiveGeneration {
    current: Arc<watch::Sender<Option<GenerationId>>>,
}

impl Default for ActiveGeneration {
    fn default() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current: Arc::new(current),
        }
    }
}

impl ActiveGeneration {
    /// The live generation, if one was ever promoted.
    pub fn get(&self) -> Option<GenerationId> {
        self.current.borrow().clone()
    }

    /// Makes `generation` the live one and returns the previous value.
    pub fn promote(&self, generation: GenerationId) -> Option<GenerationId> {
        self.current.send_replace(Some(generation))
    }

    /// Whether some other generation has been promoted instead of
    /// `generation`. Nothing is superseded before the first promotion.
    pub fn is_superseded(&self, generation: &GenerationId) -> bool {
        matches!(&*self.current.borrow(), Some(current) if current != generation)
    }

    /// Watches promotions.
    pub fn subscribe(&self) -> watch::Receiver<Option<GenerationId>> {
        self.current.subscribe()
    }
}
