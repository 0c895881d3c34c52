//! Per-engine registry of tenant bots.
//!
//! Lookups take a short read lock on the map and never wait on bot creation.
//! Creation is serialized through an async mutex, so concurrent first
//! requests for the same tenant build exactly one bot, and the bot becomes
//! visible only after its creation future (start + startup signals) finished.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

use maxo_core::BoxedBot;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::EngineResult;

/// Tenant key → bot map plus the set of tenants that received startup signals.
pub struct TenantRegistry<K> {
    bots: RwLock<HashMap<K, BoxedBot>>,
    started: Mutex<HashSet<K>>,
    live: AtomicBool,
    create_lock: tokio::sync::Mutex<()>,
}

impl<K> Default for TenantRegistry<K> {
    fn default() -> Self {
        Self {
            bots: RwLock::new(HashMap::new()),
            started: Mutex::new(HashSet::new()),
            live: AtomicBool::new(false),
            create_lock: tokio::sync::Mutex::new(()),
        }
    }
}

impl<K> TenantRegistry<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached bot for `key`.
    pub fn get(&self, key: &K) -> Option<BoxedBot> {
        self.bots.read().get(key).cloned()
    }

    /// Returns the cached bot for `key`, creating it with `create` if needed.
    ///
    /// `create` runs at most once per key while the creation lock is held. A
    /// bot returned by it is considered started.
    pub async fn get_or_create<F, Fut>(&self, key: &K, create: F) -> EngineResult<BoxedBot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<BoxedBot>>,
    {
        if let Some(bot) = self.get(key) {
            return Ok(bot);
        }

        let _guard = self.create_lock.lock().await;
        if let Some(bot) = self.get(key) {
            return Ok(bot);
        }

        let bot = create().await?;
        self.started.lock().insert(key.clone());
        let mut bots = self.bots.write();
        bots.insert(key.clone(), bot.clone());
        debug!(tenants = bots.len(), "Registered webhook tenant");
        Ok(bot)
    }

    /// Caches a prepared bot.
    ///
    /// Before [`start_pending`](Self::start_pending) has run the bot waits for
    /// it. Afterwards `startup` runs first and the bot is cached as started,
    /// so it is never visible before its startup finished. Returns `false` if
    /// `key` is already taken.
    pub async fn insert<F, Fut>(&self, key: K, bot: BoxedBot, startup: F) -> EngineResult<bool>
    where
        F: FnOnce(BoxedBot) -> Fut,
        Fut: Future<Output = EngineResult<()>>,
    {
        let _guard = self.create_lock.lock().await;
        if self.bots.read().contains_key(&key) {
            return Ok(false);
        }

        if self.live.load(Ordering::SeqCst) {
            startup(bot.clone()).await?;
            self.started.lock().insert(key.clone());
        }
        self.bots.write().insert(key, bot);
        Ok(true)
    }

    /// Runs `startup` for every cached bot that has not been started yet.
    pub async fn start_pending<F, Fut>(&self, mut startup: F) -> EngineResult<usize>
    where
        F: FnMut(BoxedBot) -> Fut,
        Fut: Future<Output = EngineResult<()>>,
    {
        let _guard = self.create_lock.lock().await;
        let pending: Vec<(K, BoxedBot)> = {
            let bots = self.bots.read();
            let started = self.started.lock();
            bots.iter()
                .filter(|(key, _)| !started.contains(*key))
                .map(|(key, bot)| (key.clone(), bot.clone()))
                .collect()
        };

        let count = pending.len();
        for (key, bot) in pending {
            startup(bot).await?;
            self.started.lock().insert(key);
        }
        self.live.store(true, Ordering::SeqCst);
        Ok(count)
    }

    /// Removes every bot and forgets which tenants were started.
    pub async fn drain(&self) -> Vec<(K, BoxedBot)> {
        let _guard = self.create_lock.lock().await;
        self.live.store(false, Ordering::SeqCst);
        self.started.lock().clear();
        self.bots.write().drain().collect()
    }

    /// Returns whether `key` received its startup signals.
    pub fn is_started(&self, key: &K) -> bool {
        self.started.lock().contains(key)
    }

    /// Returns whether cached bots have been started as a group.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Returns the number of cached bots.
    pub fn len(&self) -> usize {
        self.bots.read().len()
    }

    /// Returns whether no bot is cached.
    pub fn is_empty(&self) -> bool {
        self.bots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBot;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_or_create_builds_once() {
        let registry = Arc::new(TenantRegistry::<String>::new());
        let created = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let created = Arc::clone(&created);
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_create(&"tok".to_string(), || async move {
                        created.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(Arc::new(MockBot::new("tok")) as BoxedBot)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().token(), "tok");
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(registry.is_started(&"tok".to_string()));
    }

    #[tokio::test]
    async fn test_failed_creation_is_not_cached() {
        let registry = TenantRegistry::<i64>::new();
        let result = registry
            .get_or_create(&1, || async {
                Err(crate::error::EngineError::BotNotRegistered(1))
            })
            .await;

        assert!(result.is_err());
        assert!(registry.is_empty());
        assert!(!registry.is_started(&1));
    }

    #[tokio::test]
    async fn test_inserted_bot_is_started_once() {
        let registry = TenantRegistry::<String>::new();
        assert!(
            registry
                .insert("b".to_string(), Arc::new(MockBot::new("b")), |_| async {
                    Err(crate::error::EngineError::BotNotRegistered(0))
                })
                .await
                .unwrap()
        );
        assert!(!registry.is_started(&"b".to_string()));

        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            registry
                .start_pending(move |_| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_started(&"b".to_string()));
    }

    #[tokio::test]
    async fn test_drain_clears_everything() {
        let registry = TenantRegistry::<String>::new();
        registry
            .get_or_create(&"a".to_string(), || async {
                Ok(Arc::new(MockBot::new("a")) as BoxedBot)
            })
            .await
            .unwrap();

        assert!(
            !registry
                .insert("a".to_string(), Arc::new(MockBot::new("a")), |_| async { Ok(()) })
                .await
                .unwrap()
        );

        let drained = registry.drain().await;
        assert_eq!(drained.len(), 1);
        assert!(registry.is_empty());
        assert!(!registry.is_started(&"a".to_string()));

        let started = registry.start_pending(|_| async { Ok(()) }).await.unwrap();
        assert_eq!(started, 0);
    }

    #[tokio::test]
    async fn test_insert_after_start_runs_startup_first() {
        let registry = TenantRegistry::<String>::new();
        registry.start_pending(|_| async { Ok(()) }).await.unwrap();
        assert!(registry.is_live());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let inserted = registry
            .insert("late".to_string(), Arc::new(MockBot::new("late")), |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        assert!(inserted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_started(&"late".to_string()));

        let rerun = registry.start_pending(|_| async { Ok(()) }).await.unwrap();
        assert_eq!(rerun, 0);
    }

    #[tokio::test]
    async fn test_failed_late_startup_is_not_cached() {
        let registry = TenantRegistry::<String>::new();
        registry.start_pending(|_| async { Ok(()) }).await.unwrap();

        let result = registry
            .insert("late".to_string(), Arc::new(MockBot::new("late")), |_| async {
                Err(crate::error::EngineError::BotNotRegistered(7))
            })
            .await;

        assert!(result.is_err());
        assert!(registry.is_empty());
        assert!(!registry.is_started(&"late".to_string()));
    }
}
