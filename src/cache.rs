//! 进程内TTL键值缓存
//!
//! 用于短信验证码、发送频率限制以及provider侧的任务快照。
//! 过期条目在读取时惰性清理。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: &str, ttl: Duration) {
        let mut map = self.inner.write().unwrap();
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<String> {
        {
            let map = self.inner.read().unwrap();
            match map.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // 已过期，清理后返回None
        self.inner.write().unwrap().remove(key);
        None
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) {
        self.inner.write().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert!(cache.exists("k"));

        cache.delete("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_expired_entry_is_gone() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.exists("k"));
    }

    #[test]
    fn test_overwrite_refreshes_value() {
        let cache = MemoryCache::new();
        cache.set("k", "v1", Duration::from_secs(60));
        cache.set("k", "v2", Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }
}
