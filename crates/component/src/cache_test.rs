//! In-process cache tests.

use super::*;

#[tokio::test]
async fn set_get_delete() {
    let cache = MemoryCache::new();
    assert_eq!(cache.get("foo").await.unwrap(), None);

    cache.set("foo", b"bar".to_vec()).await.unwrap();
    assert_eq!(cache.get("foo").await.unwrap(), Some(b"bar".to_vec()));

    cache.set("foo", b"baz".to_vec()).await.unwrap();
    assert_eq!(cache.get("foo").await.unwrap(), Some(b"baz".to_vec()));

    cache.delete("foo").await.unwrap();
    assert_eq!(cache.get("foo").await.unwrap(), None);
}
