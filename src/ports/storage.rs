use crate::Result;

/// String-keyed, string-valued storage that outlives a page load.
///
/// Shared by every tab of an origin with no locking; concurrent writers race
/// and the last write wins.
pub trait ClientStateStore: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
