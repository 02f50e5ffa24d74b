/// Server-level runtime knobs that are not part of the proxy configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Calls that may wait in the serial executor's queue before submitters
    /// start waiting for space.
    pub executor_queue_capacity: usize,
    /// Result count used by `search_operations` when the client omits `limit`.
    pub default_search_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            executor_queue_capacity: 256,
            default_search_limit: 10,
        }
    }
}
