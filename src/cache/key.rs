//! Cache key strategy.

use crate::config::schema::CacheConfig;
use crate::model::Request;

/// `METHOD:url` followed by the value of every strategy header, in order.
///
/// Missing strategy headers contribute an empty segment so that
/// `a=1,b=` and `a=,b=1` never collide.
pub fn cache_key(request: &Request, config: &CacheConfig) -> String {
    let mut key = format!("{}:{}", request.method(), request.url());
    for name in &config.strategy_headers {
        key.push(':');
        key.push_str(&request.header().get_all(name).join(","));
    }
    key
}
