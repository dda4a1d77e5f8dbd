use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_REFRESH_SOON_DELAY_MS: u64 = 2000; // quiet refresh after a control action
pub const FIRST_POLL_ATTEMPTS: u32 = 3;
pub const DEFAULT_FIRST_POLL_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_EVENT_BUFFER: usize = 256;
pub const DEFAULT_REFRESH_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const BODY_PREVIEW_CHARS: usize = 200;

pub fn event_buffer() -> usize {
    std::env::var("LANECAST_EVENT_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_EVENT_BUFFER)
}

pub fn first_poll_retry_delay() -> Duration {
    std::env::var("LANECAST_FIRST_POLL_RETRY_DELAY_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(DEFAULT_FIRST_POLL_RETRY_DELAY_MS))
}

pub fn refresh_max_concurrency() -> usize {
    std::env::var("LANECAST_REFRESH_MAX_CONCURRENCY")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_REFRESH_MAX_CONCURRENCY)
}

pub fn http_timeout() -> Duration {
    std::env::var("LANECAST_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
}

pub fn connect_timeout() -> Duration {
    std::env::var("LANECAST_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
}
