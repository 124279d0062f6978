use super::WARP_SIZE;

/// Resolve a thread count override against the hardware bounds.
///
/// A non-positive `env` selects `default`. Invalid overrides are reported
/// and replaced with the nearest safe bound instead of failing.
pub fn resolve_num_threads(name: &str, env: i64, min: u32, max: u32, default: u32) -> u32 {
    if env <= 0 {
        return default;
    }
    if env % WARP_SIZE as i64 != 0 {
        log::warn!(
            "Invalid {} {} (must be a multiple of {})",
            name,
            env,
            WARP_SIZE
        );
        max
    } else if env > max as i64 {
        log::warn!("Invalid {} {} (maximum {}).", name, env, max);
        max
    } else if env < min as i64 {
        log::warn!("Invalid {} {} (minimum {}).", name, env, min);
        min
    } else {
        env as u32
    }
}
