pub mod clock;
pub mod jitter;

use crate::config::ExtractorConfig;

use clock::PosixClock;
use jitter::JitterExtractor;

/// Builds the production extractor described by `config`.
pub fn extractor(config: &ExtractorConfig) -> JitterExtractor<PosixClock> {
    let extractor = JitterExtractor::new(PosixClock::new(config.clock), config.width);
    match extractor.clock().resolution_ns() {
        Ok(res) => log::debug!(
            "clock {}: resolution {}ns, width {} ({} symbols)",
            config.clock.name(),
            res,
            config.width.name(),
            config.width.alphabet_size()
        ),
        Err(e) => log::warn!("clock {}: {}", config.clock.name(), e),
    }
    extractor
}
