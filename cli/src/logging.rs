//! Tracing initialisation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chainstream_core::config::LoggingConfig;

/// Build the filter directives: `"info,chainstream_poller=debug"` etc.
pub fn directives(config: &LoggingConfig) -> String {
    let mut components: Vec<_> = config.components.iter().collect();
    components.sort();
    std::iter::once(config.level.clone())
        .chain(
            components
                .into_iter()
                .map(|(component, level)| format!("{}={level}", component.replace('-', "_"))),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Call once, before the pipeline starts.
///
/// JSON output flattens event fields to the top level so `kind`, `subject`
/// and `sequence` can be filtered on directly.
pub fn init_tracing(config: &LoggingConfig) {
    let spec = directives(config);
    let filter = EnvFilter::try_new(&spec).unwrap_or_else(|e| {
        eprintln!("invalid log directives {spec:?} ({e}); falling back to info");
        EnvFilter::new("info")
    });
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
