use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the default fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at info, or debug when
/// the `DEBUG` env toggle is on.
pub fn init_default_tracing(debug: bool) {
    let directives = if debug {
        "wingman=debug"
    } else {
        "wingman=info"
    };
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .parse(directives)
        .unwrap();
    let filter = match std::env::var("RUST_LOG") {
        Ok(custom) if !custom.is_empty() => EnvFilter::new(custom),
        _ => filter,
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE);

    Registry::default().with(filter).with(fmt_layer).init();
}
