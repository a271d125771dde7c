use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Keeps the tracer provider alive; spans flush when it is shut down.
pub struct OtelGuard {
    provider: SdkTracerProvider,
}

/// Install the fmt subscriber plus an OTLP trace exporter.
///
/// Used instead of [`super::init_default_tracing`] when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is configured. Returns `None` (falling back
/// to plain fmt logging) when the exporter cannot be built.
pub fn init_otel_tracing(debug: bool, endpoint: &str) -> Option<OtelGuard> {
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint.to_string())
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("otel exporter unavailable ({e}), falling back to fmt logging");
            super::init_default_tracing(debug);
            return None;
        }
    };

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());

    let directives = if debug {
        "wingman=debug"
    } else {
        "wingman=info"
    };
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .parse(directives)
        .unwrap();

    let fmt_layer = fmt::layer().with_target(false);
    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer("wingman"));

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Some(OtelGuard { provider })
}

/// Flush and shut down the exporter pipeline.
pub fn shutdown_otel(guard: OtelGuard) {
    if let Err(e) = guard.provider.shutdown() {
        eprintln!("otel shutdown error: {e}");
    }
}
