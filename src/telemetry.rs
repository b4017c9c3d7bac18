use std::sync::Mutex;
use std::time::Instant;

use once_cell::sync::Lazy;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use rocket::{
    Data, Orbit, Request, Response, Rocket,
    fairing::{Fairing, Info, Kind},
};
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tracing::{Span, info_span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";

static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

fn resource() -> Resource {
    let environment =
        std::env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, environment),
            ],
            SCHEMA_URL,
        )
        .build()
}

/// Parses `key=value,key2=value2` into gRPC metadata, skipping malformed pairs.
fn parse_headers(raw: &str) -> MetadataMap {
    let mut metadata = MetadataMap::new();

    for pair in raw.split(',') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = MetadataKey::from_bytes(key.trim().to_ascii_lowercase().as_bytes());
        let value = MetadataValue::try_from(value.trim());
        match (key, value) {
            (Ok(key), Ok(value)) => {
                metadata.insert(key, value);
            }
            _ => eprintln!("Ignoring malformed OTLP header entry"),
        }
    }

    metadata
}

fn init_tracer_provider(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let metadata = std::env::var(OTLP_HEADERS)
        .map(|raw| parse_headers(&raw))
        .unwrap_or_default();

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_protocol(Protocol::Grpc)
        .with_metadata(metadata);

    if endpoint.starts_with("https://") {
        builder =
            builder.with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots());
    }

    let exporter = builder.build()?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build())
}

/// Installs the global subscriber. Spans are exported over OTLP only when an
/// endpoint is configured; otherwise logs go to stdout alone.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = match std::env::var(OTLP_ENDPOINT) {
        Ok(endpoint) if !endpoint.is_empty() => match init_tracer_provider(&endpoint) {
            Ok(provider) => Some(provider),
            Err(err) => {
                eprintln!("OTLP exporter unavailable, tracing locally only: {}", err);
                None
            }
        },
        _ => None,
    };

    let otel_layer = provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer(env!("CARGO_PKG_NAME"))));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init();

    if installed.is_err() {
        return;
    }

    if let Some(tracer_provider) = provider {
        if let Ok(mut guard) = TELEMETRY_GUARD.lock() {
            *guard = Some(OtelGuard { tracer_provider });
        }
    }
}

pub fn shutdown_telemetry() {
    let guard = TELEMETRY_GUARD.lock().ok().and_then(|mut guard| guard.take());
    if guard.is_some() {
        tracing::info!("Flushing telemetry");
    }
    drop(guard);
}

/// Opens an `http_request` span per request and reports status and duration.
pub struct TelemetryFairing;

#[rocket::async_trait]
impl Fairing for TelemetryFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request telemetry",
            kind: Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let method = request.method().to_string();
        let uri = request.uri().path().to_string();

        let span = info_span!(
            "http_request",
            otel.name = format!("{} {}", method, uri),
            http.method = %method,
            http.uri = %uri,
            http.status_code = tracing::field::Empty,
            http.duration_ms = tracing::field::Empty,
        );

        request.local_cache(|| (span, Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let (span, started): &(Span, Instant) =
            request.local_cache(|| (info_span!("http_request"), Instant::now()));

        let elapsed = started.elapsed().as_millis() as i64;
        let status = response.status().code;

        span.record("http.status_code", status);
        span.record("http.duration_ms", elapsed);

        let _entered = span.enter();
        tracing::info!(status, duration_ms = elapsed, "Request completed");
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        shutdown_telemetry();
    }
}
