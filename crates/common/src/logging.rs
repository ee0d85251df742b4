use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Environment variable pointing at an OTLP collector, if any.
const OTLP_URL_ENVVAR: &str = "ZKPAY_OTLP_URL";

pub struct LoggerConfig {
    whoami: String,
    otlp_url: Option<String>,
}

impl LoggerConfig {
    pub fn with_base_name(whoami: &str) -> Self {
        Self {
            whoami: whoami.to_owned(),
            otlp_url: None,
        }
    }

    pub fn set_otlp_url(&mut self, url: String) {
        self.otlp_url = Some(url);
    }
}

pub fn get_otlp_url_from_env() -> Option<String> {
    std::env::var(OTLP_URL_ENVVAR).ok()
}

/// Initializes the logging subsystem with the provided config.
pub fn init(config: LoggerConfig) {
    let filt = tracing_subscriber::EnvFilter::from_default_env();

    // Stdout logging.
    let stdout_sub = tracing_subscriber::fmt::layer().compact().with_filter(filt);

    // OpenTelemetry output.
    if let Some(otlp_url) = &config.otlp_url {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(otlp_url);

        let tp = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .install_batch(opentelemetry_sdk::runtime::TokioCurrentThread)
            .expect("init: opentelemetry");

        let tt = tp.tracer("zkpay-log");

        let otel_sub = tracing_opentelemetry::layer().with_tracer(tt);

        tracing_subscriber::registry()
            .with(stdout_sub)
            .with(otel_sub)
            .init();
    } else {
        tracing_subscriber::registry().with(stdout_sub).init();
    }

    info!(whoami = %config.whoami, "logging started");
}

/// Shuts down the logging subsystem, flushing any pending export batches.
pub fn finalize() {
    info!("shutting down logging");
}
