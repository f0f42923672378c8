//! Log output and optional trace export.

use std::{env, io::IsTerminal};

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{
	SpanExporter, OTEL_EXPORTER_OTLP_ENDPOINT, OTEL_EXPORTER_OTLP_TRACES_ENDPOINT,
};
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const SERVICE_NAME: &str = "kubectl-doks";

/// Not exported by opentelemetry_sdk.
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

/// Flushes exported spans when dropped. Keep it alive until the command returns.
pub struct TelemetryGuard {
	tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
	fn drop(&mut self) {
		let Some(provider) = &self.tracer_provider else {
			return;
		};
		if let Err(e) = provider.shutdown() {
			eprintln!("Failed to flush traces: {e}");
		}
	}
}

/// The level used when neither `--log-level` nor `RUST_LOG` is given.
pub fn default_level(verbose: bool) -> Level {
	if verbose {
		Level::INFO
	} else {
		Level::WARN
	}
}

fn filter(log_level: Option<Level>, verbose: bool) -> EnvFilter {
	match log_level {
		Some(level) => EnvFilter::new(level.as_str()),
		None => EnvFilter::builder()
			.with_default_directive(default_level(verbose).into())
			.from_env_lossy(),
	}
}

/// Install the global subscriber.
///
/// `log_level` (from `--log-level`) wins over `RUST_LOG`, which wins over
/// [`default_level`]. Logs go to stderr, pretty on a terminal and JSON otherwise.
/// Spans are exported over OTLP/HTTP when an OTLP endpoint variable is set.
pub fn init(log_level: Option<Level>, verbose: bool) -> Result<TelemetryGuard> {
	let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
	let fmt_layer = if std::io::stderr().is_terminal() {
		fmt_layer.pretty().boxed()
	} else {
		fmt_layer.json().boxed()
	};

	let tracer_provider = otlp_endpoint_set().then(otlp_tracer_provider).transpose()?;
	let otel_layer = tracer_provider.as_ref().map(|provider| {
		tracing_opentelemetry::layer()
			.with_error_records_to_exceptions(true)
			.with_tracer(provider.tracer(SERVICE_NAME))
	});

	tracing_subscriber::registry()
		.with(filter(log_level, verbose))
		.with(fmt_layer)
		.with(otel_layer)
		.init();
	Ok(TelemetryGuard { tracer_provider })
}

fn otlp_endpoint_set() -> bool {
	[OTEL_EXPORTER_OTLP_ENDPOINT, OTEL_EXPORTER_OTLP_TRACES_ENDPOINT]
		.iter()
		.any(|var| env::var_os(var).is_some())
}

fn otlp_tracer_provider() -> Result<SdkTracerProvider> {
	// The builder reads OTEL_SERVICE_NAME itself; only fill in the name when it is unset.
	let mut resource = Resource::builder();
	if env::var_os(OTEL_SERVICE_NAME).is_none() {
		resource = resource.with_service_name(SERVICE_NAME);
	}
	let exporter = SpanExporter::builder().with_http().build()?;

	let provider = SdkTracerProvider::builder()
		.with_resource(resource.build())
		.with_batch_exporter(exporter)
		.build();
	opentelemetry::global::set_tracer_provider(provider.clone());
	Ok(provider)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_level() {
		assert_eq!(default_level(false), Level::WARN);
		assert_eq!(default_level(true), Level::INFO);
	}

	#[test]
	fn test_flag_overrides_verbose() {
		let filter = filter(Some(Level::DEBUG), false);
		assert_eq!(filter.max_level_hint(), Some(Level::DEBUG.into()));
	}
}
