use std::{path::Path, sync::Arc, time::Duration};

use color_eyre::eyre;

use driftless_domain::Catalog;
use driftless_service::{DriftlessService, Providers};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DriftlessService>,
	/// Raises the per-request cancel flag once elapsed.
	pub request_timeout: Duration,
}
impl AppState {
	pub fn new(config: driftless_config::Config) -> color_eyre::Result<Self> {
		let providers = config
			.providers
			.as_ref()
			.map(Providers::http)
			.ok_or_else(|| eyre::eyre!("providers.cf and providers.semantic must be configured."))?;
		let catalog = match config.catalog.as_ref() {
			Some(source) => driftless_providers::catalog::load(Path::new(&source.path))?,
			None => {
				tracing::warn!("No catalog configured; candidates carry zero popularity and no tags.");

				Catalog::default()
			},
		};

		tracing::info!(items = catalog.len(), "Catalog loaded.");

		Ok(Self::from_service(DriftlessService::new(config, catalog, providers)))
	}

	pub fn from_service(service: DriftlessService) -> Self {
		let request_timeout = Duration::from_millis(service.cfg.service.request_timeout_ms);

		Self { service: Arc::new(service), request_timeout }
	}
}
