//! A single run against the persisted unit document: `before` loads and
//! seeds it, the phases mutate it, `after` persists it

use std::path::Path;

use tracing::info;

use crate::{
    config::EngineConfig,
    engine::{run_calls, run_deploy, run_upgrade, run_verify},
    errors::DeployError,
    placeholder::seed_units,
    provider::Provider,
    state::StateStore,
    types::{CallDocument, CallOutcome, DeployMode, EnvironmentKey, PhaseReport, UnitDocument},
};

/// The base name of the unit document
pub const UNIT_DOCUMENT_BASE: &str = ".data";

/// The base name of the call document
pub const CALL_DOCUMENT_BASE: &str = ".callData";

/// Query the provider for the environment key used to select state files
pub async fn environment_key<P: Provider + ?Sized>(
    provider: &P,
) -> Result<EnvironmentKey, DeployError> {
    provider
        .chain_id()
        .await
        .map(EnvironmentKey::Id)
        .map_err(|e| DeployError::Provider(e.to_string()))
}

/// An in-progress run over the unit document
pub struct Session<'a, P: Provider + ?Sized> {
    /// The provider every phase goes through
    provider: &'a P,
    /// The sole owner of the document's on-disk lifecycle
    store: StateStore,
    /// The document every phase mutates
    units: UnitDocument,
    /// Engine configuration
    config: EngineConfig,
}

impl<'a, P: Provider + ?Sized> Session<'a, P> {
    /// Load the unit document for the provider's environment from `data_dir`,
    /// falling back to `defaults`, and resolve placeholders for every unit
    /// already deployed
    pub async fn before(
        provider: &'a P,
        data_dir: &Path,
        defaults: UnitDocument,
        config: EngineConfig,
    ) -> Result<Session<'a, P>, DeployError> {
        let env = environment_key(provider).await?;
        let store = StateStore::for_environment(data_dir, UNIT_DOCUMENT_BASE, &env);

        Self::with_store(provider, store, defaults, config)
    }

    /// Open a session over an explicit store
    pub fn with_store(
        provider: &'a P,
        store: StateStore,
        defaults: UnitDocument,
        config: EngineConfig,
    ) -> Result<Session<'a, P>, DeployError> {
        let mut units = store.load(defaults)?;
        seed_units(&mut units);

        Ok(Session {
            provider,
            store,
            units,
            config,
        })
    }

    /// The current unit document
    pub fn units(&self) -> &UnitDocument {
        &self.units
    }

    /// The store backing this session
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run the deploy phase
    pub async fn deploy(&mut self, mode: DeployMode) -> Result<PhaseReport, DeployError> {
        run_deploy(self.provider, &mut self.units, mode, &self.config).await
    }

    /// Run the upgrade phase
    pub async fn upgrade(&mut self) -> PhaseReport {
        run_upgrade(self.provider, &mut self.units).await
    }

    /// Run the verify phase
    pub async fn verify(&mut self) -> PhaseReport {
        run_verify(self.provider, &mut self.units).await
    }

    /// Persist the document, returning it
    pub fn after(self) -> Result<UnitDocument, DeployError> {
        self.store.save(&self.units)?;
        Ok(self.units)
    }
}

/// Run the call document for the provider's environment from `data_dir`.
///
/// The unit document is read but not written; the call document is not
/// written either.
pub async fn run_call_document<P: Provider + ?Sized>(
    provider: &P,
    data_dir: &Path,
    defaults: CallDocument,
    config: EngineConfig,
) -> Result<Vec<CallOutcome>, DeployError> {
    let env = environment_key(provider).await?;
    let unit_store = StateStore::for_environment(data_dir, UNIT_DOCUMENT_BASE, &env);
    let call_store = StateStore::for_environment(data_dir, CALL_DOCUMENT_BASE, &env);

    let units: UnitDocument = unit_store.load(UnitDocument::new())?;
    let mut calls = call_store.load(defaults)?;
    info!("{} call(s) loaded", calls.len());

    run_calls(provider, &mut calls, &units, &config).await
}
