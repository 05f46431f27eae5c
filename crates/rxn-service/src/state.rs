//! # Service Context
//!
//! Wires repositories, collaborators and configuration into the four
//! services. Services hold only `Arc`s and are cheap to clone; all state
//! lives in the store.

use std::sync::Arc;

use rxn_zkp::ZkVerifier;

use crate::config::ServiceConfig;
use crate::db::{self, PgStore};
use crate::error::ServiceError;
use crate::events::MembershipCommandHandler;
use crate::membership::MembershipService;
use crate::providers::{BlockHeightSource, FeedInfoProvider};
use crate::queries::ReactionQueryService;
use crate::reactions::{PipelineSettings, ReactionService};
use crate::store::{CommitmentRepository, MemoryStore, ReactionRepository, RootHistoryRepository};
use crate::telemetry;

/// A store implementing every repository.
pub trait ReactionStore:
    CommitmentRepository + RootHistoryRepository + ReactionRepository + 'static
{
}

impl<T> ReactionStore for T where
    T: CommitmentRepository + RootHistoryRepository + ReactionRepository + 'static
{
}

/// All services over one store.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub config: ServiceConfig,
    pub membership: MembershipService,
    pub events: MembershipCommandHandler,
    pub reactions: ReactionService,
    pub queries: ReactionQueryService,
}

impl ServiceContext {
    /// Build over an explicit store.
    pub fn with_store<S: ReactionStore>(
        config: ServiceConfig,
        store: Arc<S>,
        feeds: Arc<dyn FeedInfoProvider>,
        verifier: Arc<dyn ZkVerifier>,
        heights: Arc<dyn BlockHeightSource>,
    ) -> Self {
        telemetry::describe();
        let membership = MembershipService::new(store.clone(), store.clone(), heights.clone());
        let events = MembershipCommandHandler::new(membership.clone());
        let reactions = ReactionService::new(
            feeds,
            store.clone(),
            store.clone(),
            verifier,
            heights,
            PipelineSettings::from(&config),
        );
        let queries = ReactionQueryService::new(store);
        Self {
            config,
            membership,
            events,
            reactions,
            queries,
        }
    }

    /// Build over a fresh [`MemoryStore`].
    pub fn in_memory(
        config: ServiceConfig,
        feeds: Arc<dyn FeedInfoProvider>,
        verifier: Arc<dyn ZkVerifier>,
        heights: Arc<dyn BlockHeightSource>,
    ) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()), feeds, verifier, heights)
    }

    /// Build over Postgres when `config.database_url` is set, otherwise in
    /// memory.
    pub async fn connect(
        config: ServiceConfig,
        feeds: Arc<dyn FeedInfoProvider>,
        verifier: Arc<dyn ZkVerifier>,
        heights: Arc<dyn BlockHeightSource>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        match db::init_pool(&config).await? {
            Some(pool) => Ok(Self::with_store(
                config,
                Arc::new(PgStore::new(pool)),
                feeds,
                verifier,
                heights,
            )),
            None => Ok(Self::in_memory(config, feeds, verifier, heights)),
        }
    }
}
