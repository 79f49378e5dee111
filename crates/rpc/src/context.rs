//! Application context - wires together all components

use onbehalf_audit::AuditLedger;
use onbehalf_core::{Role, StaffIdentity, StaffRoster};
use onbehalf_engine::{
    ClaimDesk, EngineConfig, EngineError, EngineResult, PowerActionExecutor, ReviewQueue,
};
use onbehalf_store::{MemoryRepository, SqliteRepository, TargetRepository};
use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;

/// Application context holding the ledger, the target store and the services
/// built over them
pub struct AppContext {
    pub config: EngineConfig,
    pub ledger: Arc<AuditLedger>,
    pub repo: Arc<dyn TargetRepository>,
    pub roster: Option<Arc<StaffRoster>>,
    pub executor: PowerActionExecutor,
    pub reviews: ReviewQueue,
    pub desk: ClaimDesk,
}

impl AppContext {
    /// Open the on-disk ledger and store at the server's data paths
    pub fn open(
        server: &ServerConfig,
        config: EngineConfig,
        roster: Option<StaffRoster>,
    ) -> anyhow::Result<Self> {
        let ledger = Arc::new(AuditLedger::open(server.ledger_path(), config.ledger_policy())?);
        let repo: Arc<dyn TargetRepository> =
            Arc::new(SqliteRepository::new(server.state_db_path())?);

        Ok(Self::from_parts(ledger, repo, config, roster))
    }

    /// Build from server configuration (config and roster files included)
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let engine = config.load_engine_config()?;
        let roster = config.load_roster()?;
        if let Some(ref roster) = roster {
            info!(staff = roster.len(), "staff roster loaded");
        }
        Self::open(config, engine, roster)
    }

    /// Volatile context for tests and demos
    pub fn in_memory(config: EngineConfig, roster: Option<StaffRoster>) -> Self {
        let ledger = Arc::new(AuditLedger::in_memory(config.ledger_policy()));
        let repo: Arc<dyn TargetRepository> = Arc::new(MemoryRepository::new());
        Self::from_parts(ledger, repo, config, roster)
    }

    /// Wire the services over an already opened ledger and store
    pub fn from_parts(
        ledger: Arc<AuditLedger>,
        repo: Arc<dyn TargetRepository>,
        config: EngineConfig,
        roster: Option<StaffRoster>,
    ) -> Self {
        let roster = roster.map(Arc::new);

        let mut executor = PowerActionExecutor::new(ledger.clone(), repo.clone(), config.clone());
        if let Some(ref roster) = roster {
            executor = executor.with_roster(roster.clone());
        }
        let reviews = ReviewQueue::new(ledger.clone(), repo.clone(), config.clone());
        let desk = ClaimDesk::new(ledger.clone(), repo.clone(), config.clone());

        Self {
            config,
            ledger,
            repo,
            roster,
            executor,
            reviews,
            desk,
        }
    }

    /// Identity of the calling staff member.
    ///
    /// With a roster the id must be known and the claimed role must match the
    /// recorded one. Without a roster the claim is taken as given.
    pub fn resolve_staff(&self, staff_id: &str, claimed_role: Role) -> EngineResult<StaffIdentity> {
        if staff_id.trim().is_empty() {
            return Err(EngineError::validation("operatorId is required"));
        }

        match self.roster {
            Some(ref roster) => {
                let staff = roster.get(staff_id).ok_or_else(|| {
                    EngineError::authorization(format!("unknown staff member {staff_id}"))
                })?;
                if staff.role != claimed_role {
                    return Err(EngineError::authorization(format!(
                        "staff member {staff_id} does not hold role {claimed_role}"
                    )));
                }
                Ok(staff.clone())
            }
            None => Ok(StaffIdentity::anonymous(staff_id, claimed_role)),
        }
    }
}
