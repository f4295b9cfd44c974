//! The assembled operations surface.
//!
//! [`RollcallService`] wires the injected platform and store into the
//! enforcer, the roster scanner, and the identity admin operations, and
//! exposes every call the command collaborator may make. Authorization
//! happens before a call lands here; nothing in this module checks
//! permissions.

use std::sync::Arc;

use rollcall_core::member::MemberProfile;
use rollcall_engine::{ComplianceEnforcer, MemberScanOutcome, RosterScanner, ScanSummary};
use rollcall_platform::ChatPlatform;
use rollcall_protocol::MemberId;
use rollcall_store::{IdentityRecord, IdentityStore};

use crate::bootstrap::ServiceConfig;
use crate::ops::{IdentityOps, OpsError};

/// Pre-authorized operations over one community space.
pub struct RollcallService {
    enforcer: Arc<ComplianceEnforcer>,
    scanner: RosterScanner,
    identity: IdentityOps,
}

impl RollcallService {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<dyn IdentityStore>,
        config: &ServiceConfig,
    ) -> Self {
        let enforcer = Arc::new(ComplianceEnforcer::new(
            platform,
            store.clone(),
            config.engine_config(),
        ));
        Self {
            scanner: RosterScanner::new(enforcer.clone()),
            identity: IdentityOps::new(store, config.wipe_confirmation_window),
            enforcer,
        }
    }

    /// The shared enforcer, for wiring the event dispatcher.
    pub fn enforcer(&self) -> Arc<ComplianceEnforcer> {
        self.enforcer.clone()
    }

    pub async fn add_or_update_identity(
        &self,
        profile: &MemberProfile,
        external_id: &str,
    ) -> Result<IdentityRecord, OpsError> {
        self.identity.add_or_update_identity(profile, external_id).await
    }

    pub async fn get_identity(
        &self,
        member_id: &MemberId,
    ) -> Result<Option<IdentityRecord>, OpsError> {
        self.identity.get_identity(member_id).await
    }

    pub async fn list_identities(&self) -> Result<Vec<IdentityRecord>, OpsError> {
        self.identity.list_identities().await
    }

    /// Arm the wipe gate; the caller must echo the phrase back within the
    /// configured window.
    pub fn request_wipe(&self) -> String {
        self.identity.request_wipe()
    }

    pub async fn confirm_wipe(&self, phrase: &str) -> Result<(), OpsError> {
        self.identity.confirm_wipe(phrase).await
    }

    /// Scan the full roster; waits for every triggered conversation.
    pub async fn scan_roster(&self, members: Vec<MemberProfile>) -> ScanSummary {
        self.scanner.scan(members).await
    }

    /// Scan one member and report where they landed.
    pub async fn scan_one_member(&self, profile: &MemberProfile) -> MemberScanOutcome {
        self.scanner.scan_member(profile).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::RollcallService;
    use crate::bootstrap::ServiceConfig;
    use rollcall_core::member::MemberProfile;
    use rollcall_engine::MemberScanOutcome;
    use rollcall_platform::MockPlatform;
    use rollcall_protocol::{MemberId, MemberKind};
    use rollcall_store::{IdentityStore, InMemoryIdentityStore};

    fn member(identifier: &str) -> MemberId {
        MemberId::new(MemberKind::Human, identifier).unwrap()
    }

    fn service(
        platform: Arc<MockPlatform>,
        store: Arc<InMemoryIdentityStore>,
    ) -> RollcallService {
        RollcallService::new(platform, store, &ServiceConfig::default())
    }

    #[tokio::test]
    async fn identity_surface_reads_and_writes_the_store() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let service = service(platform, store.clone());

        let profile = MemberProfile::new(member("alice")).with_display_name("Alice Jones");
        service
            .add_or_update_identity(&profile, "A771")
            .await
            .unwrap();

        let loaded = service.get_identity(&profile.id).await.unwrap().unwrap();
        assert_eq!(loaded.external_id, "A771");
        assert_eq!(service.list_identities().await.unwrap().len(), 1);

        let phrase = service.request_wipe();
        service.confirm_wipe(&phrase).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scan_surface_enforces_through_the_shared_enforcer() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let service = service(platform.clone(), store.clone());

        let bob = member("bob");
        platform.enqueue_replies(&bob, &["Bob", "Smith", "X123"]);
        let profile = MemberProfile::new(bob.clone())
            .with_display_name("bob")
            .with_role("Member");

        assert_eq!(
            service.scan_one_member(&profile).await,
            MemberScanOutcome::NonCompliant
        );
        assert!(store.lookup(&bob).await.unwrap().is_some());

        let rescanned = MemberProfile::new(bob)
            .with_display_name("Bob Smith")
            .with_role("Member");
        let summary = service.scan_roster(vec![rescanned]).await;
        assert_eq!(summary.total_scanned, 1);
        assert_eq!(summary.compliant_count, 1);
    }
}
