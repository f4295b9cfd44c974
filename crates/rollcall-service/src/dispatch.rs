//! Platform event dispatch.
//!
//! Events arrive on an `mpsc` channel from the transport adapter. Each is
//! handled on its own task so a long-running onboarding dialog never
//! blocks the queue; the dispatcher drains every in-flight task before
//! returning once the channel closes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use rollcall_engine::ComplianceEnforcer;
use rollcall_platform::PlatformEvent;

pub async fn run_dispatcher(
    enforcer: Arc<ComplianceEnforcer>,
    mut events: mpsc::Receiver<PlatformEvent>,
) {
    let mut in_flight = JoinSet::new();

    while let Some(event) = events.recv().await {
        let enforcer = enforcer.clone();
        in_flight.spawn(async move {
            match event {
                PlatformEvent::MemberJoined(profile) => {
                    let result = enforcer.handle_member_joined(&profile).await;
                    debug!(member = %profile.id, result = ?result, "join event handled");
                }
                PlatformEvent::RoleSetChanged { before, after } => {
                    let result = enforcer.handle_role_change(&before, &after).await;
                    debug!(member = %after.id, result = ?result, "role event handled");
                }
            }
        });

        // Reap whatever already finished so the set doesn't grow unbounded.
        while let Some(reaped) = in_flight.try_join_next() {
            if let Err(err) = reaped {
                error!(error = %err, "event handler task aborted");
            }
        }
    }

    while let Some(reaped) = in_flight.join_next().await {
        if let Err(err) = reaped {
            error!(error = %err, "event handler task aborted");
        }
    }
    info!("event channel closed; dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::run_dispatcher;
    use rollcall_core::member::MemberProfile;
    use rollcall_engine::{ComplianceEnforcer, EngineConfig};
    use rollcall_platform::{MockPlatform, PlatformEvent};
    use rollcall_protocol::{MemberId, MemberKind};
    use rollcall_store::{IdentityStore, InMemoryIdentityStore};
    use tokio::sync::mpsc;

    fn member(identifier: &str) -> MemberId {
        MemberId::new(MemberKind::Human, identifier).unwrap()
    }

    #[tokio::test]
    async fn join_events_drive_onboarding_to_completion() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let bob = member("bob");
        platform.enqueue_replies(&bob, &["Bob", "Smith", "X123"]);

        let enforcer = Arc::new(ComplianceEnforcer::new(
            platform.clone(),
            store.clone(),
            EngineConfig::default(),
        ));

        let (tx, rx) = mpsc::channel(8);
        let profile = MemberProfile::new(bob.clone()).with_display_name("bob");
        tx.send(PlatformEvent::MemberJoined(profile)).await.unwrap();
        drop(tx);

        run_dispatcher(enforcer, rx).await;

        assert!(store.lookup(&bob).await.unwrap().is_some());
        assert_eq!(platform.granted_roles().len(), 1);
    }

    #[tokio::test]
    async fn role_events_without_a_fresh_grant_do_nothing() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(InMemoryIdentityStore::new());
        let enforcer = Arc::new(ComplianceEnforcer::new(
            platform.clone(),
            store,
            EngineConfig::default(),
        ));

        let bob = member("bob");
        let before = MemberProfile::new(bob.clone())
            .with_display_name("bob")
            .with_role("Member");
        let after = MemberProfile::new(bob).with_display_name("bob");

        let (tx, rx) = mpsc::channel(8);
        tx.send(PlatformEvent::RoleSetChanged { before, after })
            .await
            .unwrap();
        drop(tx);

        run_dispatcher(enforcer, rx).await;

        assert!(platform.sent_messages().is_empty());
        assert!(platform.removed_roles().is_empty());
    }

    #[tokio::test]
    async fn dispatcher_drains_in_flight_work_before_returning() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(InMemoryIdentityStore::new());

        let members = ["bob", "dave", "erin"].map(member);
        for id in &members {
            platform.enqueue_replies(id, &["First", "Last", "ID"]);
        }

        let enforcer = Arc::new(ComplianceEnforcer::new(
            platform,
            store.clone(),
            EngineConfig::default(),
        ));

        let (tx, rx) = mpsc::channel(8);
        for id in &members {
            let profile = MemberProfile::new(id.clone()).with_display_name("nickname");
            tx.send(PlatformEvent::MemberJoined(profile)).await.unwrap();
        }
        drop(tx);

        run_dispatcher(enforcer, rx).await;

        for id in &members {
            assert!(store.lookup(id).await.unwrap().is_some());
        }
    }
}
