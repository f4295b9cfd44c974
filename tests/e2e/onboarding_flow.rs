use std::sync::Arc;

use rollcall_core::member::MemberProfile;
use rollcall_engine::{
    ComplianceEnforcer, ConversationOutcome, Enforcement, EngineConfig, RosterScanner, ScanSummary,
};
use rollcall_platform::{ChatPlatform, MockPlatform, PlatformError};
use rollcall_protocol::{MemberId, MemberKind};
use rollcall_store::{IdentityRecord, IdentityStore, InMemoryIdentityStore};

fn member(identifier: &str) -> MemberId {
    MemberId::new(MemberKind::Human, identifier).expect("valid member id")
}

fn enforcer(platform: Arc<MockPlatform>, store: Arc<InMemoryIdentityStore>) -> ComplianceEnforcer {
    ComplianceEnforcer::new(platform, store, EngineConfig::default())
}

#[tokio::test]
async fn join_with_bad_nickname_runs_the_full_onboarding_dialog() {
    let platform = Arc::new(MockPlatform::new());
    let store = Arc::new(InMemoryIdentityStore::new());
    let bob = member("bob");
    platform.enqueue_replies(&bob, &["Bob", "Smith", "X123"]);

    let profile = MemberProfile::new(bob.clone())
        .with_display_name("bob")
        .with_role("Member");

    let result = enforcer(platform.clone(), store.clone())
        .handle_member_joined(&profile)
        .await;

    assert_eq!(
        result,
        Enforcement::Conversation(ConversationOutcome::Succeeded {
            role_restored: true
        })
    );

    // Demoted first, restored last.
    assert_eq!(platform.removed_roles().len(), 1);
    assert_eq!(platform.removed_roles()[0].role, "Member");
    assert_eq!(platform.granted_roles().len(), 1);
    assert_eq!(platform.granted_roles()[0].role, "Member");

    // Renamed to the collected two-token name.
    assert_eq!(platform.renames(), vec![(bob.clone(), "Bob Smith".to_string())]);

    // The record survives the conversation verbatim.
    let record = store.lookup(&bob).await.expect("lookup").expect("record");
    assert_eq!(record.first_name, "Bob");
    assert_eq!(record.last_name, "Smith");
    assert_eq!(record.external_id, "X123");

    // The member saw the reason, three prompts, and a confirmation.
    let channel = platform.open_private_channel(&bob).await.expect("channel");
    let texts = platform.texts_sent_to(&channel);
    assert!(texts[0].contains("Invalid nickname format"));
    assert!(texts.iter().any(|text| text.contains("First Name")));
    assert!(texts.iter().any(|text| text.contains("Last Name")));
    assert!(texts.iter().any(|text| text.contains("registration ID")));
    assert!(texts.last().expect("confirmation").contains("Thank you"));

    // Re-running against the fresh snapshot is a no-op.
    let now_compliant = MemberProfile::new(bob)
        .with_display_name("Bob Smith")
        .with_role("Member");
    let second = enforcer(platform.clone(), store)
        .handle_member_joined(&now_compliant)
        .await;
    assert_eq!(second, Enforcement::AlreadyCompliant);
}

#[tokio::test]
async fn silent_member_is_abandoned_and_stays_demoted() {
    let platform = Arc::new(MockPlatform::new());
    let store = Arc::new(InMemoryIdentityStore::new());
    let bob = member("bob");
    platform.enqueue_reply(&bob, Err(PlatformError::Timeout));

    let profile = MemberProfile::new(bob.clone())
        .with_display_name("bob")
        .with_role("Member");

    let result = enforcer(platform.clone(), store.clone())
        .handle_member_joined(&profile)
        .await;

    assert_eq!(
        result,
        Enforcement::Conversation(ConversationOutcome::Abandoned)
    );
    assert!(store.lookup(&bob).await.expect("lookup").is_none());
    assert_eq!(platform.removed_roles().len(), 1);
    assert!(platform.granted_roles().is_empty());

    let channel = platform.open_private_channel(&bob).await.expect("channel");
    let texts = platform.texts_sent_to(&channel);
    assert!(texts.last().expect("notice").contains("contact an admin"));
}

#[tokio::test]
async fn roster_scan_aggregates_the_mixed_membership() {
    let platform = Arc::new(MockPlatform::new());
    let store = Arc::new(InMemoryIdentityStore::new());

    // 10 members: 2 bots, 3 without the privileged role, the owner,
    // 2 compliant members, 2 non-compliant members.
    let mut roster = Vec::new();
    for identifier in ["keeper", "greeter"] {
        roster.push(
            MemberProfile::new(MemberId::new(MemberKind::Bot, identifier).expect("bot id"))
                .with_kind(MemberKind::Bot),
        );
    }
    for identifier in ["lurker1", "lurker2", "lurker3"] {
        roster.push(MemberProfile::new(member(identifier)).with_display_name("Quiet Lurker"));
    }
    roster.push(MemberProfile::new(member("founder")).as_owner());
    for (identifier, name) in [("alice", "Alice Jones"), ("carol", "Carol King")] {
        let id = member(identifier);
        store
            .upsert(IdentityRecord::new(id.clone(), "First", "Last", "ID"))
            .await
            .expect("seed record");
        roster.push(
            MemberProfile::new(id)
                .with_display_name(name)
                .with_role("Member"),
        );
    }
    for identifier in ["bob", "dave"] {
        let id = member(identifier);
        platform.enqueue_replies(&id, &["First", "Last", "ID"]);
        roster.push(
            MemberProfile::new(id)
                .with_display_name(identifier)
                .with_role("Member"),
        );
    }

    let scanner = RosterScanner::new(Arc::new(enforcer(platform.clone(), store.clone())));
    let summary = scanner.scan(roster).await;

    assert_eq!(
        summary,
        ScanSummary {
            total_scanned: 5,
            compliant_count: 3,
            non_compliant_count: 2,
        }
    );

    // Both non-compliant members finished onboarding before the scan
    // reported.
    for identifier in ["bob", "dave"] {
        assert!(store
            .lookup(&member(identifier))
            .await
            .expect("lookup")
            .is_some());
    }
}
