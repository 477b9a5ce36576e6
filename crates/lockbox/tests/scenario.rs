//! End-to-end scenarios over both local backends.
//!
//! A user writes feedback records, shares the `feedback` type with an
//! agent, the agent reads them and replies with its own records, and the
//! user finally revokes access.

use lockbox::{Client, ErrorKind, PolicyRequest, RecordData};
use lockbox_testkit::TestNetwork;

async fn feedback_scenario(network: &TestNetwork) {
    let user = network.client().await.unwrap();
    let agent = network.client().await.unwrap();

    let first = user
        .write("feedback", RecordData::new().with("comment", "Great lunch!"))
        .await
        .unwrap();
    let second = user
        .write("feedback", RecordData::new().with("comment", "Too salty."))
        .await
        .unwrap();
    let private = user
        .write("diary", RecordData::new().with("entry", "private"))
        .await
        .unwrap();

    // The writer reads its own records at once.
    assert_eq!(
        user.read(&first).await.unwrap().field("comment"),
        Some("Great lunch!")
    );

    // Nothing shared yet.
    assert!(agent.list(10, 0, &[]).await.unwrap().is_empty());
    assert_eq!(
        agent.read(&first).await.unwrap_err().kind(),
        ErrorKind::AccessDenied
    );

    user.share(&agent.id(), "feedback").await.unwrap();

    let visible = agent.list(10, 0, &["feedback"]).await.unwrap();
    let ids: Vec<_> = visible.iter().map(|m| m.record_id).collect();
    assert_eq!(ids, vec![first, second]);

    let comments: Vec<String> = {
        let mut out = Vec::new();
        for meta in &visible {
            let record = agent.read(&meta.record_id).await.unwrap();
            assert_eq!(record.meta.writer_id, user.id());
            out.push(record.field("comment").unwrap_or_default().to_string());
        }
        out
    };
    assert_eq!(comments, vec!["Great lunch!", "Too salty."]);

    // The diary type was never shared.
    assert_eq!(
        agent.read(&private).await.unwrap_err().kind(),
        ErrorKind::AccessDenied
    );

    // The agent answers with a record of its own and shares it back.
    let thanks = agent
        .write(
            "lockbox_says_thanks",
            RecordData::new().with("message", "Thank you!"),
        )
        .await
        .unwrap();
    agent
        .share(&user.id(), "lockbox_says_thanks")
        .await
        .unwrap();
    assert_eq!(
        user.read(&thanks).await.unwrap().field("message"),
        Some("Thank you!")
    );

    // Revocation cuts off reads of old and new records alike.
    user.revoke(&agent.id(), "feedback").await.unwrap();
    let later = user
        .write("feedback", RecordData::new().with("comment", "Still here?"))
        .await
        .unwrap();
    for id in [first, second, later] {
        assert_eq!(
            agent.read(&id).await.unwrap_err().kind(),
            ErrorKind::AccessDenied
        );
    }
    assert!(agent.list(10, 0, &["feedback"]).await.unwrap().is_empty());
    assert!(user.revoke(&agent.id(), "feedback").await.unwrap().is_noop());
}

#[tokio::test]
async fn test_feedback_scenario_memory() {
    feedback_scenario(&TestNetwork::memory()).await;
}

#[tokio::test]
async fn test_feedback_scenario_sqlite() {
    feedback_scenario(&TestNetwork::sqlite().unwrap()).await;
}

#[tokio::test]
async fn test_list_filters_by_type_in_insertion_order() {
    let network = TestNetwork::memory();
    let client = network.client().await.unwrap();

    let mut feedback = Vec::new();
    let mut notes = Vec::new();
    for i in 0..5 {
        let data = RecordData::new().with("i", i.to_string());
        feedback.push(client.write("feedback", data.clone()).await.unwrap());
        notes.push(client.write("note", data).await.unwrap());
    }

    let ids = |metas: Vec<lockbox::Meta>| metas.into_iter().map(|m| m.record_id).collect::<Vec<_>>();

    assert_eq!(ids(client.list(10, 0, &["feedback"]).await.unwrap()), feedback);
    assert_eq!(ids(client.list(10, 0, &["note"]).await.unwrap()), notes);
    assert_eq!(client.list(100, 0, &[]).await.unwrap().len(), 10);
    assert_eq!(
        client.list(100, 0, &["feedback", "note"]).await.unwrap().len(),
        10
    );
    assert!(client.list(10, 0, &["absent"]).await.unwrap().is_empty());

    // Pages partition the listing.
    assert_eq!(ids(client.list(2, 0, &["feedback"]).await.unwrap()), feedback[0..2]);
    assert_eq!(ids(client.list(2, 2, &["feedback"]).await.unwrap()), feedback[2..4]);
    assert_eq!(ids(client.list(2, 4, &["feedback"]).await.unwrap()), feedback[4..]);
    assert!(client.list(2, 6, &["feedback"]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cursor_is_restartable() {
    let network = TestNetwork::memory();
    let client = network.client().await.unwrap();
    for i in 0..3 {
        client
            .write("feedback", RecordData::new().with("i", i.to_string()))
            .await
            .unwrap();
    }

    let mut cursor = client.cursor(&["feedback"]).unwrap();
    let first_pass = cursor.collect_all().await.unwrap();
    assert_eq!(first_pass.len(), 3);
    assert!(cursor.next().await.unwrap().is_none());

    cursor.restart();
    assert_eq!(cursor.collect_all().await.unwrap(), first_pass);
}

#[tokio::test]
async fn test_policy_state_machine_through_facade() {
    let network = TestNetwork::memory();
    let owner = network.client().await.unwrap();
    let reader = network.client().await.unwrap();
    let id = owner
        .write("feedback", RecordData::new().with("k", "v"))
        .await
        .unwrap();

    let record_type = lockbox::RecordType::new("feedback").unwrap();
    let allow = PolicyRequest::allow(owner.id(), owner.id(), reader.id(), record_type.clone());
    let deny = PolicyRequest::deny(owner.id(), owner.id(), reader.id(), record_type);

    // Deny on NoGrant is a no-op.
    assert!(owner.set_policy(&deny).await.unwrap().is_noop());

    assert!(!owner.set_policy(&allow).await.unwrap().is_noop());
    assert!(owner.set_policy(&allow).await.unwrap().is_noop());
    assert_eq!(reader.read(&id).await.unwrap().field("k"), Some("v"));

    assert!(!owner.set_policy(&deny).await.unwrap().is_noop());
    assert_eq!(
        reader.read(&id).await.unwrap_err().kind(),
        ErrorKind::AccessDenied
    );
}

#[tokio::test]
async fn test_authorize_reader_does_not_touch_other_types() {
    let network = TestNetwork::memory();
    let owner = network.client().await.unwrap();
    let reader = network.client().await.unwrap();

    let shared = owner.write("feedback", RecordData::new()).await.unwrap();
    let unshared = owner.write("medical", RecordData::new()).await.unwrap();

    let me = owner.id();
    owner
        .authorize_reader(&me, &me, &reader.id(), "feedback")
        .await
        .unwrap();

    assert!(reader.read(&shared).await.is_ok());
    assert_eq!(
        reader.read(&unshared).await.unwrap_err().kind(),
        ErrorKind::AccessDenied
    );
}

#[tokio::test]
async fn test_delete_is_writer_only() {
    let network = TestNetwork::memory();
    let owner = network.client().await.unwrap();
    let reader = network.client().await.unwrap();
    let id = owner.write("feedback", RecordData::new()).await.unwrap();
    owner.share(&reader.id(), "feedback").await.unwrap();

    assert_eq!(
        reader.delete(&id).await.unwrap_err().kind(),
        ErrorKind::AccessDenied
    );
    owner.delete(&id).await.unwrap();

    assert_eq!(owner.read(&id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(owner.try_read(&id).await.unwrap().is_none());
    assert_eq!(
        owner.delete(&id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_sqlite_survives_reconnect() {
    let network = TestNetwork::sqlite().unwrap();
    let config = network.register_config().await.unwrap();

    let id = {
        let client = Client::open(&config).await.unwrap();
        client
            .write("feedback", RecordData::new().with("comment", "persisted"))
            .await
            .unwrap()
    };

    let client = Client::open(&config).await.unwrap();
    assert_eq!(
        client.read(&id).await.unwrap().field("comment"),
        Some("persisted")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_writes_stay_readable() {
    let network = TestNetwork::sqlite().unwrap();
    let config = network.register_config().await.unwrap();

    // Two connections under one identity, as two processes would have.
    let first = Client::open(&config).await.unwrap();
    let second = Client::open(&config).await.unwrap();

    for i in 0..20 {
        let record_type = format!("feedback_{i}");
        let (a, b) = tokio::join!(
            first.write(&record_type, RecordData::new().with("from", "first")),
            second.write(&record_type, RecordData::new().with("from", "second")),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        for client in [&first, &second] {
            assert_eq!(client.read(&a).await.unwrap().field("from"), Some("first"));
            assert_eq!(client.read(&b).await.unwrap().field("from"), Some("second"));
        }
    }
}

#[tokio::test]
async fn test_concurrent_first_writes_from_clones() {
    let network = TestNetwork::memory();
    let client = network.client().await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .write("feedback", RecordData::new().with("i", i.to_string()))
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }
    for id in ids {
        assert!(client.read(&id).await.is_ok());
    }
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let network = TestNetwork::sqlite().unwrap();
    let mut config = network.register_config().await.unwrap();
    config.api_secret = "not-the-secret".to_string();

    let err = match Client::open(&config).await {
        Ok(_) => panic!("connected with a wrong secret"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), ErrorKind::Transport);
}
