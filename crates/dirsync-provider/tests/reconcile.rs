//! Integration tests for the reconciliation engine against a mock directory.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dirsync_client::models::EdgeOp;
use dirsync_client::{DirectoryClient, DirectoryConfig, RetryPolicy};
use dirsync_provider::{
    ApplyEngine, Association, AssociationKind, AssociationResource, GroupResource, GroupSpec,
    MembershipEdge, MembershipEdgeResource, MembershipFetcher, MembershipOp,
    MembershipReconciler, ProviderError, SyncTuning,
};

fn fast_tuning() -> SyncTuning {
    SyncTuning {
        worker_pool_size: 5,
        op_delay: Duration::ZERO,
        page_delay: Duration::ZERO,
        retry: RetryPolicy::new(3, Duration::ZERO),
    }
}

fn client_for(server: &MockServer) -> DirectoryClient {
    let config = DirectoryConfig::new(server.uri(), "test-api-key".into());
    DirectoryClient::new(&config).unwrap()
}

fn edge_page(prefix: &str, start: usize, count: usize) -> serde_json::Value {
    let edges: Vec<_> = (start..start + count)
        .map(|i| json!({"to": {"id": format!("{prefix}-{i}"), "type": "user_group"}}))
        .collect();
    serde_json::Value::Array(edges)
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(ToString::to_string).collect()
}

// ── Edge fetching ─────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_pages_until_short_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .and(query_param("skip", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(edge_page("grp", 100, 100)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .and(query_param("skip", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(edge_page("grp", 200, 37)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .respond_with(ResponseTemplate::new(200).set_body_json(edge_page("grp", 0, 100)))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = MembershipFetcher::new(client_for(&server), fast_tuning());
    let ids = fetcher.user_group_ids("usr-1").await.unwrap();
    assert_eq!(ids.len(), 237);
    assert!(ids.contains("grp-0"));
    assert!(ids.contains("grp-236"));
}

#[tokio::test]
async fn fetch_treats_missing_anchor_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/gone/memberof"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
        .mount(&server)
        .await;

    let fetcher = MembershipFetcher::new(client_for(&server), fast_tuning());
    let ids = fetcher.user_group_ids("gone").await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn fetch_aborts_when_list_never_ends() {
    let server = MockServer::start().await;
    // Every page is full, so the list never terminates.
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .respond_with(ResponseTemplate::new(200).set_body_json(edge_page("grp", 0, 100)))
        .mount(&server)
        .await;

    let fetcher = MembershipFetcher::new(client_for(&server), fast_tuning());
    match fetcher.user_group_ids("usr-1").await {
        Err(ProviderError::PageLimit { anchor }) => assert_eq!(anchor, "usr-1"),
        other => panic!("expected PageLimit, got {other:?}"),
    }
}

// ── Applying edge mutations ───────────────────────────────────────────

#[tokio::test]
async fn one_failing_op_never_stops_its_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-a/members"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-bad/members"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid member"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-c/members"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ApplyEngine::new(client_for(&server), fast_tuning());
    let ops = vec![
        MembershipOp {
            object_id: "grp-a".into(),
            label: None,
            action: EdgeOp::Add,
        },
        MembershipOp {
            object_id: "grp-bad".into(),
            label: Some("Broken".into()),
            action: EdgeOp::Add,
        },
        MembershipOp {
            object_id: "grp-c".into(),
            label: None,
            action: EdgeOp::Remove,
        },
    ];

    let failures = engine.sync_user_memberships("usr-1", ops).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].object_id, "grp-bad");
    assert!(failures[0].message.contains("invalid member"));
}

#[tokio::test]
async fn converged_edges_are_not_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-a/members"))
        .respond_with(ResponseTemplate::new(409).set_body_string("already a member"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-b/members"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such edge"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ApplyEngine::new(client_for(&server), fast_tuning());
    let ops = vec![
        MembershipOp {
            object_id: "grp-a".into(),
            label: None,
            action: EdgeOp::Add,
        },
        MembershipOp {
            object_id: "grp-b".into(),
            label: None,
            action: EdgeOp::Remove,
        },
    ];

    let failures = engine.sync_user_memberships("usr-1", ops).await;
    assert!(failures.is_empty());
}

// ── Resolution ────────────────────────────────────────────────────────

#[tokio::test]
async fn resolution_round_trips_names_through_ids() {
    let server = MockServer::start().await;
    for (name, id) in [("Engineering", "grp-1"), ("Support", "grp-2")] {
        Mock::given(method("GET"))
            .and(path("/usergroups"))
            .and(query_param("filter", format!("name:$eq:{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": id, "name": name}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/usergroups/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "name": name
            })))
            .mount(&server)
            .await;
    }

    let resolver = dirsync_provider::Resolver::new(client_for(&server), fast_tuning());
    let wanted = names(&["Engineering", "Support"]);

    let name_to_id = resolver.group_names_to_ids(&wanted).await.unwrap();
    let ids: BTreeSet<String> = name_to_id.values().cloned().collect();
    let id_to_name = resolver.group_ids_to_names(&ids).await.unwrap();

    let back: BTreeSet<String> = id_to_name.into_values().collect();
    assert_eq!(back, wanted);
}

#[tokio::test]
async fn ambiguous_partial_matches_are_refiltered_locally() {
    let server = MockServer::start().await;
    // The remote filter matches partially; only the exact name counts.
    Mock::given(method("GET"))
        .and(path("/usergroups"))
        .and(query_param("filter", "name:$eq:Eng"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "grp-1", "name": "Engineering"},
            {"id": "grp-2", "name": "Eng"}
        ])))
        .mount(&server)
        .await;

    let resolver = dirsync_provider::Resolver::new(client_for(&server), fast_tuning());
    let name_to_id = resolver.group_names_to_ids(&names(&["Eng"])).await.unwrap();
    assert_eq!(name_to_id["Eng"], "grp-2");
}

// ── Membership lifecycle ──────────────────────────────────────────────

#[tokio::test]
async fn create_resolves_converges_and_reads_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("filter", "email:$eq:a@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"_id": "usr-1", "email": "a@example.com"}],
            "totalCount": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups"))
        .and(query_param("filter", "name:$eq:Engineering"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "grp-1", "name": "Engineering"}
        ])))
        .mount(&server)
        .await;
    // No memberships before the edge mutation, one after.
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"to": {"id": "grp-1", "type": "user_group"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-1/members"))
        .and(body_json(json!({"op": "add", "type": "user", "id": "usr-1"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "grp-1",
            "name": "Engineering"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "usr-1",
            "email": "a@example.com"
        })))
        .mount(&server)
        .await;

    let reconciler = MembershipReconciler::new(client_for(&server), fast_tuning());
    let state = reconciler
        .create("a@example.com", &names(&["Engineering"]))
        .await
        .unwrap();

    assert_eq!(state.user_id, "usr-1");
    assert_eq!(state.user_email, "a@example.com");
    assert_eq!(state.groups, names(&["Engineering"]));
    assert_eq!(state.group_ids["Engineering"], "grp-1");
}

#[tokio::test]
async fn read_returns_none_for_vanished_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
        .mount(&server)
        .await;

    let reconciler = MembershipReconciler::new(client_for(&server), fast_tuning());
    assert!(reconciler.read("usr-1").await.unwrap().is_none());
}

#[tokio::test]
async fn update_fails_before_mutating_when_a_group_name_vanished() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usergroups"))
        .and(query_param("filter", "name:$eq:Old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups"))
        .and(query_param("filter", "name:$eq:New"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "grp-2", "name": "New"}
        ])))
        .mount(&server)
        .await;

    let reconciler = MembershipReconciler::new(client_for(&server), fast_tuning());
    let state = dirsync_provider::MembershipState {
        user_email: "a@example.com".into(),
        user_id: "usr-1".into(),
        groups: names(&["Old"]),
        group_ids: BTreeMap::from([("Old".to_string(), "grp-9".to_string())]),
    };

    match reconciler.update(&state, &names(&["New"])).await {
        Err(ProviderError::Resolution(messages)) => {
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("\"Old\" not found"));
        }
        other => panic!("expected Resolution error, got {other:?}"),
    }
    // No edge mutation was attempted.
    assert!(server.received_requests().await.unwrap().iter().all(|r| {
        r.method == wiremock::http::Method::GET
    }));
}

#[tokio::test]
async fn update_leaves_unmanaged_memberships_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usergroups"))
        .and(query_param("filter", "name:$eq:Alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "grp-a", "name": "Alpha"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups"))
        .and(query_param("filter", "name:$eq:Beta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "grp-b", "name": "Beta"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-b/members"))
        .and(body_json(json!({"op": "add", "type": "user", "id": "usr-1"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    // The remote also has grp-x, joined outside this resource.
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"to": {"id": "grp-a", "type": "user_group"}},
            {"to": {"id": "grp-b", "type": "user_group"}},
            {"to": {"id": "grp-x", "type": "user_group"}}
        ])))
        .mount(&server)
        .await;
    for (id, name) in [("grp-a", "Alpha"), ("grp-b", "Beta"), ("grp-x", "Unmanaged")] {
        Mock::given(method("GET"))
            .and(path(format!("/usergroups/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "name": name
            })))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/users/usr-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "usr-1",
            "email": "a@example.com"
        })))
        .mount(&server)
        .await;

    let reconciler = MembershipReconciler::new(client_for(&server), fast_tuning());
    let state = dirsync_provider::MembershipState {
        user_email: "a@example.com".into(),
        user_id: "usr-1".into(),
        groups: names(&["Alpha"]),
        group_ids: BTreeMap::from([("Alpha".to_string(), "grp-a".to_string())]),
    };

    let observed = reconciler
        .update(&state, &names(&["Alpha", "Beta"]))
        .await
        .unwrap();

    // Only the declared delta was applied; grp-x was never touched.
    let touched_unmanaged = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .any(|r| r.url.path() == "/usergroups/grp-x/members");
    assert!(!touched_unmanaged);
    assert_eq!(observed.groups, names(&["Alpha", "Beta", "Unmanaged"]));
}

#[tokio::test]
async fn delete_removes_every_current_membership() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"to": {"id": "grp-1", "type": "user_group"}},
            {"to": {"id": "grp-2", "type": "user_group"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-1/members"))
        .and(body_json(json!({"op": "remove", "type": "user", "id": "usr-1"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-2/members"))
        .and(body_json(json!({"op": "remove", "type": "user", "id": "usr-1"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let reconciler = MembershipReconciler::new(client_for(&server), fast_tuning());
    reconciler.delete("usr-1").await.unwrap();
}

#[tokio::test]
async fn delete_of_vanished_user_is_a_noop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/gone/memberof"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
        .mount(&server)
        .await;

    let reconciler = MembershipReconciler::new(client_for(&server), fast_tuning());
    reconciler.delete("gone").await.unwrap();
}

#[tokio::test]
async fn import_adopts_without_mutating() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("filter", "email:$eq:a@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"_id": "usr-1", "email": "a@example.com"}],
            "totalCount": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1/memberof"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"to": {"id": "grp-1", "type": "user_group"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "grp-1",
            "name": "Engineering"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "usr-1",
            "email": "a@example.com"
        })))
        .mount(&server)
        .await;

    let reconciler = MembershipReconciler::new(client_for(&server), fast_tuning());
    let state = reconciler.import("a@example.com").await.unwrap();
    assert_eq!(state.groups, names(&["Engineering"]));

    let posts = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method == wiremock::http::Method::POST)
        .count();
    assert_eq!(posts, 0);
}

// ── Group lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn group_create_converges_member_set() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/usergroups"))
        .and(body_json(json!({"name": "Engineering"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "grp-1",
            "name": "Engineering"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("filter", "email:$eq:a@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"_id": "usr-1", "email": "a@example.com"}],
            "totalCount": 1
        })))
        .mount(&server)
        .await;
    // Empty before the edge mutation, one member after.
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"to": {"id": "usr-1", "type": "user"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-1/members"))
        .and(body_json(json!({"op": "add", "type": "user", "id": "usr-1"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "grp-1",
            "name": "Engineering"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/usr-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "usr-1",
            "email": "a@example.com"
        })))
        .mount(&server)
        .await;

    let resource = GroupResource::new(client_for(&server), fast_tuning());
    let spec = GroupSpec {
        name: "Engineering".into(),
        description: None,
        members: names(&["a@example.com"]),
    };
    let state = resource.create(&spec).await.unwrap();

    assert_eq!(state.group_id, "grp-1");
    assert_eq!(state.members, names(&["a@example.com"]));
}

#[tokio::test]
async fn group_read_returns_none_when_gone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such group"))
        .mount(&server)
        .await;

    let resource = GroupResource::new(client_for(&server), fast_tuning());
    assert!(resource.read("grp-1").await.unwrap().is_none());
}

#[tokio::test]
async fn group_delete_tolerates_missing_group() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/usergroups/grp-1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such group"))
        .mount(&server)
        .await;

    let resource = GroupResource::new(client_for(&server), fast_tuning());
    resource.delete("grp-1").await.unwrap();
}

// ── Single membership edges ───────────────────────────────────────────

#[tokio::test]
async fn edge_create_tolerates_existing_membership() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-1/members"))
        .and(body_json(json!({"op": "add", "type": "user", "id": "usr-9"})))
        .respond_with(ResponseTemplate::new(409).set_body_string("already a member"))
        .expect(1)
        .mount(&server)
        .await;

    let resource = MembershipEdgeResource::new(client_for(&server), fast_tuning());
    let edge = MembershipEdge {
        group_id: "grp-1".into(),
        user_id: "usr-9".into(),
    };
    resource.create(&edge).await.unwrap();
}

#[tokio::test]
async fn edge_existence_is_checked_by_paging_members() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1/members"))
        .and(query_param("skip", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"to": {"id": "usr-extra", "type": "user"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(edge_page("usr", 0, 100)))
        .mount(&server)
        .await;

    let resource = MembershipEdgeResource::new(client_for(&server), fast_tuning());
    // Not on the first page; found only after paging past it.
    let present = MembershipEdge {
        group_id: "grp-1".into(),
        user_id: "usr-extra".into(),
    };
    let absent = MembershipEdge {
        group_id: "grp-1".into(),
        user_id: "usr-none".into(),
    };
    assert!(resource.exists(&present).await.unwrap());
    assert!(!resource.exists(&absent).await.unwrap());
}

#[tokio::test]
async fn edge_delete_tolerates_missing_membership() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-1/members"))
        .and(body_json(json!({"op": "remove", "type": "user", "id": "usr-9"})))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such member"))
        .expect(1)
        .mount(&server)
        .await;

    let resource = MembershipEdgeResource::new(client_for(&server), fast_tuning());
    let edge = MembershipEdge {
        group_id: "grp-1".into(),
        user_id: "usr-9".into(),
    };
    resource.delete(&edge).await.unwrap();
}

// ── Associations ──────────────────────────────────────────────────────

#[tokio::test]
async fn association_create_tolerates_existing_edge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-1/associations"))
        .and(body_json(json!({"op": "add", "type": "application", "id": "app-9"})))
        .respond_with(ResponseTemplate::new(409).set_body_string("already associated"))
        .expect(1)
        .mount(&server)
        .await;

    let resource = AssociationResource::new(client_for(&server), fast_tuning());
    let assoc = Association {
        group_id: "grp-1".into(),
        object_id: "app-9".into(),
        kind: AssociationKind::Application,
    };
    resource.create(&assoc).await.unwrap();
}

#[tokio::test]
async fn association_existence_is_checked_by_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usergroups/grp-1/associations"))
        .and(query_param("targets", "policy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"to": {"id": "pol-1", "type": "policy"}},
            {"to": {"id": "pol-2", "type": "policy"}}
        ])))
        .mount(&server)
        .await;

    let resource = AssociationResource::new(client_for(&server), fast_tuning());
    let present = Association {
        group_id: "grp-1".into(),
        object_id: "pol-2".into(),
        kind: AssociationKind::Policy,
    };
    let absent = Association {
        group_id: "grp-1".into(),
        object_id: "pol-9".into(),
        kind: AssociationKind::Policy,
    };
    assert!(resource.exists(&present).await.unwrap());
    assert!(!resource.exists(&absent).await.unwrap());
}

#[tokio::test]
async fn association_delete_tolerates_missing_edge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/usergroups/grp-1/associations"))
        .and(body_json(json!({"op": "remove", "type": "application", "id": "app-9"})))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such association"))
        .expect(1)
        .mount(&server)
        .await;

    let resource = AssociationResource::new(client_for(&server), fast_tuning());
    let assoc = Association {
        group_id: "grp-1".into(),
        object_id: "app-9".into(),
        kind: AssociationKind::Application,
    };
    resource.delete(&assoc).await.unwrap();
}
