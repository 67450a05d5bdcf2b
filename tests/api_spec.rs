use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use packman::api::{create_router, SharedPackman};
use packman::clock::{Clock, ManualClock, SystemClock};
use packman::db::Database;
use packman::engine::{ImportOutcome, MarkOutcome, Packman};
use packman::models::*;

const TRIP: &str = "Clothes\n  Shirts\n    Tee\n    Polo\n  Socks\nToiletries\n  Toothbrush\n";

fn shared(clock: Arc<dyn Clock>, delay: Duration) -> SharedPackman {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    Arc::new(Mutex::new(Packman::with_clock(db, clock, delay)))
}

/// Server whose marks apply immediately, loaded with `TRIP`.
async fn setup() -> TestServer {
    let server = TestServer::new(create_router(shared(Arc::new(SystemClock), Duration::ZERO)))
        .expect("Failed to create test server");
    server.post("/api/v1/import").text(TRIP).await.assert_status_ok();
    server
}

async fn view(server: &TestServer, name: &str) -> Vec<ViewEntry> {
    server
        .get(&format!("/api/v1/views/{}", name))
        .await
        .json::<Vec<ViewEntry>>()
}

fn names(entries: &[ViewEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup().await;
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
        response.assert_json(&serde_json::json!({ "status": "ok" }));
    }
}

mod views {
    use super::*;

    #[tokio::test]
    async fn returns_all_three_views_with_counts() {
        let server = setup().await;
        let model: ViewModel = server.get("/api/v1/views").await.json();

        assert_eq!(model.to_pack.len(), 7);
        assert!(model.packed.is_empty());
        assert!(model.not_needed.is_empty());
        assert_eq!(model.counts, Counts { to_pack: 7, packed: 0, not_needed: 0 });
        assert!(model.pending.is_none());
    }

    #[tokio::test]
    async fn returns_a_single_view_in_tree_order() {
        let server = setup().await;
        let entries = view(&server, "to-pack").await;

        assert_eq!(
            names(&entries),
            vec!["Clothes", "Shirts", "Tee", "Polo", "Socks", "Toiletries", "Toothbrush"]
        );
        assert_eq!(entries[2].depth, 2);
        assert!(entries[1].is_group);
        assert!(!entries[2].is_group);
    }

    #[tokio::test]
    async fn rejects_unknown_view_names() {
        let server = setup().await;
        let response = server.get("/api/v1/views/luggage").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod nodes {
    use super::*;

    #[tokio::test]
    async fn lists_nodes_in_document_order() {
        let server = setup().await;
        let nodes: Vec<Node> = server.get("/api/v1/nodes").await.json();

        assert_eq!(nodes.len(), 7);
        assert_eq!(nodes[0].id, "n:1");
        assert_eq!(nodes[2].parent_id.as_deref(), Some("n:2"));
    }

    #[tokio::test]
    async fn returns_node_detail() {
        let server = setup().await;
        let detail: NodeDetail = server.get("/api/v1/nodes/n:2").await.json();

        assert_eq!(detail.node.name, "Shirts");
        assert!(detail.is_group);
        assert_eq!(detail.status, Status::ToPack);
    }

    #[tokio::test]
    async fn returns_404_for_unknown_node() {
        let server = setup().await;
        let response = server.get("/api/v1/nodes/n:99").await;
        response.assert_status_not_found();
    }
}

mod import {
    use super::*;

    #[tokio::test]
    async fn replaces_the_list() {
        let server = setup().await;
        let response = server.post("/api/v1/import").text("Bag\n  Lock\n").await;

        response.assert_status_ok();
        assert_eq!(response.json::<ImportOutcome>(), ImportOutcome::Imported { nodes: 2 });
        assert_eq!(names(&view(&server, "to-pack").await), vec!["Bag", "Lock"]);
    }

    #[tokio::test]
    async fn rejects_text_without_items_and_keeps_the_list() {
        let server = setup().await;
        let response = server.post("/api/v1/import").text("\n   \n").await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<ImportOutcome>(), ImportOutcome::NoItemsFound);
        assert_eq!(view(&server, "to-pack").await.len(), 7);
    }

    #[tokio::test]
    async fn reset_restores_the_default_list() {
        let server = setup().await;
        let response = server.post("/api/v1/reset").await;

        response.assert_status_ok();
        let entries = view(&server, "to-pack").await;
        assert_eq!(entries[0].name, "Documents");
        assert_eq!(
            response.json::<ImportOutcome>(),
            ImportOutcome::Imported { nodes: server.get("/api/v1/nodes").await.json::<Vec<Node>>().len() }
        );
    }
}

mod items {
    use super::*;

    #[tokio::test]
    async fn packs_an_item() {
        let server = setup().await;
        let response = server.post("/api/v1/items/n:3/pack").await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<MarkOutcome>(),
            MarkOutcome::Applied { id: "n:3".to_string(), status: Status::Packed, changed: 1 }
        );
        assert_eq!(names(&view(&server, "packed").await), vec!["Clothes", "Shirts", "Tee"]);
    }

    #[tokio::test]
    async fn marks_an_item_not_needed_and_restores_it() {
        let server = setup().await;
        server.post("/api/v1/items/n:5/not-needed").await.assert_status_ok();
        assert_eq!(names(&view(&server, "not-needed").await), vec!["Clothes", "Socks"]);

        server.post("/api/v1/items/n:5/restore").await.assert_status_ok();
        assert!(view(&server, "not-needed").await.is_empty());
    }

    #[tokio::test]
    async fn returns_404_for_unknown_item() {
        let server = setup().await;
        let response = server.post("/api/v1/items/n:42/pack").await;

        response.assert_status_not_found();
        assert_eq!(
            response.json::<MarkOutcome>(),
            MarkOutcome::UnknownNode { id: "n:42".to_string() }
        );
    }

    #[tokio::test]
    async fn defers_marks_and_rejects_others_while_pending() {
        let clock = ManualClock::new();
        let server = TestServer::new(create_router(shared(
            Arc::new(clock.clone()),
            Duration::from_millis(350),
        )))
        .expect("Failed to create test server");
        server.post("/api/v1/import").text(TRIP).await.assert_status_ok();

        let response = server.post("/api/v1/items/n:3/pack").await;
        response.assert_status(StatusCode::ACCEPTED);
        assert!(matches!(response.json::<MarkOutcome>(), MarkOutcome::Scheduled { delay_ms: 350, .. }));

        let model: ViewModel = server.get("/api/v1/views").await.json();
        assert_eq!(model.pending.map(|p| p.id), Some("n:3".to_string()));

        let busy = server.post("/api/v1/items/n:4/pack").await;
        busy.assert_status(StatusCode::CONFLICT);
        assert_eq!(
            busy.json::<MarkOutcome>(),
            MarkOutcome::Busy { pending_id: "n:3".to_string() }
        );

        server.post("/api/v1/groups/n:6/pack").await.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn scheduled_mark_lands_and_frees_the_next_mark() {
        let server = TestServer::new(create_router(shared(
            Arc::new(SystemClock),
            Duration::from_millis(20),
        )))
        .expect("Failed to create test server");
        server.post("/api/v1/import").text(TRIP).await.assert_status_ok();

        server
            .post("/api/v1/items/n:3/pack")
            .await
            .assert_status(StatusCode::ACCEPTED);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let detail: NodeDetail = server.get("/api/v1/nodes/n:3").await.json();
        assert_eq!(detail.status, Status::Packed);
        let model: ViewModel = server.get("/api/v1/views").await.json();
        assert!(model.pending.is_none());

        server
            .post("/api/v1/items/n:4/pack")
            .await
            .assert_status(StatusCode::ACCEPTED);
    }
}

mod groups {
    use super::*;

    #[tokio::test]
    async fn packs_a_whole_subtree() {
        let server = setup().await;
        let response = server.post("/api/v1/groups/n:1/pack").await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<MarkOutcome>(),
            MarkOutcome::Applied { id: "n:1".to_string(), status: Status::Packed, changed: 5 }
        );
        assert_eq!(names(&view(&server, "to-pack").await), vec!["Toiletries", "Toothbrush"]);
    }

    #[tokio::test]
    async fn restores_a_group_without_touching_children() {
        let server = setup().await;
        server.post("/api/v1/groups/n:6/not-needed").await.assert_status_ok();
        server.post("/api/v1/groups/n:6/restore").await.assert_status_ok();

        let detail: NodeDetail = server.get("/api/v1/nodes/n:7").await.json();
        assert_eq!(detail.status, Status::NotNeeded);
        let group: NodeDetail = server.get("/api/v1/nodes/n:6").await.json();
        assert_eq!(group.status, Status::ToPack);
    }

    #[tokio::test]
    async fn returns_404_for_unknown_group() {
        let server = setup().await;
        server.post("/api/v1/groups/nope/restore").await.assert_status_not_found();
    }
}
