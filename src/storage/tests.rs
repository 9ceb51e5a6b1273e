//! Storage Module Tests
//!
//! Validates the table abstraction and both of its implementations.
//!
//! ## Test Scopes
//! - **Model**: Filter rendering/matching and the entity wire form.
//! - **MemoryTableStore**: Table setup, key uniqueness (including under concurrency), queries.
//! - **Connection strings**: Endpoint and credential resolution, request signing.
//! - **HttpTableStore**: Exercised against an in-process fake of the table REST service.

#[cfg(test)]
mod tests {
    use crate::storage::connection::{ConnectionString, Credentials, shared_key_lite};
    use crate::storage::{
        Filter, HttpTableStore, MemoryTableStore, TableEntity, TableError, TableStore,
    };
    use axum::extract::{Extension, Path, Query};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const TEST_KEY: &str = "dGVzdC1hY2NvdW50LWtleS0xMjM0NTY3ODkw";

    fn badge_entity(user: &str, row: &str, badge: &str) -> TableEntity {
        TableEntity::new(user, row)
            .with("BadgeName", badge)
            .with("ChallengeId", "ch1")
    }

    // ============================================================
    // FILTER & ENTITY MODEL TESTS
    // ============================================================

    #[test]
    fn test_filter_renders_odata_conjunction() {
        let filter = Filter::all()
            .partition_key_eq("alice")
            .field_eq("BadgeName", "docker-basics");

        assert_eq!(
            filter.to_odata(),
            "PartitionKey eq 'alice' and BadgeName eq 'docker-basics'"
        );
        assert_eq!(filter.partition(), Some("alice"));
    }

    #[test]
    fn test_filter_escapes_single_quotes() {
        let filter = Filter::all().partition_key_eq("o'brien' or 'a' eq 'a");

        assert_eq!(
            filter.to_odata(),
            "PartitionKey eq 'o''brien'' or ''a'' eq ''a'"
        );
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::all();
        assert!(filter.is_empty());
        assert_eq!(filter.to_odata(), "");
        assert!(filter.matches(&badge_entity("bob", "r1", "x")));
    }

    #[test]
    fn test_filter_matches_keys_and_properties() {
        let entity = badge_entity("alice", "r1", "docker-basics");

        assert!(Filter::all().partition_key_eq("alice").matches(&entity));
        assert!(Filter::all().field_eq("RowKey", "r1").matches(&entity));
        assert!(
            !Filter::all()
                .partition_key_eq("alice")
                .field_eq("BadgeName", "other")
                .matches(&entity)
        );
        assert!(!Filter::all().field_eq("Missing", "x").matches(&entity));
    }

    #[test]
    fn test_entity_from_service_json_ignores_metadata() {
        let raw = json!({
            "odata.etag": "W/\"datetime'2026-10-19T10%3A00%3A00Z'\"",
            "PartitionKey": "alice",
            "RowKey": "r1",
            "BadgeName": "docker-basics",
            "Attempts": 3
        });

        let entity = TableEntity::from_json(&raw).unwrap();

        assert_eq!(entity.partition_key, "alice");
        assert_eq!(entity.row_key, "r1");
        assert_eq!(entity.field("BadgeName"), Some("docker-basics"));
        assert!(!entity.properties.contains_key("odata.etag"));
        assert!(!entity.properties.contains_key("Attempts"));
    }

    #[test]
    fn test_entity_without_keys_is_rejected() {
        assert!(TableEntity::from_json(&json!({"RowKey": "r1"})).is_none());
        assert!(TableEntity::from_json(&json!(["not", "an", "object"])).is_none());
    }

    #[test]
    fn test_entity_wire_form_is_flat() {
        let wire = badge_entity("alice", "r1", "docker-basics").to_json();

        assert_eq!(wire["PartitionKey"], "alice");
        assert_eq!(wire["RowKey"], "r1");
        assert_eq!(wire["BadgeName"], "docker-basics");
        assert_eq!(wire["ChallengeId"], "ch1");
    }

    // ============================================================
    // MEMORY TABLE STORE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_memory_create_table_is_conflict_on_second_call() {
        let store = MemoryTableStore::new();

        assert!(store.create_table("achievements").await.is_ok());
        assert!(matches!(
            store.create_table("achievements").await,
            Err(TableError::AlreadyExists)
        ));
        assert!(store.has_table("achievements"));
    }

    #[tokio::test]
    async fn test_memory_insert_into_missing_table_fails() {
        let store = MemoryTableStore::new();

        let result = store
            .insert_entity("nope", badge_entity("alice", "r1", "b"))
            .await;

        assert!(matches!(result, Err(TableError::TableNotFound(name)) if name == "nope"));
    }

    #[tokio::test]
    async fn test_memory_rejects_duplicate_primary_key() {
        let store = MemoryTableStore::new();
        store.create_table("t").await.unwrap();

        store
            .insert_entity("t", badge_entity("alice", "r1", "first"))
            .await
            .unwrap();
        let second = store
            .insert_entity("t", badge_entity("alice", "r1", "second"))
            .await;

        assert!(matches!(second, Err(TableError::AlreadyExists)));

        // Original row is untouched
        let rows = store.query_entities("t", &Filter::all()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field("BadgeName"), Some("first"));
    }

    #[tokio::test]
    async fn test_memory_same_row_key_in_different_partitions() {
        let store = MemoryTableStore::new();
        store.create_table("t").await.unwrap();

        store
            .insert_entity("t", badge_entity("alice", "r1", "b"))
            .await
            .unwrap();
        store
            .insert_entity("t", badge_entity("bob", "r1", "b"))
            .await
            .unwrap();

        assert_eq!(store.entity_count("t"), 2);
        assert_eq!(store.partition_count("t"), 2);
    }

    #[tokio::test]
    async fn test_memory_query_by_partition_and_property() {
        let store = MemoryTableStore::new();
        store.create_table("t").await.unwrap();
        for (user, row, badge) in [
            ("alice", "r1", "docker-basics"),
            ("alice", "r2", "volumes"),
            ("bob", "r3", "docker-basics"),
        ] {
            store
                .insert_entity("t", badge_entity(user, row, badge))
                .await
                .unwrap();
        }

        let alice = store
            .query_entities("t", &Filter::all().partition_key_eq("alice"))
            .await
            .unwrap();
        assert_eq!(alice.len(), 2);

        let basics = store
            .query_entities("t", &Filter::all().field_eq("BadgeName", "docker-basics"))
            .await
            .unwrap();
        assert_eq!(basics.len(), 2);

        let nobody = store
            .query_entities("t", &Filter::all().partition_key_eq("carol"))
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_memory_concurrent_inserts_have_single_winner() {
        let store = MemoryTableStore::new();
        store.create_table("t").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_entity("t", badge_entity("alice", "same-row", &format!("b{}", i)))
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(TableError::AlreadyExists) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.entity_count("t"), 1);
    }

    // ============================================================
    // CONNECTION STRING & SIGNING TESTS
    // ============================================================

    #[test]
    fn test_connection_string_with_account_key() {
        let parsed = ConnectionString::parse(&format!(
            "DefaultEndpointsProtocol=https;AccountName=acme;AccountKey={};EndpointSuffix=core.windows.net",
            TEST_KEY
        ))
        .unwrap();

        assert_eq!(parsed.account_name, "acme");
        assert_eq!(parsed.table_endpoint, "https://acme.table.core.windows.net");
        assert!(matches!(parsed.credentials, Credentials::SharedKey(ref key) if !key.is_empty()));
    }

    #[test]
    fn test_connection_string_defaults_protocol_and_suffix() {
        let parsed =
            ConnectionString::parse(&format!("AccountName=acme;AccountKey={};", TEST_KEY)).unwrap();

        assert_eq!(parsed.table_endpoint, "https://acme.table.core.windows.net");
    }

    #[test]
    fn test_connection_string_with_sas_and_explicit_endpoint() {
        let parsed = ConnectionString::parse(
            "AccountName=acme;TableEndpoint=https://tables.example.net/;SharedAccessSignature=?sv=2019-02-02&sig=abc%3D",
        )
        .unwrap();

        assert_eq!(parsed.table_endpoint, "https://tables.example.net");
        assert!(
            matches!(parsed.credentials, Credentials::Sas(ref sas) if sas == "sv=2019-02-02&sig=abc%3D")
        );
    }

    #[test]
    fn test_connection_string_development_storage() {
        let parsed = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();

        assert_eq!(parsed.account_name, "devstoreaccount1");
        assert_eq!(
            parsed.table_endpoint,
            "http://127.0.0.1:10002/devstoreaccount1"
        );
    }

    #[test]
    fn test_connection_string_rejects_incomplete_input() {
        assert!(matches!(
            ConnectionString::parse(&format!("AccountKey={}", TEST_KEY)),
            Err(TableError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionString::parse("AccountName=acme"),
            Err(TableError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionString::parse("AccountName=acme;AccountKey=***not-base64***"),
            Err(TableError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionString::parse("garbage"),
            Err(TableError::InvalidConnectionString(_))
        ));
    }

    #[test]
    fn test_shared_key_lite_signature_vector() {
        let dev = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        let Credentials::SharedKey(key) = dev.credentials else {
            panic!("development storage uses a shared key");
        };

        let header = shared_key_lite(
            "devstoreaccount1",
            &key,
            "Mon, 19 Oct 2026 12:00:00 GMT",
            "/devstoreaccount1/Tables",
        )
        .unwrap();

        assert_eq!(
            header,
            "SharedKeyLite devstoreaccount1:h7g29jtcRjF04xqagEc525pqC2gXl/7fbvaAUdY4n5I="
        );
    }

    // ============================================================
    // HTTP TABLE STORE TESTS (in-process fake service)
    // ============================================================

    const PAGE_SIZE: usize = 2;

    #[derive(Default)]
    struct FakeTableService {
        store: MemoryTableStore,
        filters: Mutex<Vec<String>>,
        authorizations: Mutex<Vec<String>>,
    }

    fn service_error(status: StatusCode, code: &str) -> Response {
        (
            status,
            Json(json!({
                "odata.error": {
                    "code": code,
                    "message": { "lang": "en-US", "value": format!("{} from fake service", code) }
                }
            })),
        )
            .into_response()
    }

    fn record_auth(service: &FakeTableService, headers: &HeaderMap) {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            service.authorizations.lock().unwrap().push(auth.to_string());
        }
    }

    async fn fake_create_table(
        Extension(service): Extension<Arc<FakeTableService>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        record_auth(&service, &headers);
        let name = body["TableName"].as_str().unwrap_or_default().to_string();
        if name == "retiring" {
            return service_error(StatusCode::CONFLICT, "TableBeingDeleted");
        }
        match service.store.create_table(&name).await {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(_) => service_error(StatusCode::CONFLICT, "TableAlreadyExists"),
        }
    }

    async fn fake_insert(
        Extension(service): Extension<Arc<FakeTableService>>,
        Path(table): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        record_auth(&service, &headers);
        let Some(entity) = TableEntity::from_json(&body) else {
            return service_error(StatusCode::BAD_REQUEST, "PropertiesNeedValue");
        };
        match service.store.insert_entity(&table, entity).await {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(TableError::AlreadyExists) => {
                service_error(StatusCode::CONFLICT, "EntityAlreadyExists")
            }
            Err(_) => service_error(StatusCode::NOT_FOUND, "TableNotFound"),
        }
    }

    /// Ignores the filter semantics (it only records them) and pages
    /// `PAGE_SIZE` entities at a time using the row index as continuation.
    async fn fake_query(
        Extension(service): Extension<Arc<FakeTableService>>,
        Path(resource): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let Some(table) = resource.strip_suffix("()") else {
            return service_error(StatusCode::BAD_REQUEST, "InvalidUri");
        };
        if table == "throttled" {
            return service_error(StatusCode::SERVICE_UNAVAILABLE, "ServerBusy");
        }
        if let Some(filter) = params.get("$filter") {
            service.filters.lock().unwrap().push(filter.clone());
        }

        let mut rows = match service.store.query_entities(table, &Filter::all()).await {
            Ok(rows) => rows,
            Err(_) => return service_error(StatusCode::NOT_FOUND, "TableNotFound"),
        };
        rows.sort_by(|a, b| (&a.partition_key, &a.row_key).cmp(&(&b.partition_key, &b.row_key)));

        let start: usize = params
            .get("NextPartitionKey")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let page: Vec<serde_json::Value> = rows
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .map(TableEntity::to_json)
            .collect();

        let mut response = Json(json!({ "value": page })).into_response();
        if start + PAGE_SIZE < rows.len() {
            let headers = response.headers_mut();
            headers.insert(
                "x-ms-continuation-nextpartitionkey",
                HeaderValue::from(start + PAGE_SIZE),
            );
            headers.insert(
                "x-ms-continuation-nextrowkey",
                HeaderValue::from_static("unused"),
            );
        }
        response
    }

    async fn spawn_fake_service() -> (String, Arc<FakeTableService>) {
        let service = Arc::new(FakeTableService::default());
        let app = Router::new()
            .route("/Tables", post(fake_create_table))
            .route("/:table", post(fake_insert).get(fake_query))
            .layer(Extension(service.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), service)
    }

    async fn connect(endpoint: &str) -> HttpTableStore {
        HttpTableStore::from_connection_string(&format!(
            "AccountName=testacct;AccountKey={};TableEndpoint={}",
            TEST_KEY, endpoint
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_http_create_table_maps_conflict() {
        let (endpoint, service) = spawn_fake_service().await;
        let store = connect(&endpoint).await;

        assert!(store.create_table("achievements").await.is_ok());
        assert!(matches!(
            store.create_table("achievements").await,
            Err(TableError::AlreadyExists)
        ));

        // Requests are signed with the account's shared key
        let auths = service.authorizations.lock().unwrap().clone();
        assert_eq!(auths.len(), 2);
        assert!(auths.iter().all(|a| a.starts_with("SharedKeyLite testacct:")));
    }

    #[tokio::test]
    async fn test_http_conflict_other_than_existing_is_status_error() {
        let (endpoint, _service) = spawn_fake_service().await;
        let store = connect(&endpoint).await;

        match store.create_table("retiring").await {
            Err(TableError::Status { status, code, .. }) => {
                assert_eq!(status, 409);
                assert_eq!(code, "TableBeingDeleted");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_insert_and_duplicate_insert() {
        let (endpoint, service) = spawn_fake_service().await;
        let store = connect(&endpoint).await;
        store.create_table("achievements").await.unwrap();

        store
            .insert_entity("achievements", badge_entity("alice", "r1", "docker-basics"))
            .await
            .unwrap();
        let duplicate = store
            .insert_entity("achievements", badge_entity("alice", "r1", "docker-basics"))
            .await;

        assert!(matches!(duplicate, Err(TableError::AlreadyExists)));
        assert_eq!(service.store.entity_count("achievements"), 1);
    }

    #[tokio::test]
    async fn test_http_insert_into_missing_table() {
        let (endpoint, _service) = spawn_fake_service().await;
        let store = connect(&endpoint).await;

        let result = store
            .insert_entity("missing", badge_entity("alice", "r1", "b"))
            .await;

        assert!(matches!(result, Err(TableError::TableNotFound(name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_http_query_follows_continuation_and_sends_filter() {
        let (endpoint, service) = spawn_fake_service().await;
        let store = connect(&endpoint).await;
        store.create_table("achievements").await.unwrap();
        for i in 0..5 {
            store
                .insert_entity(
                    "achievements",
                    badge_entity("alice", &format!("r{}", i), &format!("b{}", i)),
                )
                .await
                .unwrap();
        }

        let filter = Filter::all()
            .partition_key_eq("alice")
            .field_eq("BadgeName", "it's");
        let rows = store.query_entities("achievements", &filter).await.unwrap();

        // 5 rows over pages of 2: three requests, all carrying the same filter
        assert_eq!(rows.len(), 5);
        let filters = service.filters.lock().unwrap().clone();
        assert_eq!(filters.len(), 3);
        assert!(
            filters
                .iter()
                .all(|f| f == "PartitionKey eq 'alice' and BadgeName eq 'it''s'")
        );
    }

    #[tokio::test]
    async fn test_http_unfiltered_query_sends_no_filter() {
        let (endpoint, service) = spawn_fake_service().await;
        let store = connect(&endpoint).await;
        store.create_table("achievements").await.unwrap();

        let rows = store
            .query_entities("achievements", &Filter::all())
            .await
            .unwrap();

        assert!(rows.is_empty());
        assert!(service.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_service_error_is_propagated() {
        let (endpoint, _service) = spawn_fake_service().await;
        let store = connect(&endpoint).await;

        let result = store.query_entities("throttled", &Filter::all()).await;

        match result {
            Err(TableError::Status { status, code, .. }) => {
                assert_eq!(status, 503);
                assert_eq!(code, "ServerBusy");
            }
            other => panic!("expected status error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_http_unreachable_service_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = connect(&format!("http://{}", addr)).await;
        let result = store.create_table("achievements").await;

        assert!(matches!(result, Err(TableError::Transport(_))));
    }

    #[tokio::test]
    async fn test_http_request_timeout_is_transport_error() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let store = connect(&format!("http://{}", addr))
            .await
            .with_timeout(std::time::Duration::from_millis(200));
        let result = store.create_table("achievements").await;

        match result {
            Err(TableError::Transport(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
