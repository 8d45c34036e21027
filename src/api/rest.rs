use crate::api::error::{ApiError, ApiResult};
use crate::api::types::*;
use crate::api::AppState;
use crate::auth::Principal;
use crate::metrics::DEFAULT_ORIGIN;
use crate::record::ObjectRecord;
use crate::store::{ObjectKey, ObjectStore};
use crate::upload::{PinContent, UploadFile};
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{StreamExt, TryStreamExt};

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";
const DEFAULT_MEDIA_KIND: &str = "application/octet-stream";

pub struct RestApi {
    state: AppState,
}

impl RestApi {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .route("/api/v1/objects", get(list_objects).post(upload_object))
            .route(
                "/api/v1/objects/:cid",
                get(get_object).delete(delete_object),
            )
            .with_state(self.state.clone())
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<Principal> {
    state
        .auth
        .authenticate(headers)
        .ok_or(ApiError::Unauthorized)
}

async fn object_view(store: &ObjectStore, record: ObjectRecord) -> ApiResult<ObjectView> {
    let replicas = store.replicas(&record.object_id).await?;
    Ok(ObjectView {
        record,
        deals: DealsView::from_set(replicas),
    })
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(DEFAULT_ORIGIN);

    let served = state.metrics.get(host).await?;
    tracing::debug!(
        origin = state.metrics.origin_for(host),
        cache = served.status.as_str(),
        "Serving metrics"
    );

    Ok((
        [
            (header::CONTENT_TYPE, METRICS_CONTENT_TYPE.to_string()),
            (header::CACHE_CONTROL, state.metrics.policy().cache_control()),
            (
                header::HeaderName::from_static("x-cache"),
                served.status.as_str().to_string(),
            ),
        ],
        served.body.to_string(),
    )
        .into_response())
}

async fn list_objects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ListObjectsResponse>> {
    let principal = authenticate(&state, &headers)?;
    let concurrency = state.store.scan_config().fetch_concurrency.max(1);

    let records: Vec<ObjectRecord> = state.store.list_owner(&principal.owner).try_collect().await?;
    let objects: Vec<ObjectView> = futures::stream::iter(records)
        .map(|record| object_view(&state.store, record))
        .buffered(concurrency)
        .try_collect()
        .await?;
    let count = objects.len();

    Ok(Json(ListObjectsResponse { objects, count }))
}

async fn get_object(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cid): Path<String>,
) -> ApiResult<Json<ObjectView>> {
    let principal = authenticate(&state, &headers)?;
    let key = ObjectKey::new(principal.owner, cid.clone());
    key.validate()?;

    let (record, replicas) = tokio::try_join!(state.store.get(&key), state.store.replicas(&cid))?;
    let record = record.ok_or_else(|| ApiError::NotFound(cid))?;

    Ok(Json(ObjectView {
        record,
        deals: DealsView::from_set(replicas),
    }))
}

async fn delete_object(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cid): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    let principal = authenticate(&state, &headers)?;
    let key = ObjectKey::new(principal.owner, cid);
    state.store.delete(&key).await?;
    tracing::info!(key = %key, "Object removed");

    Ok(Json(SuccessResponse {
        message: format!("Object {} removed", key.object_id),
    }))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

async fn read_files(mut multipart: Multipart) -> ApiResult<Vec<UploadFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to read multipart field: {e}")))?
    {
        let name = field
            .file_name()
            .or_else(|| field.name())
            .unwrap_or("file")
            .to_string();
        let media_kind = field.content_type().unwrap_or(DEFAULT_MEDIA_KIND).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read file data: {e}")))?;

        files.push(UploadFile {
            name,
            media_kind,
            bytes,
        });
    }

    Ok(files)
}

async fn upload_object(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<(StatusCode, Json<ObjectView>)> {
    let headers = request.headers().clone();
    let principal = authenticate(&state, &headers)?;

    let content = if is_multipart(&headers) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        PinContent::Files(read_files(multipart).await?)
    } else {
        let media_kind = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .unwrap_or(DEFAULT_MEDIA_KIND)
            .to_string();
        let bytes = Bytes::from_request(request, &state)
            .await
            .map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        PinContent::Blob { bytes, media_kind }
    };

    let outcome = state
        .uploads
        .register(&principal.owner, Some(principal.credential), content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ObjectView {
            record: outcome.record,
            deals: DealsView {
                status: outcome.status,
                ..DealsView::pending()
            },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerTokenAuth;
    use crate::metrics::{CachePolicy, ExportConfig};
    use crate::record::{
        Network, ObjectPatch, OverallStatus, PinPatch, PinStatus, ReplicaRecord, ReplicaStatus,
    };
    use crate::store::{ScanConfig, Stores};
    use crate::upload::LocalPinning;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::Service;

    const TOKEN: &str = "Bearer secret";

    fn create_test_api() -> (RestApi, ObjectStore) {
        create_test_api_for("alice")
    }

    fn create_test_api_for(owner: &str) -> (RestApi, ObjectStore) {
        let store = ObjectStore::new(Stores::in_memory(), ScanConfig::default());
        let auth = BearerTokenAuth::new(HashMap::from([("secret".to_string(), owner.to_string())]));
        let state = AppState::new(
            store.clone(),
            Arc::new(LocalPinning),
            Arc::new(auth),
            ExportConfig::default(),
            CachePolicy::default(),
        );
        (RestApi::new(state), store)
    }

    async fn body_bytes(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    async fn upload(app: &mut Router, body: &'static str) -> ObjectView {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/objects")
            .header(header::AUTHORIZATION, TOKEN)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (api, _store) = create_test_api();
        let mut app = api.router();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_headers() {
        let (api, _store) = create_test_api();
        let mut app = api.router();

        let request = Request::builder()
            .uri("/metrics")
            .header(header::HOST, "abis.example")
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            METRICS_CONTENT_TYPE
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public,max-age=600,stale-while-revalidate=3600"
        );
        assert_eq!(response.headers()["x-cache"], "miss");

        let body = body_bytes(response).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("abistorage_users_total 0\n"));

        let request = Request::builder()
            .uri("/metrics")
            .header(header::HOST, "abis.example")
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.headers()["x-cache"], "fresh");
    }

    #[tokio::test]
    async fn test_unlisted_hosts_share_metrics_entry() {
        let (api, _store) = create_test_api();
        let state = api.state.clone().with_metrics_origins(vec!["abis.example".into()]);
        let mut app = RestApi::new(state).router();

        let mut served = Vec::new();
        for host in ["one.example", "two.example", "abis.example"] {
            let request = Request::builder()
                .uri("/metrics")
                .header(header::HOST, host)
                .body(Body::empty())
                .unwrap();
            let response = app.call(request).await.unwrap();
            served.push(response.headers()["x-cache"].to_str().unwrap().to_string());
        }

        assert_eq!(served, vec!["miss", "fresh", "miss"]);
    }

    #[tokio::test]
    async fn test_owner_routes_require_token() {
        let (api, _store) = create_test_api();
        let mut app = api.router();

        let request = Request::builder()
            .uri("/api/v1/objects")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_upload_then_get() {
        let (api, store) = create_test_api();
        let mut app = api.router();

        let uploaded = upload(&mut app, "{\"abi\":[]}").await;
        assert_eq!(uploaded.deals.status, OverallStatus::Ongoing);
        assert!(uploaded.deals.deals.is_empty());
        assert_eq!(uploaded.record.media_kind, "application/json");
        assert!(uploaded.record.scope.as_deref().unwrap().starts_with("token-"));

        let cid = uploaded.record.object_id.clone();
        let mut active = ReplicaRecord::queued(Network::Mainnet, "root", 0);
        active.node = Some("f01".into());
        active.status = ReplicaStatus::Active;
        store.put_replicas(&cid, &[active]).await.unwrap();

        let request = Request::builder()
            .uri(format!("/api/v1/objects/{cid}"))
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let view: ObjectView = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(view.record.object_id, cid);
        assert_eq!(view.deals.status, OverallStatus::Finalized);
        assert_eq!(view.deals.deals.len(), 1);
    }

    #[tokio::test]
    async fn test_owner_prefix_cannot_reach_other_owner() {
        let (api, store) = create_test_api_for("did:key");
        let mut app = api.router();

        let patch = ObjectPatch {
            size_bytes: Some(4),
            media_kind: Some("application/json".into()),
            pin: Some(PinPatch {
                status: Some(PinStatus::Pinned),
                ..Default::default()
            }),
            ..Default::default()
        };
        store
            .put(&ObjectKey::new("did:key:alice", "secretcid"), &patch)
            .await
            .unwrap();

        for method in ["GET", "DELETE"] {
            let request = Request::builder()
                .method(method)
                .uri("/api/v1/objects/alice:secretcid")
                .header(header::AUTHORIZATION, TOKEN)
                .body(Body::empty())
                .unwrap();
            let response = app.call(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method}");

            let error: ErrorResponse =
                serde_json::from_slice(&body_bytes(response).await).unwrap();
            assert_eq!(error.code, "INVALID_REQUEST");
        }

        let request = Request::builder()
            .uri("/api/v1/objects")
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        let list: ListObjectsResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(list.count, 0);

        let kept = store
            .get(&ObjectKey::new("did:key:alice", "secretcid"))
            .await
            .unwrap();
        assert!(kept.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let (api, _store) = create_test_api();
        let mut app = api.router();

        let request = Request::builder()
            .uri("/api/v1/objects/bafymissing")
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let (api, _store) = create_test_api();
        let mut app = api.router();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/objects")
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code, "EMPTY_PAYLOAD");
    }

    #[tokio::test]
    async fn test_multipart_upload_is_directory() {
        let (api, _store) = create_test_api();
        let mut app = api.router();

        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"Token.json\"\r\n\
            Content-Type: application/json\r\n\r\n\
            []\r\n\
            --XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"Vault.json\"\r\n\
            Content-Type: application/json\r\n\r\n\
            [{}]\r\n\
            --XBOUNDARY--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/objects")
            .header(header::AUTHORIZATION, TOKEN)
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let view: ObjectView = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(view.record.is_directory());
        assert_eq!(view.record.size_bytes, 6);
        let names: Vec<&str> = view.record.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Token.json", "Vault.json"]);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (api, _store) = create_test_api();
        let mut app = api.router();

        upload(&mut app, "{\"a\":1}").await;
        let second = upload(&mut app, "{\"b\":2}").await;

        let list_request = || {
            Request::builder()
                .uri("/api/v1/objects")
                .header(header::AUTHORIZATION, TOKEN)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.call(list_request()).await.unwrap();
        let list: ListObjectsResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(list.count, 2);
        assert!(list
            .objects
            .iter()
            .all(|o| o.deals.status == OverallStatus::Ongoing));

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/objects/{}", second.record.object_id))
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap();
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.call(list_request()).await.unwrap();
        let list: ListObjectsResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(list.count, 1);
    }
}
