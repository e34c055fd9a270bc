//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, history, opportunities, ready, skin, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Read API
        .route("/api/v1/status", get(status))
        .route("/api/v1/opportunities", get(opportunities))
        .route("/api/v1/skins/:name", get(skin))
        .route("/api/v1/skins/:name/history", get(history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use time::OffsetDateTime;
    use tower::ServiceExt;

    use crate::catalog::Resolver;
    use crate::config::Config;
    use crate::detector::Detector;
    use crate::marketplace::MarketplaceId;
    use crate::store::{PriceRecord, PriceStore};

    fn state() -> AppState {
        let config = Config::default();
        AppState::new(
            &config,
            Arc::new(PriceStore::new(10)),
            Arc::new(Detector::new(&config).unwrap()),
            Arc::new(Resolver::new()),
        )
        .unwrap()
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        assert_eq!(get_status(create_router(state()), "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_when_not_ready() {
        assert_eq!(
            get_status(create_router(state()), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_when_ready() {
        let state = state();
        state.set_ready(true);
        assert_eq!(get_status(create_router(state), "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn status_endpoint_returns_ok() {
        assert_eq!(
            get_status(create_router(state()), "/api/v1/status").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn opportunities_endpoint_returns_ok() {
        assert_eq!(
            get_status(create_router(state()), "/api/v1/opportunities").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn skin_endpoint_serves_stored_prices() {
        let state = state();
        state.store.upsert(PriceRecord {
            item_id: crate::catalog::ItemId("ak-47|redline|field-tested".to_string()),
            marketplace: MarketplaceId::CsFloat,
            price: 1_000,
            currency: "USD".to_string(),
            observed_at: OffsetDateTime::now_utc(),
            listing_count: 3,
            source_listing_ref: None,
        });

        let status = get_status(
            create_router(state),
            "/api/v1/skins/AK-47%20%7C%20Redline%20(Field-Tested)",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn skin_endpoint_rejects_unparseable_names() {
        let state = state();
        let status = get_status(create_router(state.clone()), "/api/v1/skins/garbage").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        // Ad-hoc queries never pollute the quarantine list.
        assert!(state.resolver.quarantined().is_empty());
    }

    #[tokio::test]
    async fn history_endpoint_requires_marketplace() {
        let status = get_status(
            create_router(state()),
            "/api/v1/skins/AK-47%20%7C%20Redline%20(Field-Tested)/history",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_endpoint_returns_ok_with_marketplace() {
        let status = get_status(
            create_router(state()),
            "/api/v1/skins/AK-47%20%7C%20Redline%20(Field-Tested)/history?marketplace=csfloat",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn history_endpoint_clamps_oversized_windows() {
        let state = state();
        state.store.upsert(PriceRecord {
            item_id: crate::catalog::ItemId("ak-47|redline|field-tested".to_string()),
            marketplace: MarketplaceId::CsFloat,
            price: 1_000,
            currency: "USD".to_string(),
            observed_at: OffsetDateTime::now_utc(),
            listing_count: 3,
            source_listing_ref: None,
        });

        // A window beyond i64 range means "everything", not an empty
        // response from a wrapped-around cutoff.
        let uri = format!(
            "/api/v1/skins/AK-47%20%7C%20Redline%20(Field-Tested)/history\
             ?marketplace=csfloat&since_secs={}",
            u64::MAX
        );
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(records.len(), 1);
    }
}
