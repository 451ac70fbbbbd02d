//! Unit tests for gate crate
//! End-to-end scenarios over the use cases and the assembled router.

#[cfg(test)]
mod lockout_flow_tests {
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::application::{GateConfig, VerifyPasswordUseCase};
    use crate::domain::entity::audit_event::{AuditFilter, AuditKind};
    use crate::domain::repository::{AttemptRepository, AuditRepository, SessionRepository};
    use crate::domain::value_object::master_secret::MasterSecret;
    use crate::error::GateError;
    use crate::infra::MemoryGateStore;

    const PASSWORD: &str = "CorrectHorse9!";

    fn setup() -> (Arc<MemoryGateStore>, Arc<GateConfig>) {
        let config = GateConfig::new(MasterSecret::new(PASSWORD).unwrap());
        let store = MemoryGateStore::new(config.lockout, config.audit_capacity);
        (Arc::new(store), Arc::new(config))
    }

    fn verify_use_case(
        store: &Arc<MemoryGateStore>,
        config: &Arc<GateConfig>,
    ) -> VerifyPasswordUseCase<MemoryGateStore, MemoryGateStore, MemoryGateStore> {
        VerifyPasswordUseCase::new(store.clone(), store.clone(), store.clone(), config.clone())
    }

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_five_failures_lock_the_address() {
        let (store, config) = setup();
        let use_case = verify_use_case(&store, &config);
        let client = addr("10.0.0.5");

        for expected_remaining in (1..=4u32).rev() {
            match use_case.execute("wrong-guess", client).await {
                Err(GateError::InvalidPassword { remaining_attempts }) => {
                    assert_eq!(remaining_attempts, expected_remaining);
                }
                other => panic!("expected InvalidPassword, got {other:?}"),
            }
        }

        // Fifth failure crosses the threshold
        match use_case.execute("wrong-guess", client).await {
            Err(GateError::Locked { retry_after_ms }) => {
                assert!(retry_after_ms > 895_000 && retry_after_ms <= 900_000);
            }
            other => panic!("expected Locked, got {other:?}"),
        }

        let stats = store.attempt_stats().await.unwrap();
        assert_eq!(stats.locked, 1);

        // Four AUTH_FAILURE events then one LOCKOUT
        let failures = store
            .query(
                10,
                &AuditFilter {
                    kind: Some(AuditKind::AuthFailure),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(failures.len(), 4);
        let lockouts = store
            .query(
                10,
                &AuditFilter {
                    kind: Some(AuditKind::Lockout),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(lockouts.len(), 1);
    }

    #[tokio::test]
    async fn test_correct_password_rejected_while_locked() {
        let (store, config) = setup();
        let use_case = verify_use_case(&store, &config);
        let client = addr("10.0.0.5");

        for _ in 0..5 {
            let _ = use_case.execute("wrong-guess", client).await;
        }

        // Even the right password is refused before comparison
        assert!(matches!(
            use_case.execute(PASSWORD, client).await,
            Err(GateError::Locked { .. })
        ));
        assert_eq!(store.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lockout_is_per_address() {
        let (store, config) = setup();
        let use_case = verify_use_case(&store, &config);

        for _ in 0..5 {
            let _ = use_case.execute("wrong-guess", addr("10.0.0.5")).await;
        }

        // A different client is unaffected
        let output = use_case.execute(PASSWORD, addr("10.0.0.6")).await.unwrap();
        assert!(!output.session_token.is_empty());
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let (store, config) = setup();
        let use_case = verify_use_case(&store, &config);
        let client = addr("10.0.0.5");

        for _ in 0..3 {
            let _ = use_case.execute("wrong-guess", client).await;
        }
        use_case.execute(PASSWORD, client).await.unwrap();

        // Counter starts over: next failure reports a full window again
        match use_case.execute("wrong-guess", client).await {
            Err(GateError::InvalidPassword { remaining_attempts }) => {
                assert_eq!(remaining_attempts, 4);
            }
            other => panic!("expected InvalidPassword, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_manual_lock_blocks_and_unlock_restores() {
        let (store, config) = setup();
        let use_case = verify_use_case(&store, &config);
        let client = addr("10.0.0.5");

        store
            .manual_lock(client, Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(matches!(
            use_case.execute(PASSWORD, client).await,
            Err(GateError::Locked { .. })
        ));

        assert!(store.manual_unlock(client).await.unwrap());
        assert!(use_case.execute(PASSWORD, client).await.is_ok());
    }
}

#[cfg(test)]
mod session_flow_tests {
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::application::{
        GateConfig, LogoutUseCase, ValidateSessionUseCase, VerifyPasswordUseCase,
    };
    use crate::domain::entity::audit_event::{AuditFilter, AuditKind};
    use crate::domain::repository::AuditRepository;
    use crate::domain::value_object::master_secret::MasterSecret;
    use crate::error::GateError;
    use crate::infra::MemoryGateStore;

    const PASSWORD: &str = "CorrectHorse9!";

    fn setup(session_ttl: Duration) -> (Arc<MemoryGateStore>, Arc<GateConfig>) {
        let mut config = GateConfig::new(MasterSecret::new(PASSWORD).unwrap());
        config.session_ttl = session_ttl;
        let store = MemoryGateStore::new(config.lockout, config.audit_capacity);
        (Arc::new(store), Arc::new(config))
    }

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    async fn sign_in(
        store: &Arc<MemoryGateStore>,
        config: &Arc<GateConfig>,
        client: IpAddr,
    ) -> String {
        VerifyPasswordUseCase::new(store.clone(), store.clone(), store.clone(), config.clone())
            .execute(PASSWORD, client)
            .await
            .unwrap()
            .session_token
    }

    fn validator(
        store: &Arc<MemoryGateStore>,
        config: &Arc<GateConfig>,
    ) -> ValidateSessionUseCase<MemoryGateStore, MemoryGateStore> {
        ValidateSessionUseCase::new(store.clone(), store.clone(), config.clone())
    }

    #[tokio::test]
    async fn test_issued_token_validates_for_issuing_address() {
        let (store, config) = setup(Duration::from_secs(3600));
        let client = addr("10.0.0.9");

        let token = sign_in(&store, &config, client).await;
        let info = validator(&store, &config)
            .execute(&token, client)
            .await
            .unwrap();
        assert_eq!(info.issued_to, client);
        assert!(info.last_validated_at_ms >= info.issued_at_ms);
    }

    #[tokio::test]
    async fn test_token_rejected_from_other_address() {
        let (store, config) = setup(Duration::from_secs(3600));
        let token = sign_in(&store, &config, addr("10.0.0.9")).await;

        let result = validator(&store, &config)
            .execute(&token, addr("10.0.0.10"))
            .await;
        assert!(matches!(result, Err(GateError::SessionInvalid)));

        // Still valid from the issuing address afterwards
        assert!(
            validator(&store, &config)
                .execute(&token, addr("10.0.0.9"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let (store, config) = setup(Duration::from_millis(50));
        let client = addr("10.0.0.9");

        let token = sign_in(&store, &config, client).await;
        assert!(validator(&store, &config).execute(&token, client).await.is_ok());

        tokio::time::sleep(Duration::from_millis(100)).await;

        let result = validator(&store, &config).execute(&token, client).await;
        assert!(matches!(result, Err(GateError::SessionInvalid)));

        let events = store
            .query(
                1,
                &AuditFilter {
                    kind: Some(AuditKind::SessionInvalid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(events[0].detail["reason"], "EXPIRED");
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let (store, config) = setup(Duration::from_secs(3600));
        let client = addr("10.0.0.9");
        let token = sign_in(&store, &config, client).await;

        let logout = LogoutUseCase::new(store.clone(), store.clone(), config.clone());
        assert!(logout.execute(&token, client).await.unwrap());

        let result = validator(&store, &config).execute(&token, client).await;
        assert!(matches!(result, Err(GateError::SessionInvalid)));

        // A second logout of the same token removes nothing
        assert!(!logout.execute(&token, client).await.unwrap());
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let (store, config) = setup(Duration::from_secs(3600));
        let client = addr("10.0.0.9");
        let token = sign_in(&store, &config, client).await;

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

        let result = validator(&store, &config).execute(&tampered, client).await;
        assert!(matches!(result, Err(GateError::SessionInvalid)));

        let events = store
            .query(
                1,
                &AuditFilter {
                    kind: Some(AuditKind::SessionInvalid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(events[0].detail["reason"], "NOT_FOUND");
    }
}

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use platform::rate_limit::{MemoryRateLimitStore, RateLimitConfig};

    use crate::application::{AdminGate, GateConfig};
    use crate::domain::value_object::master_secret::MasterSecret;
    use crate::infra::MemoryGateStore;
    use crate::presentation::handlers::GateAppState;
    use crate::presentation::middleware;
    use crate::presentation::router::gate_router;

    const PASSWORD: &str = "CorrectHorse9!";
    const ADMIN_IP: &str = "127.0.0.1";
    const CLIENT_IP: &str = "10.0.0.5";

    fn test_config() -> GateConfig {
        GateConfig::new(MasterSecret::new(PASSWORD).unwrap())
    }

    fn app(config: GateConfig) -> Router {
        let store = MemoryGateStore::new(config.lockout, config.audit_capacity);
        gate_router(store, config)
    }

    fn post_json(uri: &str, ip: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str, ip: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = app(test_config());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["activeSessions"], 0);
    }

    #[tokio::test]
    async fn test_wrong_password_returns_401_with_remaining() {
        let app = app(test_config());

        let response = app
            .oneshot(post_json(
                "/verify-password",
                CLIENT_IP,
                serde_json::json!({ "password": "wrong-guess" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_PASSWORD");
        assert_eq!(body["remainingAttempts"], 4);
    }

    #[tokio::test]
    async fn test_empty_password_is_validation_error() {
        let app = app(test_config());

        let response = app
            .oneshot(post_json(
                "/verify-password",
                CLIENT_IP,
                serde_json::json!({ "password": "" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_full_session_round_trip() {
        let app = app(test_config());

        let response = app
            .clone()
            .oneshot(post_json(
                "/verify-password",
                CLIENT_IP,
                serde_json::json!({ "password": PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let token = body["sessionToken"].as_str().unwrap().to_string();
        assert!(body["expiresAtMs"].as_i64().unwrap() > 0);

        let response = app
            .clone()
            .oneshot(post_json(
                "/validate-session",
                CLIENT_IP,
                serde_json::json!({ "sessionToken": token }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["session"]["ip"], CLIENT_IP);

        // Same token from a different address is not valid
        let response = app
            .clone()
            .oneshot(post_json(
                "/validate-session",
                "10.0.0.99",
                serde_json::json!({ "sessionToken": token }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["valid"], false);

        let response = app
            .clone()
            .oneshot(post_json(
                "/logout",
                CLIENT_IP,
                serde_json::json!({ "sessionToken": token }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["loggedOut"], true);

        let response = app
            .oneshot(post_json(
                "/validate-session",
                CLIENT_IP,
                serde_json::json!({ "sessionToken": token }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["valid"], false);
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429_with_retry_after() {
        let mut config = test_config();
        config.rate_limit = RateLimitConfig::new(2, 60);
        let app = app(config);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/verify-password",
                    CLIENT_IP,
                    serde_json::json!({ "password": "wrong-guess" }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app
            .clone()
            .oneshot(post_json(
                "/verify-password",
                CLIENT_IP,
                serde_json::json!({ "password": "wrong-guess" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let body = body_json(response).await;
        assert_eq!(body["code"], "RATE_LIMITED");
        assert!(body["retryAfter"].as_u64().unwrap() <= 60);

        // Another address still has its own budget
        let response = app
            .oneshot(post_json(
                "/verify-password",
                "10.0.0.77",
                serde_json::json!({ "password": "wrong-guess" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_surface_denied_for_unknown_address() {
        let app = app(test_config());

        let response = app
            .clone()
            .oneshot(get_req("/stats", CLIENT_IP))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "ADMIN_DENIED");

        // The denial itself is an audit event, visible to an admin
        let response = app
            .oneshot(get_req("/security-events?type=ADMIN_DENIED", ADMIN_IP))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["events"][0]["ip"], CLIENT_IP);
    }

    #[tokio::test]
    async fn test_stats_for_admin() {
        let app = app(test_config());

        let _ = app
            .clone()
            .oneshot(post_json(
                "/verify-password",
                CLIENT_IP,
                serde_json::json!({ "password": PASSWORD }),
            ))
            .await
            .unwrap();

        let response = app.oneshot(get_req("/stats", ADMIN_IP)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["activeSessions"], 1);
        assert_eq!(body["eventsByKind"]["AUTH_SUCCESS"], 1);
    }

    #[tokio::test]
    async fn test_emergency_lock_and_unlock() {
        let app = app(test_config());

        let response = app
            .clone()
            .oneshot(post_json(
                "/emergency/lock-ip",
                ADMIN_IP,
                serde_json::json!({ "ip": CLIENT_IP, "reason": "incident response" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["lockedUntilMs"].as_i64().unwrap() > 0);

        // The locked client cannot authenticate, even correctly
        let response = app
            .clone()
            .oneshot(post_json(
                "/verify-password",
                CLIENT_IP,
                serde_json::json!({ "password": PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(response).await["code"], "LOCKED");

        let response = app
            .clone()
            .oneshot(post_json(
                "/emergency/unlock-ip",
                ADMIN_IP,
                serde_json::json!({ "ip": CLIENT_IP }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["wasLocked"], true);

        let response = app
            .oneshot(post_json(
                "/verify-password",
                CLIENT_IP,
                serde_json::json!({ "password": PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_security_events_rejects_bad_filters() {
        let app = app(test_config());

        let response = app
            .clone()
            .oneshot(get_req("/security-events?type=NOT_A_KIND", ADMIN_IP))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get_req("/security-events?ip=not-an-ip", ADMIN_IP))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_config_echo_has_no_secrets() {
        let app = app(test_config());

        let response = app.oneshot(get_req("/config", ADMIN_IP)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let raw = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!raw.contains(PASSWORD));

        let body: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(body["lockoutThreshold"], 5);
        assert_eq!(body["sessionTtlMs"], 24 * 3600 * 1000);
        assert_eq!(body["adminAddrCount"], 1);
    }

    fn protected_app(state: GateAppState<MemoryGateStore>) -> Router {
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(move |req, next| {
                middleware::require_session(state.clone(), req, next)
            }))
    }

    #[tokio::test]
    async fn test_bearer_guard_codes() {
        let config = test_config();
        let store = MemoryGateStore::new(config.lockout, config.audit_capacity);
        let state = GateAppState {
            repo: Arc::new(store),
            rate: MemoryRateLimitStore::new(),
            admin: Arc::new(AdminGate::default()),
            config: Arc::new(config),
        };

        // Mint a real session through the use case
        let token = crate::application::VerifyPasswordUseCase::new(
            state.repo.clone(),
            state.repo.clone(),
            state.repo.clone(),
            state.config.clone(),
        )
        .execute(PASSWORD, CLIENT_IP.parse().unwrap())
        .await
        .unwrap()
        .session_token;

        let app = protected_app(state);

        // No Authorization header
        let response = app
            .clone()
            .oneshot(get_req("/protected", CLIENT_IP))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "MISSING_TOKEN");

        // Garbage bearer token
        let mut request = get_req("/protected", CLIENT_IP);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            "Bearer not-a-token".parse().unwrap(),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");

        // Valid token from the issuing address passes through
        let mut request = get_req("/protected", CLIENT_IP);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Valid token from another address does not
        let mut request = get_req("/protected", "10.0.0.99");
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
    }
}

#[cfg(test)]
mod sweeper_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use platform::rate_limit::MemoryRateLimitStore;

    use crate::application::Sweeper;
    use crate::domain::entity::attempt_record::LockoutPolicy;
    use crate::domain::entity::session::Session;
    use crate::domain::repository::SessionRepository;
    use crate::infra::MemoryGateStore;

    #[tokio::test]
    async fn test_run_once_reclaims_expired_sessions() {
        let store = Arc::new(MemoryGateStore::new(LockoutPolicy::default(), 16));
        let live = Session::new(
            "live".into(),
            "10.0.0.1".parse().unwrap(),
            Duration::from_secs(3600),
        );
        let dead = Session::new("dead".into(), "10.0.0.1".parse().unwrap(), Duration::ZERO);
        store.create(&live).await.unwrap();
        store.create(&dead).await.unwrap();

        let sweeper = Sweeper::new(
            store.clone(),
            store.clone(),
            MemoryRateLimitStore::new(),
            Duration::from_secs(3600),
        );

        let report = sweeper.run_once().await;
        assert_eq!(report.sessions, 1);
        assert_eq!(store.session_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_spawned_loop_stops_on_shutdown() {
        let store = Arc::new(MemoryGateStore::new(LockoutPolicy::default(), 16));
        let sweeper = Sweeper::new(
            store.clone(),
            store,
            MemoryRateLimitStore::new(),
            Duration::from_secs(3600),
        );

        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = sweeper.spawn(Duration::from_millis(10), rx);

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop promptly")
            .unwrap();
    }
}
