mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use playmaker_api::config::{Config, Environment};
use playmaker_api::models::gravatar_url;
use serde_json::json;

#[tokio::test]
async fn sign_up_stores_a_hash_and_returns_the_full_view() {
        let app = TestApp::new();

        let (status, body) = app
                .request(
                        Method::POST,
                        "/v1/users",
                        None,
                        Some(json!({ "email": "  Ana@Club.com ", "password": "hunter22" })),
                )
                .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], json!("ana@club.com"));
        assert_eq!(body["display_name"], json!("ana"));
        assert_eq!(body["picture"], json!(gravatar_url("ana@club.com")));
        assert_eq!(body["role"], json!("athleta"));
        assert_eq!(body["user_id"], json!(1));
        assert!(body.get("password").is_none());

        let stored = app.users.all();
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].password, "hunter22");
        assert!(stored[0].password.starts_with("$argon2"));
}

#[tokio::test]
async fn stored_passwords_never_equal_the_plaintext() {
        let app = TestApp::new();

        for (i, password) in ["secret1", "123456", "p@ssw0rd!", "çãõ-ñ-ü"].iter().enumerate() {
                let user = app.create_user(&format!("user{}@club.com", i), password);
                assert_ne!(&user.password, password);
        }
}

#[tokio::test]
async fn sign_up_validates_and_rejects_duplicates() {
        let app = TestApp::new();
        app.create_user("ana@club.com", "secret1");

        let (status, _) = app
                .request(
                        Method::POST,
                        "/v1/users",
                        None,
                        Some(json!({ "email": "ANA@club.com", "password": "secret1" })),
                )
                .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
                .request(
                        Method::POST,
                        "/v1/users",
                        None,
                        Some(json!({ "email": "not-an-email", "password": "secret1" })),
                )
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
                .request(Method::POST, "/v1/users", None, Some(json!({ "email": "bia@club.com", "password": "123" })))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(app.users.all().len(), 1);
}

#[tokio::test]
async fn welcome_mail_is_only_sent_in_production() {
        let app = TestApp::new();
        app.create_user("ana@club.com", "secret1");
        assert!(app.mailer.sent().is_empty());

        let production = TestApp::with_config(Config {
                environment: Environment::Production,
                ..Config::for_tests()
        });
        production.create_user("bia@club.com", "secret1");

        let sent = production.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "bia@club.com");
        assert_eq!(sent[0].name, "bia");
}

#[tokio::test]
async fn me_returns_the_full_view_and_others_get_the_default_view() {
        let app = TestApp::new();
        let ana = app.create_user("ana@club.com", "secret1");
        let bia = app.create_user("bia@club.com", "secret1");
        let token = app.token(&ana);

        let (status, me) = app.request(Method::GET, "/v1/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        for key in ["email", "role", "activities"] {
                assert!(me.get(key).is_some(), "{} missing", key);
        }

        let (status, other) = app.request(Method::GET, &format!("/v1/users/{}", bia.id), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(other["display_name"], json!("bia"));
        for key in ["email", "role", "activities"] {
                assert!(other.get(key).is_none(), "{} leaked", key);
        }

        let (status, _) = app.request(Method::GET, "/v1/users/12345", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn updating_the_email_refreshes_a_gravatar_picture() {
        let app = TestApp::new();
        let ana = app.create_user("ana@club.com", "secret1");
        let token = app.token(&ana);

        let (status, body) = app
                .request(
                        Method::PUT,
                        "/v1/users/me",
                        Some(&token),
                        Some(json!({ "email": "ana.souza@club.com", "registration_ids": ["device-1"] })),
                )
                .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], json!("ana.souza@club.com"));
        assert_eq!(body["picture"], json!(gravatar_url("ana.souza@club.com")));
        assert_eq!(body["display_name"], json!("ana"));
        assert_eq!(body["registration_ids"], json!(["device-1"]));
}

#[tokio::test]
async fn custom_pictures_survive_email_changes() {
        let app = TestApp::new();
        let ana = app.create_user("ana@club.com", "secret1");
        let token = app.token(&ana);

        app.request(
                Method::PUT,
                "/v1/users/me",
                Some(&token),
                Some(json!({ "picture": "https://cdn.club.com/ana.png" })),
        )
        .await;
        let (_, body) = app
                .request(Method::PUT, "/v1/users/me", Some(&token), Some(json!({ "email": "ana2@club.com" })))
                .await;

        assert_eq!(body["picture"], json!("https://cdn.club.com/ana.png"));
}

#[tokio::test]
async fn password_change_rehashes() {
        let app = TestApp::new();
        let ana = app.create_user("ana@club.com", "secret1");
        let token = app.token(&ana);

        let (status, _) = app
                .request(Method::PUT, "/v1/users/me/password", Some(&token), Some(json!({ "password": "newsecret" })))
                .await;
        assert_eq!(status, StatusCode::OK);

        let stored = app.users.all().pop().unwrap();
        assert_ne!(stored.password, ana.password);
        assert_ne!(stored.password, "newsecret");
}

#[tokio::test]
async fn follow_and_unfollow() {
        let app = TestApp::new();
        let ana = app.create_user("ana@club.com", "secret1");
        let bia = app.create_user("bia@club.com", "secret1");
        let token = app.token(&ana);
        let uri = format!("/v1/users/{}/follow", bia.id);

        let (status, _) = app.request(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app.users.follows(ana.id, bia.id));

        let (status, _) = app.request(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!app.users.follows(ana.id, bia.id));

        let (status, _) = app
                .request(Method::POST, &format!("/v1/users/{}/follow", ana.id), Some(&token), None)
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_matches_every_keyword_against_email_or_display_name() {
        let app = TestApp::new();
        let ana = app.create_user("ana@club.com", "secret1");
        app.create_user("bia@club.com", "secret1");
        app.create_user("carla@other.org", "secret1");
        let token = app.token(&ana);

        let (status, body) = app.request(Method::GET, "/v1/users?q=CLUB", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(2));
        assert_eq!(body["rows"][0]["display_name"], json!("ana"));
        assert!(body["rows"][0].get("email").is_none());

        let (_, body) = app.request(Method::GET, "/v1/users?q=bia%20club", Some(&token), None).await;
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["rows"][0]["display_name"], json!("bia"));

        let (_, body) = app.request(Method::GET, "/v1/users?q=nobody", Some(&token), None).await;
        assert_eq!(body, json!({ "count": 0, "rows": [] }));

        let (_, body) = app.request(Method::GET, "/v1/users?limit=1&page=3", Some(&token), None).await;
        assert_eq!(body["count"], json!(3));
        assert_eq!(body["rows"][0]["display_name"], json!("carla"));
}

#[tokio::test]
async fn search_requires_a_bearer_token() {
        let app = TestApp::new();

        let (status, _) = app.request(Method::GET, "/v1/users?q=ana", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
        let app = TestApp::new();

        let (status, body) = app.request(Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "UP" }));
}
