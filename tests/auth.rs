use actix_web::{dev::Payload, test, FromRequest};
use serial_test::serial;
use std::env;
use veil::auth::{create_jwt, Actor, Auth, Claims, Role};
use veil::error::ServiceError;

// Helper that guarantees a sufficiently long secret for tests.
fn set_secret() {
    env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

#[actix_web::test]
#[serial]
async fn jwt_roundtrip_ok() {
    set_secret();
    let token = create_jwt(42, "tester", vec![Role::User]).expect("token");
    // The Auth extractor is the public way to validate, so use it here.
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert_eq!(auth.0.sub, "42");
    assert_eq!(auth.0.name, "tester");
    assert_eq!(auth.actor().unwrap(), Actor { id: 42, role: Role::User });
}

#[actix_web::test]
#[serial]
async fn extractor_rejects_invalid_token() {
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", "Bearer notatoken"))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());

    let req = test::TestRequest::default().to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err(), "missing header");
}

#[actix_web::test]
#[serial]
async fn token_signed_with_other_secret_is_rejected() {
    env::set_var("JWT_SECRET", "another-secret-that-is-32-bytes-long");
    let token = create_jwt(1, "mallory", vec![Role::Admin]).expect("token");
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[::core::prelude::v1::test]
fn actor_capabilities() {
    let admin = Auth(Claims { sub: "1".into(), name: "a".into(), exp: usize::MAX, roles: vec![Role::Admin] });
    let moderator = Auth(Claims { sub: "2".into(), name: "m".into(), exp: usize::MAX, roles: vec![Role::Moderator] });
    let user = Auth(Claims { sub: "3".into(), name: "u".into(), exp: usize::MAX, roles: vec![Role::User] });

    assert!(admin.actor().unwrap().require_admin().is_ok());
    assert!(moderator.actor().unwrap().require_staff().is_ok());
    assert!(matches!(moderator.actor().unwrap().require_admin(), Err(ServiceError::InsufficientRole)));
    assert!(matches!(user.actor().unwrap().require_staff(), Err(ServiceError::InsufficientRole)));
}

#[::core::prelude::v1::test]
fn non_numeric_subject_has_no_actor() {
    let stale = Auth(Claims { sub: "legacy:name".into(), name: "x".into(), exp: usize::MAX, roles: vec![Role::User] });
    assert!(stale.actor().is_err());
}
