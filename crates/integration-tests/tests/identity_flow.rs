//! Account lifecycle through the services, over in-memory adapters.

use domains::{AppError, CredentialStore, OtpCode, OtpLedger, Registration, Role, UserPatch};
use integration_tests::{png_upload, TestApp};
use services::PolicyConfig;

fn user_registration(name: &str, email: &str) -> Registration {
    Registration {
        role: Some("user".into()),
        name: Some(name.into()),
        email: Some(email.into()),
        password: Some("password123".into()),
        description: None,
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.register(Role::User, "alice", "alice@example.org").await;

    let err = app
        .identity
        .register(user_registration("alice2", "alice@example.org"), None)
        .await
        .unwrap_err();

    assert_eq!(err, AppError::Conflict("Email already exists.".into()));
    assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn concurrent_registrations_for_one_email_yield_one_account() {
    let app = TestApp::new();

    let (a, b) = tokio::join!(
        app.identity.register(user_registration("first", "race@example.org"), None),
        app.identity.register(user_registration("second", "race@example.org"), None),
    );

    assert!(a.is_ok() ^ b.is_ok());
    assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn organization_proof_is_stored_on_disk() {
    let app = TestApp::new();

    let session = app.register(Role::Organization, "helpers", "org@example.org").await;

    let proof = session.user.proof_image.expect("organizations keep their proof");
    assert!(proof.starts_with("/media/"));
    assert!(app.media.path().join(proof.trim_start_matches("/media/")).exists());
    assert_eq!(session.user.description.as_deref(), Some("helpers helps people"));
}

#[tokio::test]
async fn organization_without_proof_is_rejected() {
    let app = TestApp::new();
    let registration = Registration {
        role: Some("organization".into()),
        name: Some("helpers".into()),
        email: Some("org@example.org".into()),
        password: Some("password123".into()),
        description: Some("we help".into()),
    };

    let err = app.identity.register(registration, None).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(app.users.is_empty());
}

#[tokio::test]
async fn plain_user_never_keeps_organization_fields() {
    let app = TestApp::new();
    let mut registration = user_registration("bob", "bob@example.org");
    registration.description = Some("sneaky".into());

    let session = app.identity.register(registration, Some(png_upload())).await.unwrap();

    assert_eq!(session.user.description, None);
    assert_eq!(session.user.proof_image, None);
}

#[tokio::test]
async fn login_issues_a_token_for_the_account() {
    let app = TestApp::new();
    let registered = app.register(Role::User, "carol", "carol@example.org").await;

    let session = app.identity.login("carol@example.org", "password123").await.unwrap();

    let actor = app.credentials.verify_token(&session.token).unwrap();
    assert_eq!(actor.id, registered.user.id);
    assert_eq!(actor.role, Role::User);
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let app = TestApp::new();
    app.register(Role::User, "dave", "dave@example.org").await;

    let wrong_password = app.identity.login("dave@example.org", "nope").await.unwrap_err();
    let unknown_email = app.identity.login("ghost@example.org", "nope").await.unwrap_err();

    assert_eq!(wrong_password, unknown_email);
    assert!(matches!(wrong_password, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn password_reset_round_trip() {
    let app = TestApp::new();
    app.register(Role::User, "erin", "erin@example.org").await;

    app.identity.forgot_password("erin@example.org").await.unwrap();
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Password Reset OTP");
    let code = app.mailer.last_code_for("erin@example.org").unwrap();
    assert_eq!(code.len(), 6);

    app.identity
        .reset_password("erin@example.org", &code, "new-password")
        .await
        .unwrap();

    assert!(app.identity.login("erin@example.org", "new-password").await.is_ok());
    assert!(app.identity.login("erin@example.org", "password123").await.is_err());

    // single use
    let err = app
        .identity
        .reset_password("erin@example.org", &code, "third-password")
        .await
        .unwrap_err();
    assert_eq!(err, AppError::InvalidOrExpiredOtp);
}

#[tokio::test]
async fn surrounding_whitespace_in_the_email_is_ignored() {
    let app = TestApp::new();
    let session = app
        .identity
        .register(user_registration("hal", " hal@example.org "), None)
        .await
        .unwrap();
    assert_eq!(session.user.email, "hal@example.org");

    assert!(app.identity.login("hal@example.org", "password123").await.is_ok());
    assert!(app.identity.login(" hal@example.org ", "password123").await.is_ok());

    app.identity.forgot_password(" hal@example.org").await.unwrap();
    let code = app.mailer.last_code_for("hal@example.org").unwrap();
    app.identity
        .reset_password("hal@example.org ", &code, "new-password")
        .await
        .unwrap();
    assert!(app.identity.login(" hal@example.org ", "new-password").await.is_ok());
}

#[tokio::test]
async fn wrong_code_does_not_burn_the_pending_one() {
    let app = TestApp::new();
    app.register(Role::User, "frank", "frank@example.org").await;
    app.identity.forgot_password("frank@example.org").await.unwrap();
    let code = app.mailer.last_code_for("frank@example.org").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let err = app
        .identity
        .reset_password("frank@example.org", wrong, "x-password")
        .await
        .unwrap_err();
    assert_eq!(err, AppError::InvalidOrExpiredOtp);

    app.identity
        .reset_password("frank@example.org", &code, "x-password")
        .await
        .unwrap();
}

#[tokio::test]
async fn expired_code_is_refused() {
    let app = TestApp::with_otp_ttl(chrono::Duration::zero());
    app.register(Role::User, "gina", "gina@example.org").await;
    app.identity.forgot_password("gina@example.org").await.unwrap();
    let code = app.mailer.last_code_for("gina@example.org").unwrap();

    let err = app
        .identity
        .reset_password("gina@example.org", &code, "late-password")
        .await
        .unwrap_err();

    assert_eq!(err, AppError::InvalidOrExpiredOtp);
    assert!(app.identity.login("gina@example.org", "password123").await.is_ok());
}

#[tokio::test]
async fn new_code_replaces_the_previous_one() {
    let app = TestApp::new();
    app.register(Role::User, "hank", "hank@example.org").await;

    let first = app.otp.issue("hank@example.org").await.unwrap();
    let second = app.otp.issue("hank@example.org").await.unwrap();

    if first != second {
        assert!(!app.otp.consume("hank@example.org", &first).await.unwrap());
    }
    assert!(app.otp.consume("hank@example.org", &second).await.unwrap());
    assert!(!app
        .otp
        .consume("hank@example.org", &OtpCode::from_input(second.as_str()))
        .await
        .unwrap());
}

#[tokio::test]
async fn forgot_password_for_unknown_email_sends_nothing() {
    let app = TestApp::new();

    let err = app.identity.forgot_password("nobody@example.org").await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(app.mailer.sent().is_empty());
    assert_eq!(app.otp.pending(), 0);
}

#[tokio::test]
async fn users_manage_only_themselves_unless_admin() {
    let app = TestApp::new();
    let ivy = app.register(Role::User, "ivy", "ivy@example.org").await.user;
    let jack = app.register(Role::User, "jack", "jack@example.org").await.user;
    let admin = app.register(Role::Admin, "root", "root@example.org").await.user;

    let rename = UserPatch { name: Some("jackie".into()), ..UserPatch::default() };
    let err = app
        .identity
        .update(&ivy.actor(), jack.id, rename.clone(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let renamed = app.identity.update(&admin.actor(), jack.id, rename, None).await.unwrap();
    assert_eq!(renamed.name, "jackie");
    assert_eq!(renamed.role, Role::User);

    let err = app.identity.remove(&ivy.actor(), jack.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    app.identity.remove(&jack.actor(), jack.id).await.unwrap();
    assert!(app.identity.login("jack@example.org", "password123").await.is_err());
}

#[tokio::test]
async fn password_change_through_update_is_rehashed() {
    let app = TestApp::new();
    let kim = app.register(Role::User, "kim", "kim@example.org").await.user;

    let patch = UserPatch { password: Some("rotated-pass".into()), ..UserPatch::default() };
    app.identity.update(&kim.actor(), kim.id, patch, None).await.unwrap();

    assert!(app.identity.login("kim@example.org", "rotated-pass").await.is_ok());
}

#[tokio::test]
async fn admin_self_registration_can_be_switched_off() {
    let app = TestApp::with_policy(PolicyConfig {
        forbid_admin_self_registration: true,
        ..PolicyConfig::default()
    });
    let registration = Registration { role: Some("admin".into()), ..user_registration("x", "x@example.org") };

    let err = app.identity.register(registration, None).await.unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
}
