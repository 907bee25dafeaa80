use async_trait::async_trait;
use duwdu_portal::{
    AppConfig, AuthService, AuthState, GenerationService, MockAuthService, MockGenerationService,
    Portal, PortalError, Services,
    handlers::{self, AuthTab, Command},
    models::{AuthReply, AuthRequest, GenerationRequest, MediaType, ModuleId, ModuleOptions, Voice},
};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use uuid::Uuid;

// --- Scripted Auth Backend ---

/// Answers every call with the next scripted reply and records the requests.
#[derive(Default)]
struct ScriptedAuth {
    replies: Mutex<Vec<Result<AuthReply, PortalError>>>,
    received: Mutex<Vec<AuthRequest>>,
}

impl ScriptedAuth {
    fn new(replies: Vec<Result<AuthReply, PortalError>>) -> Self {
        let mut replies = replies;
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            ..Self::default()
        }
    }
}

#[async_trait]
impl AuthService for ScriptedAuth {
    async fn call(&self, request: &AuthRequest) -> Result<AuthReply, PortalError> {
        self.received.lock().await.push(request.clone());
        self.replies
            .lock()
            .await
            .pop()
            .unwrap_or_else(|| Err(PortalError::Rejected("unexpected call".into())))
    }
}

fn gated_portal() -> Portal {
    Portal::new(AppConfig::default())
}

fn open_portal() -> Portal {
    Portal::new(AppConfig {
        auth_gate: false,
        ..AppConfig::default()
    })
}

fn mock_services(auth: MockAuthService) -> (Services, Arc<MockGenerationService>) {
    let generation = Arc::new(MockGenerationService::new());
    let services = Services {
        auth: Arc::new(auth),
        generation: generation.clone(),
    };
    (services, generation)
}

// --- Scenarios ---

#[tokio::test]
async fn test_register_scenario_stores_backend_identity() {
    let auth = ScriptedAuth::new(vec![
        Ok(AuthReply {
            success: true,
            code: Some("ABC".into()),
            ..AuthReply::default()
        }),
        Ok(AuthReply {
            success: true,
            user_id: Some(42),
            username: Some("alice".into()),
            ..AuthReply::default()
        }),
    ]);
    let mut portal = gated_portal();

    portal.gate_mut().submit_code(&auth, "abc").await.unwrap();
    portal.gate_mut().register(&auth, "alice", "pw1").await.unwrap();

    let session = portal.gate().session();
    assert!(session.authenticated);
    assert_eq!(session.user_id, Some(42));
    assert_eq!(session.username.as_deref(), Some("alice"));
    assert_eq!(portal.gate().state(), &AuthState::Authenticated);
    assert!(portal.is_open());

    let received = auth.received.lock().await;
    assert_eq!(
        received[1],
        AuthRequest::Register {
            username: "alice".into(),
            password: "pw1".into(),
            code: "ABC".into(),
        }
    );
}

#[tokio::test]
async fn test_gate_blocks_controller_until_login() {
    let (services, generation) =
        mock_services(MockAuthService::new(&[]).with_user("bob", "secret").await);
    let mut portal = gated_portal();

    let err = handlers::handle(&mut portal, &services, Command::Select(ModuleId::Text))
        .await
        .unwrap_err();
    assert_eq!(err, PortalError::Unauthenticated);
    let err = portal
        .generate(services.generation.as_ref(), ModuleOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, PortalError::Unauthenticated);

    handlers::handle(
        &mut portal,
        &services,
        Command::Login {
            username: "bob".into(),
            password: "secret".into(),
        },
    )
    .await
    .unwrap();

    handlers::handle(&mut portal, &services, Command::Select(ModuleId::Text))
        .await
        .unwrap();
    handlers::handle(&mut portal, &services, Command::Prompt("привет".into()))
        .await
        .unwrap();
    let output = handlers::handle(&mut portal, &services, Command::Submit)
        .await
        .unwrap();

    assert!(output[0].starts_with("✅"));
    // Requests from a signed-in user carry the user id.
    assert_eq!(generation.requests().await[0].user_id, Some(1));
}

#[tokio::test]
async fn test_open_portal_runs_without_session() {
    let (services, generation) = mock_services(MockAuthService::new(&[]));
    let mut portal = open_portal();

    for command in [
        Command::Select(ModuleId::Imaging),
        Command::Media(MediaType::Video),
        Command::Prompt("кот".into()),
        Command::Submit,
    ] {
        handlers::handle(&mut portal, &services, command).await.unwrap();
    }

    let request = &generation.requests().await[0];
    assert_eq!(request.user_id, None);
    assert_eq!(request.media_type, Some(MediaType::Video));
}

#[tokio::test]
async fn test_logout_resets_everything() {
    let (services, generation) =
        mock_services(MockAuthService::new(&[]).with_user("bob", "secret").await);
    generation.push(Ok(json!({ "audio_url": "x.mp3" }))).await;
    let mut portal = gated_portal();
    portal.gate_mut().show_login();
    portal
        .gate_mut()
        .login(services.auth.as_ref(), "bob", "secret")
        .await
        .unwrap();
    {
        let controller = portal.controller_mut().unwrap();
        controller.select_module(ModuleId::Voice);
        controller.set_voice(Voice::Child);
        controller.update_prompt("text");
    }
    portal
        .generate(services.generation.as_ref(), ModuleOptions::default())
        .await
        .unwrap();
    assert!(portal.controller().unwrap().response().is_some());

    portal.logout();

    assert_eq!(portal.gate().state(), &AuthState::EnteringCode);
    assert_eq!(portal.controller().unwrap_err(), PortalError::Unauthenticated);

    portal.gate_mut().show_login();
    portal
        .gate_mut()
        .login(services.auth.as_ref(), "bob", "secret")
        .await
        .unwrap();
    let controller = portal.controller().unwrap();
    assert!(controller.selected_module().is_none());
    assert_eq!(controller.prompt(), "");
    assert!(controller.response().is_none());
    assert_eq!(controller.voice(), Voice::Male);
}

/// Hangs until the caller gives up.
struct StalledGeneration;

#[async_trait]
impl GenerationService for StalledGeneration {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Value, PortalError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(json!({ "response": "too late" }))
    }
}

#[tokio::test]
async fn test_logout_after_abandoned_generation_starts_clean() {
    let (services, generation) =
        mock_services(MockAuthService::new(&[]).with_user("bob", "secret").await);
    let mut portal = gated_portal();
    portal.gate_mut().show_login();
    portal
        .gate_mut()
        .login(services.auth.as_ref(), "bob", "secret")
        .await
        .unwrap();
    {
        let controller = portal.controller_mut().unwrap();
        controller.select_module(ModuleId::Text);
        controller.update_prompt("q");
    }

    let elapsed = tokio::time::timeout(
        Duration::from_millis(50),
        portal.generate(&StalledGeneration, ModuleOptions::default()),
    )
    .await;
    assert!(elapsed.is_err());

    portal.logout();
    portal.gate_mut().show_login();
    portal
        .gate_mut()
        .login(services.auth.as_ref(), "bob", "secret")
        .await
        .unwrap();
    assert!(!portal.controller().unwrap().pending());

    for command in [
        Command::Select(ModuleId::Text),
        Command::Prompt("снова".into()),
        Command::Submit,
    ] {
        handlers::handle(&mut portal, &services, command).await.unwrap();
    }
    assert_eq!(generation.requests().await.len(), 1);
}

#[tokio::test]
async fn test_code_then_register_through_commands() {
    let (services, _) = mock_services(MockAuthService::new(&["DUWDU1"]));
    let mut portal = gated_portal();

    handlers::handle(&mut portal, &services, Command::Code("duwdu1".into()))
        .await
        .unwrap();
    handlers::handle(
        &mut portal,
        &services,
        Command::Register {
            username: "carol".into(),
            password: "pw".into(),
        },
    )
    .await
    .unwrap();

    let state = handlers::handle(&mut portal, &services, Command::State)
        .await
        .unwrap();
    assert_eq!(state[0], "auth: authenticated");
    assert!(state.contains(&"user: carol".to_string()));
}

// --- Saving Results ---

#[tokio::test]
async fn test_save_writes_website_html_to_file() {
    let (services, _) = mock_services(MockAuthService::new(&[]));
    let mut portal = open_portal();
    let path = std::env::temp_dir().join(format!("duwdu-site-{}.html", Uuid::new_v4()));

    for command in [
        Command::Select(ModuleId::Webgen),
        Command::Prompt("пекарня".into()),
        Command::Submit,
    ] {
        handlers::handle(&mut portal, &services, command).await.unwrap();
    }
    let output = handlers::handle(&mut portal, &services, Command::Save(Some(path.clone())))
        .await
        .unwrap();

    let saved = tokio::fs::read_to_string(&path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();
    assert!(saved.contains("<h1>пекарня</h1>"));
    assert!(output[0].contains(&path.display().to_string()));
}

#[tokio::test]
async fn test_save_media_prints_url_and_download_name() {
    let (services, _) = mock_services(MockAuthService::new(&[]));
    let mut portal = open_portal();

    for command in [
        Command::Select(ModuleId::Imaging),
        Command::Media(MediaType::Video),
        Command::Prompt("закат".into()),
        Command::Submit,
    ] {
        handlers::handle(&mut portal, &services, command).await.unwrap();
    }
    let output = handlers::handle(&mut portal, &services, Command::Save(None))
        .await
        .unwrap();

    assert_eq!(
        output,
        vec![
            "📥 Скачать: https://cdn.example.invalid/duwdu1.mp4".to_string(),
            "Имя файла: duwdu1-video.mp4".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_save_without_result_is_validation_error() {
    let (services, _) = mock_services(MockAuthService::new(&[]));
    let mut portal = open_portal();
    handlers::handle(&mut portal, &services, Command::Select(ModuleId::Text))
        .await
        .unwrap();

    let err = handlers::handle(&mut portal, &services, Command::Save(None))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        PortalError::Validation("Нет результата для сохранения".into())
    );
}

#[tokio::test]
async fn test_save_into_missing_directory_fails() {
    let (services, _) = mock_services(MockAuthService::new(&[]));
    let mut portal = open_portal();
    for command in [
        Command::Select(ModuleId::Text),
        Command::Prompt("q".into()),
        Command::Submit,
    ] {
        handlers::handle(&mut portal, &services, command).await.unwrap();
    }
    let path = std::env::temp_dir()
        .join(Uuid::new_v4().to_string())
        .join("out.txt");

    let err = handlers::handle(&mut portal, &services, Command::Save(Some(path)))
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::Save { .. }));
}

// --- Command Parsing ---

#[test]
fn test_command_parsing() {
    assert_eq!(
        "select Website".parse::<Command>().unwrap(),
        Command::Select(ModuleId::Webgen)
    );
    assert_eq!(
        "prompt  сайт для пекарни ".parse::<Command>().unwrap(),
        Command::Prompt("сайт для пекарни".into())
    );
    assert_eq!(
        "voice female".parse::<Command>().unwrap(),
        Command::Voice(Voice::Female)
    );
    assert_eq!(
        "tab login".parse::<Command>().unwrap(),
        Command::Tab(AuthTab::Login)
    );
    assert_eq!(
        "login alice pw1".parse::<Command>().unwrap(),
        Command::Login {
            username: "alice".into(),
            password: "pw1".into(),
        }
    );
    assert_eq!("save".parse::<Command>().unwrap(), Command::Save(None));
    assert_eq!(
        "save site.html".parse::<Command>().unwrap(),
        Command::Save(Some("site.html".into()))
    );
    assert_eq!("QUIT".parse::<Command>().unwrap(), Command::Quit);
}

#[test]
fn test_command_parsing_errors() {
    assert!(matches!(
        "login alice".parse::<Command>(),
        Err(PortalError::Validation(_))
    ));
    assert!(matches!(
        "media gif".parse::<Command>(),
        Err(PortalError::Validation(_))
    ));
    assert!("dance".parse::<Command>().is_err());
}

#[tokio::test]
async fn test_help_lists_every_command() {
    let (services, _) = mock_services(MockAuthService::new(&[]));
    let mut portal = gated_portal();

    let output = handlers::handle(&mut portal, &services, Command::Help)
        .await
        .unwrap();

    for word in [
        "help", "modules", "select", "prompt", "media", "voice", "submit", "save", "state",
        "code", "register", "login", "tab", "logout", "quit",
    ] {
        assert!(
            output.iter().any(|line| line.starts_with(word)),
            "help is missing `{word}`"
        );
    }
}
