use parking_lot::Mutex;
use serde_json::Value;
use shellplay_core::clock::VirtualClock;
use shellplay_core::prelude::*;
use shellplay_core::workflow::{BoundingBox, ElementType};
use shellplay_remote::{
    serve, BridgeConfig, ControlService, RemoteConfig, RemoteServer, RenderBridge, SurfaceHost,
};
use std::sync::Arc;
use std::time::Duration;

fn signup() -> WorkflowDocument {
    let login = Screen::new("login", "Sign in")
        .with_element(UIElement::new(
            "email",
            ElementType::TextInput,
            BoundingBox::new(40.0, 60.0, 240.0, 32.0),
        ))
        .with_element(UIElement::new(
            "submit",
            ElementType::Button,
            BoundingBox::new(40.0, 120.0, 100.0, 32.0),
        ));
    WorkflowDocument::new("signup")
        .with_screen(login)
        .with_screen(Screen::new("home", "Home"))
        .with_action(Action::new("1", ActionType::Type, "login").on("email").with_value("a@b.c"))
        .with_action(Action::new("2", ActionType::Click, "login").on("submit").then("home"))
}

struct App {
    base: String,
    surface: Arc<Mutex<HeadlessSurface>>,
    _player: PlayerHandle,
}

async fn app(bridge_config: BridgeConfig) -> App {
    let doc = signup();
    let surface = Arc::new(Mutex::new(HeadlessSurface::new(&doc)));
    let shared: SharedSurface = surface.clone();
    let engine = WorkflowEngine::new(
        Arc::new(doc),
        shared.clone(),
        EngineConfig::default().humanize(false).seed(3),
    )
    .with_clock(VirtualClock::new());
    let player = Player::spawn(engine).unwrap();

    let (bridge, inbound) = RenderBridge::new(bridge_config);
    SurfaceHost::new(shared, bridge.clone(), inbound)
        .highlight_duration(Duration::from_millis(50))
        .spawn()
        .unwrap();
    let service = Arc::new(ControlService::new(bridge, player.commands()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, service));
    App {
        base,
        surface,
        _player: player,
    }
}

async fn get(app: &App, path: &str) -> (u16, Value) {
    let resp = reqwest::get(format!("{}{}", app.base, path)).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post(app: &App, path: &str) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", app.base, path))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn status_reports_window_and_readiness() {
    let app = app(BridgeConfig::default()).await;
    let (code, body) = get(&app, "/status").await;
    assert_eq!(code, 200);
    assert_eq!(body["ready"], true);
    assert_eq!(body["screen"], Value::Null);
    assert_eq!(body["window"]["width"], 1200);
}

#[tokio::test(flavor = "multi_thread")]
async fn navigate_then_read_geometry() {
    let app = app(BridgeConfig::default()).await;
    let (code, body) = post(&app, "/navigate/login").await;
    assert_eq!(code, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["screen"], "login");

    let (_, body) = get(&app, "/elements").await;
    assert_eq!(body["screen"], "login");
    assert_eq!(body["elements"]["email"]["centerX"], 160.0);
    assert_eq!(body["elements"]["email"]["centerY"], 76.0);
    assert!(body.get("error").is_none());

    let (code, body) = get(&app, "/element/submit").await;
    assert_eq!(code, 200);
    assert_eq!(body["width"], 100.0);
    let (code, _) = get(&app, "/element/nope").await;
    assert_eq!(code, 404);

    let (_, body) = get(&app, "/playback").await;
    assert_eq!(body["currentScreenId"], "login");
    assert_eq!(body["currentActionIndex"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_screen_and_route_are_404() {
    let app = app(BridgeConfig::default()).await;
    let (code, body) = post(&app, "/navigate/nowhere").await;
    assert_eq!(code, 404);
    assert_eq!(body["success"], false);

    let (code, _) = get(&app, "/definitely/not/here").await;
    assert_eq!(code, 404);
    let (code, _) = post(&app, "/playback/rewind").await;
    assert_eq!(code, 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn focus_and_focused_element() {
    let app = app(BridgeConfig::default()).await;
    post(&app, "/navigate/login").await;

    let (_, body) = get(&app, "/focused-element").await;
    assert_eq!(body["focused"], Value::Null);
    let (_, body) = post(&app, "/focus/email").await;
    assert_eq!(body["success"], true);
    let (_, body) = get(&app, "/focused-element").await;
    assert_eq!(body["focused"], "email");

    let (_, body) = post(&app, "/focus-window").await;
    assert_eq!(body["success"], true);
    assert!(app.surface.lock().is_window_focused());
}

#[tokio::test(flavor = "multi_thread")]
async fn highlight_clears_itself() {
    let app = app(BridgeConfig::default()).await;
    post(&app, "/navigate/login").await;

    let (_, body) = post(&app, "/highlight/submit").await;
    assert_eq!(body["success"], true);
    assert_eq!(app.surface.lock().highlighted(), Some("submit"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.surface.lock().highlighted(), None);

    let (_, body) = post(&app, "/highlight/ghost").await;
    assert_eq!(body["success"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn playback_runs_and_reset_returns_to_start() {
    let app = app(BridgeConfig::default()).await;
    let (_, body) = post(&app, "/playback/start").await;
    assert_eq!(body["success"], true);

    let mut state = Value::Null;
    for _ in 0..100 {
        let (_, body) = get(&app, "/playback").await;
        if body["state"] == "completed" {
            state = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state["progress"], 1.0);
    assert_eq!(state["currentScreenId"], "home");
    assert_eq!(app.surface.lock().value("email"), None);

    let (_, body) = post(&app, "/reset").await;
    assert_eq!(body["screen"], "login");
    let (_, body) = get(&app, "/playback").await;
    assert_eq!(body["currentActionIndex"], 2);
    assert_eq!(body["currentScreenId"], "login");
}

#[tokio::test(start_paused = true)]
async fn silent_surface_yields_empty_geometry_with_error() {
    let doc = signup();
    let surface = shellplay_core::share(HeadlessSurface::new(&doc));
    let engine = WorkflowEngine::new(Arc::new(doc), surface, EngineConfig::default());
    let player = Player::spawn(engine).unwrap();

    // nobody services the inbound side
    let (bridge, _inbound) = RenderBridge::new(BridgeConfig::default());
    let service = ControlService::new(bridge.clone(), player.commands());

    let body = service.elements().await;
    assert!(body.elements.is_empty());
    assert!(body.error.is_some());
    assert_eq!(bridge.pending_count(), 0);

    let focused = service.focused().await;
    assert_eq!(focused.focused, None);
    assert_eq!(bridge.pending_count(), 0);
}

#[test]
fn remote_server_binds_ephemeral_port() {
    let doc = signup();
    let surface = shellplay_core::share(HeadlessSurface::new(&doc));
    let engine = WorkflowEngine::new(Arc::new(doc), surface.clone(), EngineConfig::default());
    let player = Player::spawn(engine).unwrap();

    let server = RemoteServer::start(RemoteConfig::default().port(0), surface, player.commands()).unwrap();
    assert_ne!(server.addr().port(), 0);

    let client = tokio::runtime::Runtime::new().unwrap();
    let body: Value = client.block_on(async {
        reqwest::get(format!("http://{}/status", server.addr()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    });
    assert_eq!(body["ready"], true);
}
