//! Request/response transport.
//!
//! Serves the touch-joystick control page and decodes `POST /control`
//! bodies into queue commands. Responses mirror the controller page's
//! expectations: `{"status":"success"}` on accepted commands, an error
//! JSON with 400 on undecodable bodies, and a JSON 404 for unknown paths.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use puppet_shared::command::{ControlPayload, Transport};
use puppet_shared::queue::CommandQueue;
use puppet_shared::status::StatusBoard;

/// Shared app state passed to each request handler.
#[derive(Clone)]
pub struct HttpState {
    pub queue: Arc<CommandQueue>,
    pub status: Arc<StatusBoard>,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(control_page))
        .route("/control", post(post_control).get(get_control))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the router until shutdown flips.
pub async fn serve(
    listener: TcpListener,
    state: HttpState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "http control listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;
    Ok(())
}

async fn control_page() -> Html<&'static str> {
    Html(CONTROL_PAGE)
}

async fn post_control(
    State(state): State<HttpState>,
    payload: Result<Json<ControlPayload>, JsonRejection>,
) -> impl IntoResponse {
    match payload {
        Ok(Json(payload)) => {
            debug!(
                x = payload.joystick_x,
                y = payload.joystick_y,
                interact = payload.interact,
                "control request"
            );
            for command in payload.commands() {
                state.queue.push(Transport::Http, command);
            }
            state.status.transport(Transport::Http).command_seen();
            (StatusCode::OK, Json(json!({"status": "success"})))
        }
        Err(rejection) => {
            warn!(error = %rejection, "dropping undecodable control payload");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "error", "message": rejection.body_text()})),
            )
        }
    }
}

async fn get_control() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"status": "error", "message": "POST only"})),
    )
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"status": "error", "message": format!("no such path: {}", uri.path())})),
    )
}

/// Touch-joystick control page. Posts `{joystickX, joystickY, interact}`
/// on every joystick/button change and re-sends every 100 ms while any
/// input is active.
const CONTROL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset='utf-8'>
    <meta name='viewport' content='width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no'>
    <title>Character Controller</title>
    <style>
        body {
            margin: 0;
            padding: 20px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            font-family: Arial, sans-serif;
            touch-action: none;
            user-select: none;
            height: 100vh;
            overflow: hidden;
        }
        .container { max-width: 400px; margin: 0 auto; text-align: center; }
        h1 { font-size: 24px; margin-bottom: 30px; }
        .status {
            background: rgba(255,255,255,0.2);
            padding: 10px;
            border-radius: 10px;
            margin-bottom: 20px;
            font-size: 14px;
        }
        .control-area {
            display: flex;
            justify-content: space-between;
            align-items: center;
            height: 200px;
        }
        .joystick-area {
            width: 150px;
            height: 150px;
            background: rgba(255,255,255,0.1);
            border-radius: 50%;
            position: relative;
            border: 2px solid rgba(255,255,255,0.3);
        }
        .stick {
            width: 60px;
            height: 60px;
            background: rgba(255,255,255,0.9);
            border-radius: 50%;
            position: absolute;
            top: 45px;
            left: 45px;
            transition: all 0.1s;
        }
        .action-button {
            width: 80px;
            height: 80px;
            background: rgba(255,255,255,0.2);
            border: 2px solid rgba(255,255,255,0.5);
            border-radius: 50%;
            color: white;
            font-size: 14px;
            display: flex;
            align-items: center;
            justify-content: center;
        }
        .action-button.active { background: rgba(76, 175, 80, 0.6); }
    </style>
</head>
<body>
    <div class='container'>
        <h1>Character Controller</h1>
        <div class='status' id='status'>connecting...</div>
        <div class='control-area'>
            <div class='joystick-area' id='joystickArea'><div class='stick' id='stick'></div></div>
            <div class='action-button' id='interactBtn'>interact</div>
        </div>
    </div>
    <script>
        const area = document.getElementById('joystickArea');
        const stick = document.getElementById('stick');
        const interactBtn = document.getElementById('interactBtn');
        const status = document.getElementById('status');
        let joystickX = 0, joystickY = 0, interacting = false;

        function moveStick(touch) {
            const rect = area.getBoundingClientRect();
            let dx = touch.clientX - (rect.left + rect.width / 2);
            let dy = touch.clientY - (rect.top + rect.height / 2);
            const max = rect.width / 2 - 30;
            const dist = Math.sqrt(dx * dx + dy * dy);
            if (dist > max) { dx = dx / dist * max; dy = dy / dist * max; }
            stick.style.transform = `translate(${dx}px, ${dy}px)`;
            joystickX = dx / max;
            joystickY = -dy / max;
            send();
        }

        area.addEventListener('touchstart', e => { e.preventDefault(); moveStick(e.touches[0]); });
        area.addEventListener('touchmove', e => { e.preventDefault(); moveStick(e.touches[0]); });
        area.addEventListener('touchend', e => {
            e.preventDefault();
            joystickX = 0; joystickY = 0;
            stick.style.transform = 'translate(0px, 0px)';
            send();
        });
        interactBtn.addEventListener('touchstart', () => {
            interacting = true;
            interactBtn.classList.add('active');
            send();
        });
        interactBtn.addEventListener('touchend', () => {
            interacting = false;
            interactBtn.classList.remove('active');
            send();
        });

        async function send() {
            try {
                const res = await fetch('/control', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ joystickX, joystickY, interact: interacting })
                });
                if (res.ok) { status.textContent = 'connected'; }
            } catch (err) {
                status.textContent = 'disconnected';
            }
        }

        setInterval(() => {
            if (joystickX !== 0 || joystickY !== 0 || interacting) send();
        }, 100);
    </script>
</body>
</html>
"#;
