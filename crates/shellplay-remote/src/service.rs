//! Remote control operations, independent of the HTTP transport

use crate::bridge::RenderBridge;
use serde::{Deserialize, Serialize};
use shellplay_core::engine::PlaybackStatus;
use shellplay_core::error::{ErrorCode, Result as CoreResult};
use shellplay_core::player::PlayerCommands;
use shellplay_core::surface::{ElementGeometry, WindowBounds};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub screen: Option<String>,
    pub window: WindowBounds,
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementsResponse {
    pub screen: Option<String>,
    pub elements: BTreeMap<String, ElementGeometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusedResponse {
    pub focused: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateResponse {
    pub success: bool,
    pub screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCommand {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
}

impl std::str::FromStr for PlaybackCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "stop" => Ok(Self::Stop),
            "reset" => Ok(Self::Reset),
            other => Err(format!("unknown playback command: {}", other)),
        }
    }
}

/// Outcome of a navigation, distinguishing unknown screens
pub enum Navigation {
    Done(NavigateResponse),
    UnknownScreen(NavigateResponse),
}

pub struct ControlService {
    bridge: Arc<RenderBridge>,
    player: PlayerCommands,
}

impl ControlService {
    pub fn new(bridge: Arc<RenderBridge>, player: PlayerCommands) -> Self {
        Self { bridge, player }
    }

    pub fn bridge(&self) -> &Arc<RenderBridge> {
        &self.bridge
    }

    pub async fn status(&self) -> StatusResponse {
        match self.bridge.status().await {
            Ok((screen, window)) => StatusResponse {
                screen,
                window,
                ready: true,
            },
            Err(e) => {
                warn!(error = %e, "status query failed");
                StatusResponse {
                    screen: self.player.status().current_screen_id,
                    window: WindowBounds::default(),
                    ready: false,
                }
            }
        }
    }

    /// Empty elements plus an error when the surface does not answer
    pub async fn elements(&self) -> ElementsResponse {
        match self.bridge.geometry().await {
            Ok(snapshot) => ElementsResponse {
                screen: snapshot.screen,
                elements: snapshot.elements,
                error: None,
            },
            Err(e) => ElementsResponse {
                screen: self.player.status().current_screen_id,
                elements: BTreeMap::new(),
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn element(&self, element_id: &str) -> Option<ElementGeometry> {
        match self.bridge.element(element_id).await {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!(element = element_id, error = %e, "element query failed");
                None
            }
        }
    }

    pub async fn focused(&self) -> FocusedResponse {
        let focused = self.bridge.focused_element().await.unwrap_or_else(|e| {
            warn!(error = %e, "focus query failed");
            None
        });
        FocusedResponse { focused }
    }

    pub async fn navigate(&self, screen_id: &str) -> Navigation {
        info!(screen = screen_id, "remote navigate");
        let player = self.player.clone();
        let id = screen_id.to_string();
        let result = tokio::task::spawn_blocking(move || player.navigate(&id)).await;
        match flatten(result) {
            Ok(screen) => Navigation::Done(NavigateResponse {
                success: true,
                screen: Some(screen),
                error: None,
            }),
            Err(e) => {
                let unknown = e.code == ErrorCode::ScreenNotFound;
                let response = NavigateResponse {
                    success: false,
                    screen: None,
                    error: Some(e.message),
                };
                if unknown {
                    Navigation::UnknownScreen(response)
                } else {
                    Navigation::Done(response)
                }
            }
        }
    }

    /// Back to the start screen, cursor untouched
    pub async fn reset(&self) -> NavigateResponse {
        info!("remote reset");
        let player = self.player.clone();
        let result = tokio::task::spawn_blocking(move || player.show_start_screen()).await;
        match flatten(result) {
            Ok(screen) => NavigateResponse {
                success: true,
                screen: Some(screen),
                error: None,
            },
            Err(e) => NavigateResponse {
                success: false,
                screen: None,
                error: Some(e.message),
            },
        }
    }

    pub async fn highlight(&self, element_id: &str) -> AckResponse {
        match self.bridge.highlight(element_id).await {
            Ok(true) => AckResponse::ok(),
            Ok(false) => AckResponse::failed(format!("no element '{}' on screen", element_id)),
            Err(e) => AckResponse::failed(e),
        }
    }

    pub async fn focus(&self, element_id: &str) -> AckResponse {
        match self.bridge.focus(element_id).await {
            Ok(true) => AckResponse::ok(),
            Ok(false) => AckResponse::failed(format!("element '{}' cannot take focus", element_id)),
            Err(e) => AckResponse::failed(e),
        }
    }

    pub async fn focus_window(&self) -> AckResponse {
        match self.bridge.focus_window().await {
            Ok(_) => AckResponse::ok(),
            Err(e) => AckResponse::failed(e),
        }
    }

    pub fn playback(&self) -> PlaybackStatus {
        self.player.status()
    }

    pub fn playback_command(&self, command: PlaybackCommand) -> AckResponse {
        info!(?command, "remote playback command");
        let sent = match command {
            PlaybackCommand::Start => self.player.start(),
            PlaybackCommand::Pause => self.player.pause(),
            PlaybackCommand::Resume => self.player.resume(),
            PlaybackCommand::Stop => self.player.stop(),
            PlaybackCommand::Reset => self.player.reset(),
        };
        match sent {
            Ok(()) => AckResponse::ok(),
            Err(e) => AckResponse::failed(e),
        }
    }
}

fn flatten(
    result: std::result::Result<CoreResult<String>, tokio::task::JoinError>,
) -> CoreResult<String> {
    result.map_err(|e| shellplay_core::Error::new(ErrorCode::Unknown, e.to_string()))?
}
