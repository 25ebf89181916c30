use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::handler::RequestHandler;
use super::listener::ServerListener;
use super::Result;
use crate::middleware::{Agent, ETag, Flow, Forward, ForwardConfig, Select, ServerHelper, StaticFiles};
use crate::middleware::helper::HelperConfig;
use crate::settings::{Settings, TunnelMode};
use crate::tunnel::{ConnectHandler, ConnectTunnel};

/// 설정으로부터 기본 파이프라인을 구성하고 리스너를 실행하는 서버
pub struct ProxyServer {
    listener: ServerListener,
    handler: Arc<RequestHandler>,
    helper: Option<ServerHelper>,
}

/// 기본 파이프라인: [ServerHelper] → ETag → [정적 파일] → Forward
pub fn default_flow(settings: &Settings, agent: Agent) -> (Flow, Option<ServerHelper>) {
    let mut flow = Flow::new();

    let helper = settings.helper.enabled.then(|| ServerHelper::new(HelperConfig::from(&settings.helper)));
    if let Some(helper) = &helper {
        flow.add(helper.clone());
    }

    flow.add(ETag::new());

    if let Some(root) = &settings.helper.static_root {
        flow.add(Select::new(settings.helper.static_prefix.as_str(), StaticFiles::new(root)));
    }

    flow.add(Forward::new(ForwardConfig::from_settings(&settings.forward, agent)));
    (flow, helper)
}

pub fn default_connect_handler(settings: &Settings) -> Option<Arc<dyn ConnectHandler>> {
    match settings.tunnel.mode {
        TunnelMode::Direct => Some(Arc::new(ConnectTunnel::from_settings(&settings.tunnel))),
        TunnelMode::Disabled => None,
    }
}

impl ProxyServer {
    #[instrument(skip(settings), level = "debug", err)]
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let (flow, helper) = default_flow(settings, Agent::new());
        info!(middlewares = ?flow.names(), "미들웨어 체인 구성");

        let mut handler = RequestHandler::new(flow);
        if let Some(connect) = default_connect_handler(settings) {
            handler = handler.with_connect_handler(connect);
        }

        if let Some(helper) = &helper {
            for entry in &settings.helper.watch {
                if !helper.watch(&entry.path, entry.url.as_str()).await.map_err(|e| {
                    super::Error::ConfigError(e.to_string())
                })? {
                    warn!(path = %entry.path, "파일 감시를 시작하지 못했습니다");
                }
            }
        }

        Self::with_handler(settings, handler, helper).await
    }

    /// 직접 구성한 처리기로 서버를 만듭니다.
    pub async fn with_handler(
        settings: &Settings,
        handler: RequestHandler,
        helper: Option<ServerHelper>,
    ) -> Result<Self> {
        let listener = ServerListener::new(&settings.server).await?;
        Ok(Self {
            listener,
            handler: Arc::new(handler),
            helper,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn helper(&self) -> Option<&ServerHelper> {
        self.helper.as_ref()
    }

    pub async fn run(self) -> Result<()> {
        info!(addr = ?self.listener.local_addr().ok(), "프록시 서버 시작");
        self.listener.run(self.handler).await
    }
}
