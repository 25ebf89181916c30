use intercept_proxy::logging::init_logging;
use intercept_proxy::server::ProxyServer;
use intercept_proxy::settings::Settings;
use tracing::error;

#[tokio::main]
async fn main() {
    let settings = match Settings::load().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            std::process::exit(1);
        }
    };

    let _guard = match init_logging(&settings.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("로깅 초기화 실패: {}", e);
            std::process::exit(1);
        }
    };

    let server = match ProxyServer::from_settings(&settings).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "서버 생성 실패");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!(error = %e, "서버 실행 실패");
        std::process::exit(1);
    }
}
