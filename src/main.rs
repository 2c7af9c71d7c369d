use anyhow::{Context, Result};
use clap::Parser;
use face_match::transport::{HttpUnaryConfig, NatsStreamingConfig};
use face_match::{
    create_router, AppState, AssetDirLoader, Config, HttpUnaryTransport, ImageDirSource,
    ModelGate, NatsStreamingTransport, NoticeBoard, RecognitionSession, TransportKind,
    TransportStrategy,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "face-match", about = "Live face-match session service for the admin console")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/face-match")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Face Match v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Model assets: {}", cfg.models.base_path);
    info!("Capture frames: {}", cfg.capture.frames_dir);
    info!("Recognition transport: {}", cfg.recognition.transport);

    let session_config = cfg.session.to_session_config();

    let transport = match cfg.recognition.transport {
        TransportKind::Unary => {
            TransportStrategy::Unary(Arc::new(HttpUnaryTransport::new(HttpUnaryConfig {
                endpoint: cfg.recognition.endpoint.clone(),
                timeout: Duration::from_millis(cfg.recognition.request_timeout_ms),
                bearer_token: cfg.recognition.bearer_token.clone(),
            })))
        }
        TransportKind::Streaming => TransportStrategy::Streaming(Arc::new(
            NatsStreamingTransport::new(NatsStreamingConfig {
                url: cfg.recognition.nats_url.clone(),
                subject_prefix: cfg.recognition.subject_prefix.clone(),
                session_id: session_config.session_id.clone(),
            }),
        )),
    };

    let gate = Arc::new(ModelGate::new(Box::new(AssetDirLoader::new(
        &cfg.models.base_path,
    ))));
    let notices = Arc::new(NoticeBoard::new());
    let session = Arc::new(RecognitionSession::new(
        session_config,
        Arc::clone(&gate),
        Arc::new(ImageDirSource::new(&cfg.capture.frames_dir)),
        transport,
        notices.clone(),
    ));

    // Warm the models in the background so the first start() is fast
    {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            let _ = gate.ensure_ready().await;
        });
    }

    let app = create_router(AppState::new(
        Arc::clone(&session),
        notices,
        Arc::clone(&gate),
    ));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    let stats = session.stop().await;
    info!(
        "Session stopped: {} frames sent, {} matches, {} no-matches",
        stats.frames_sent, stats.matches, stats.no_matches
    );

    Ok(())
}
