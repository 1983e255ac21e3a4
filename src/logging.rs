use tracing_subscriber::EnvFilter;

/// `RUST_LOG` でフィルタするログ出力を初期化（未設定なら `info`）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
