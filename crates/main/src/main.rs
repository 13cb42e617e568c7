//! 主应用程序入口
//!
//! 启动实时私信与通知推送服务。

use std::{sync::Arc, time::Duration};

use application::{
    ConnectionRegistry, Dispatcher, MessageService, MessageServiceDependencies,
    NotificationService, NotificationServiceDependencies, SystemClock,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, PgMessageStore, PgNotificationStore, PgUserDirectory,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 加载并校验配置。生产入口用严格加载：缺少
    // DATABASE_URL / JWT_SECRET 直接报错，不回退开发默认值
    let app_config = AppConfig::from_env();
    app_config.validate()?;

    tracing::info!(
        "连接数据库: {}",
        app_config.database.url.split('@').last().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(
        &app_config.database.url,
        app_config.database.max_connections,
    )
    .await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 连接注册表与事件分发器
    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = Arc::new(Dispatcher::with_push_timeout(
        registry,
        Duration::from_millis(app_config.realtime.push_timeout_ms),
    ));

    // 持久化适配器
    let message_store = Arc::new(PgMessageStore::new(pg_pool.clone()));
    let notification_store = Arc::new(PgNotificationStore::new(pg_pool.clone()));
    let user_directory = Arc::new(PgUserDirectory::new(pg_pool));
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock::default());

    // 应用层服务
    let message_service = MessageService::new(MessageServiceDependencies {
        message_store: message_store.clone(),
        user_directory: user_directory.clone(),
        clock: clock.clone(),
        dispatcher: dispatcher.clone(),
        max_message_chars: app_config.realtime.max_message_chars,
    });

    let notification_service = NotificationService::new(NotificationServiceDependencies {
        notification_store,
        user_directory,
        clock,
        dispatcher: dispatcher.clone(),
    });

    let jwt_service = Arc::new(JwtService::new(app_config.jwt.clone()));

    let state = AppState::new(
        Arc::new(message_service),
        Arc::new(notification_service),
        dispatcher,
        jwt_service,
        app_config.realtime.session_buffer,
    );

    // 启动 Web 服务器
    let app = router(state);
    let bind_addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("实时推送服务启动在 http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
