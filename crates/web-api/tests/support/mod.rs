use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{
    Dispatcher, MessageService, MessageServiceDependencies, NotificationService,
    NotificationServiceDependencies, ConnectionRegistry, SystemClock,
};
use axum::Router;
use domain::{UserId, UserSummary};
use infrastructure::{InMemoryMessageStore, InMemoryNotificationStore, InMemoryUserDirectory};
use tokio::{net::TcpListener, sync::oneshot, time::sleep};
use uuid::Uuid;
use web_api::{router as build_router_fn, AppState, JwtConfig, JwtService};

/// 测试应用：内存适配器 + 真实路由
pub struct TestApp {
    pub addr: SocketAddr,
    pub jwt: Arc<JwtService>,
    pub users: Arc<InMemoryUserDirectory>,
    pub notification_service: Arc<NotificationService>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApp {
    /// 注册一个测试用户，返回其 id 和可用的 ws 连接地址
    pub async fn register_user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users
            .upsert(UserSummary::new(UserId::from(id), name, None))
            .await;
        id
    }

    pub fn ws_url_for(&self, user_id: Uuid) -> String {
        let token = self
            .jwt
            .generate_token(user_id)
            .expect("token generation should not fail in tests");
        format!("ws://{}/ws?token={}", self.addr, token)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_session_buffer(64).await
}

/// 自定义会话推送队列容量，用于积压相关的用例
pub async fn spawn_app_with_session_buffer(session_buffer: usize) -> TestApp {
    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(registry));

    let users = InMemoryUserDirectory::new();
    let messages = InMemoryMessageStore::new();
    let notifications = InMemoryNotificationStore::new();
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock::default());

    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_store: messages.clone(),
        user_directory: users.clone(),
        clock: clock.clone(),
        dispatcher: dispatcher.clone(),
        max_message_chars: 500,
    }));

    let notification_service = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notification_store: notifications.clone(),
        user_directory: users.clone(),
        clock,
        dispatcher: dispatcher.clone(),
    }));

    let jwt = Arc::new(JwtService::new(JwtConfig {
        secret: "ws-flow-test-secret-key-with-32-chars!!".to_string(),
        expiration_hours: 24,
    }));

    let state = AppState::new(
        message_service,
        notification_service.clone(),
        dispatcher,
        jwt.clone(),
        session_buffer,
    );
    let router: Router = build_router_fn(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // allow server to start
    sleep(Duration::from_millis(100)).await;

    TestApp {
        addr,
        jwt,
        users,
        notification_service,
        shutdown: Some(shutdown_tx),
    }
}
