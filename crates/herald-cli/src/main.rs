use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, Instant, sleep};
use tracing::{info, warn};

use herald_core::{
    BoxError, CancellationToken, Erased, MediatorBuilder, MediatorConfig, MediatorError, Next,
    Notification, NotificationHandler, OpenBehavior, PipelineBehavior, PublishStrategy, Request,
    RequestContext, RequestDescriptor, RequestHandler, VoidRequest, VoidRequestHandler, logging,
};

struct Greet {
    name: String,
}

impl Request for Greet {
    type Response = String;
}

struct ResetCounter;

impl VoidRequest for ResetCounter {}

struct Greeted {
    name: String,
}

impl Notification for Greeted {}

struct GreetHandler {
    greeted: Arc<AtomicU64>,
}

#[async_trait]
impl RequestHandler<Greet> for GreetHandler {
    async fn handle(&self, request: &Greet, _cancel: &CancellationToken) -> Result<String, MediatorError> {
        let n = self.greeted.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("Hello, {}! (#{n})", request.name))
    }
}

struct ResetCounterHandler {
    greeted: Arc<AtomicU64>,
}

#[async_trait]
impl VoidRequestHandler<ResetCounter> for ResetCounterHandler {
    async fn handle(&self, _request: &ResetCounter, _cancel: &CancellationToken) -> Result<(), MediatorError> {
        self.greeted.store(0, Ordering::Relaxed);
        Ok(())
    }
}

/// 購読者：遅延付きで通知を受ける（concurrent だと重なって走る）
struct AuditLog {
    label: &'static str,
    delay: Duration,
}

#[async_trait]
impl NotificationHandler<Greeted> for AuditLog {
    async fn handle(&self, notification: &Greeted, cancel: &CancellationToken) -> Result<(), MediatorError> {
        tokio::select! {
            _ = sleep(self.delay) => {}
            _ = cancel.cancelled() => return Err(MediatorError::Cancelled),
        }
        println!("[{}] greeted {}", self.label, notification.name);
        Ok(())
    }
}

/// 空の名前を handler に届く前に弾く typed behavior
struct RejectEmptyName;

#[async_trait]
impl PipelineBehavior<Greet> for RejectEmptyName {
    async fn handle(
        &self,
        request: &Greet,
        next: Next<'_, String>,
        _cancel: &CancellationToken,
    ) -> Result<String, MediatorError> {
        if request.name.trim().is_empty() {
            return Err(MediatorError::InvalidArgument("name must not be empty".into()));
        }
        next.run().await
    }
}

/// 全 request 型に掛かる open behavior：所要時間を記録する
struct Timing;

#[async_trait]
impl OpenBehavior for Timing {
    fn applies_to(&self, _descriptor: &RequestDescriptor) -> bool {
        true
    }

    async fn handle(
        &self,
        ctx: &RequestContext<'_>,
        next: Next<'_, Erased>,
        _cancel: &CancellationToken,
    ) -> Result<Erased, MediatorError> {
        let started = Instant::now();
        let out = next.run().await;
        info!(
            request = ctx.type_name(),
            elapsed = ?started.elapsed(),
            ok = out.is_ok(),
            "handled"
        );
        out
    }
}

fn build(strategy: PublishStrategy) -> Result<herald_core::Mediator<herald_core::HandlerRegistry>, BoxError> {
    let greeted = Arc::new(AtomicU64::new(0));
    let mediator = MediatorBuilder::new()
        .register_request_handler::<Greet, _>(GreetHandler { greeted: greeted.clone() })?
        .register_void_handler::<ResetCounter, _>(ResetCounterHandler { greeted })?
        .register_notification_handler::<Greeted, _>(AuditLog {
            label: "slow",
            delay: Duration::from_millis(100),
        })
        .register_notification_handler::<Greeted, _>(AuditLog {
            label: "fast",
            delay: Duration::from_millis(10),
        })
        .add_open_behavior(Timing)
        .add_behavior::<Greet, _>(RejectEmptyName)
        .publish_strategy(strategy)
        .expect_requests(&[
            std::any::type_name::<Greet>(),
            std::any::type_name::<ResetCounter>(),
        ])
        .build()?;
    Ok(mediator)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // (A) 設定を読む：引数にパスがあれば TOML、なければ既定値
    let config = match std::env::args().nth(1) {
        Some(path) => MediatorConfig::load(path)?,
        None => MediatorConfig::default(),
    };
    logging::init(&config.log_level, true)?;

    let cancel = CancellationToken::new();

    // (B) request / response
    let mediator = build(config.publish_strategy)?;
    for name in ["herald", "  "] {
        match mediator
            .send_with_response(Greet { name: name.to_string() }, &cancel)
            .await
        {
            Ok(reply) => println!("{reply}"),
            Err(e) => warn!(error = %e, "greet rejected"),
        }
    }

    // (C) void request
    mediator.send(ResetCounter, &cancel).await?;
    let reply = mediator
        .send_with_response(Greet { name: "again".into() }, &cancel)
        .await?;
    println!("{reply}");

    // (D) 通知：戦略ごとに所要時間を比べる
    for strategy in [PublishStrategy::Sequential, PublishStrategy::Concurrent] {
        let mediator = build(strategy)?;
        let started = Instant::now();
        mediator
            .publish(Greeted { name: "herald".into() }, &cancel)
            .await?;
        println!("{strategy:?} publish took {:?}", started.elapsed());
    }

    // (E) 取り消し済みの token で publish すると Cancelled が返る
    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = mediator
        .publish(Greeted { name: "late".into() }, &cancelled)
        .await
        .err();
    println!("publish after cancel: {err:?}");

    Ok(())
}
