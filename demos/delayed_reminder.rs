//! # Example: delayed_reminder
//!
//! Schedules two reminders on a time wheel, cancels one of them, and runs the
//! other through an [`Executor`] when it fires.
//!
//! ## Run
//! ```bash
//! cargo run --example delayed_reminder --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sagaflow::{
    DelayTask, Executor, NotifierRef, Policy, TaskError, TaskFn, TimeWheel, TimerCallback,
    WheelConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct RunNow {
    notifier: NotifierRef,
}

#[async_trait]
impl TimerCallback for RunNow {
    async fn trigger(&self, ctx: &CancellationToken, task: &DelayTask) {
        println!("[wheel] {} fired after {:?}", task.id(), task.delay());
        let exec = Executor::new(task.task().clone(), Policy::Revert)
            .with_notifier(self.notifier.clone());
        if let Err(err) = exec.run(ctx).await {
            println!("[wheel] {} failed: {err}", task.id());
        }
    }
}

fn reminder(name: &'static str) -> Arc<dyn sagaflow::Task> {
    TaskFn::arc(
        name,
        move |_ctx: CancellationToken| async move {
            println!("[{name}] sending reminder");
            Ok::<_, TaskError>(())
        },
        |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    #[cfg(feature = "logging")]
    let notifier: NotifierRef = Arc::new(sagaflow::LogWriter::new());
    #[cfg(not(feature = "logging"))]
    let notifier: NotifierRef = Arc::new(sagaflow::NoopNotifier);

    let ctx = CancellationToken::new();
    let wheel = TimeWheel::builder(WheelConfig {
        tick: Duration::from_millis(100),
        slots: 10,
        ..WheelConfig::default()
    })
    .callback(Arc::new(RunNow {
        notifier: notifier.clone(),
    }))
    .notifier(notifier)
    .start(&ctx);

    wheel
        .add_timer(DelayTask::new(reminder("pay-invoice"), Duration::from_millis(300)))
        .await?;
    wheel
        .add_timer(DelayTask::new(reminder("renew-plan"), Duration::from_millis(600)))
        .await?;
    wheel.remove_timer("renew-plan").await?;

    tokio::time::sleep(Duration::from_secs(1)).await;
    wheel.shutdown().await;
    Ok(())
}
