//! # Example: checkout_saga
//!
//! A three-step checkout where payment fails after stock was reserved.
//! The executor retries the payment, gives up, rolls it back, and the flow's
//! compensation pass releases the stock.
//!
//! ## Flow
//! ```text
//! SequentialFlow::run()
//!   ├─► reserve-stock  → Ok
//!   ├─► charge-card    → Err("card declined") ×3 (Policy::Retry, attempts=2)
//!   │     └─► charge-card.rollback
//!   └─► ship-order     (never runs)
//! SequentialFlow::compensate()
//!   └─► reserve-stock.rollback
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example checkout_saga --features logging
//! RUST_LOG=sagaflow=debug cargo run --example checkout_saga --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use sagaflow::{Config, FlowBuilder, NotifierRef, Policy, TaskError, TaskFn, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn step(name: &'static str, fail: Option<&'static str>) -> TaskRef {
    TaskFn::arc(
        name,
        move |_ctx: CancellationToken| async move {
            println!("[{name}] commit");
            match fail {
                Some(reason) => Err(TaskError::fail(reason)),
                None => Ok(()),
            }
        },
        move |_ctx: CancellationToken| async move {
            println!("[{name}] rollback");
            Ok(())
        },
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

    let flow = FlowBuilder::new(
        Config::new(Policy::Retry)
            .with_name("checkout")
            .with_attempts(2)
            .with_interval(Duration::from_millis(50))
            .with_notifier(notifier),
    )
    .task(step("reserve-stock", None))
    .task(step("charge-card", Some("card declined")))
    .task(step("ship-order", None))
    .sequential();

    let ctx = CancellationToken::new();
    if let Err(err) = flow.run(&ctx).await {
        println!("[checkout] failed: {err}");
        flow.compensate(&ctx).await?;
        println!("[checkout] compensated");
    }
    Ok(())
}
