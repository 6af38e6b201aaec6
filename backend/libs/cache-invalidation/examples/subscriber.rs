//! Example: Listening for interaction change notifications
//!
//! Run with: cargo run --example subscriber

use cache_invalidation::{ChangeSubscriber, InteractionTable};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let subscriber = ChangeSubscriber::new("redis://127.0.0.1:6379").await?;
    println!("Listening for interaction changes...");

    let handle = subscriber
        .subscribe(|msg| async move {
            let owner = msg
                .user_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown user".to_string());
            match msg.table {
                InteractionTable::Likes => {
                    println!("likes changed for {} ({:?}) via {}", owner, msg.action, msg.source_service)
                }
                InteractionTable::Follows => {
                    println!("follows changed for {} ({:?}) via {}", owner, msg.action, msg.source_service)
                }
            }
            Ok(())
        })
        .await?;

    tokio::signal::ctrl_c().await?;
    subscriber.unsubscribe(handle).await?;
    println!("{:?}", subscriber.stats());
    Ok(())
}
