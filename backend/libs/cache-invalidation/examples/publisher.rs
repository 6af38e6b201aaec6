//! Example: Publishing interaction change notifications
//!
//! Run with: cargo run --example publisher

use cache_invalidation::{
    ChangeAction, ChangeNotification, ChangePublisher, ChangeSink, InteractionTable,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let redis_url = "redis://127.0.0.1:6379";
    let publisher = ChangePublisher::new(redis_url, "media-service".to_string()).await?;
    let user_id = Uuid::new_v4();

    println!("1. Like added by {}", user_id);
    let subscribers = publisher.notify_like(user_id, ChangeAction::Insert).await?;
    println!("   notified {} subscribers", subscribers);

    println!("2. Follow removed by {}", user_id);
    let subscribers = publisher.notify_follow(user_id, ChangeAction::Delete).await?;
    println!("   notified {} subscribers", subscribers);

    println!("3. Bare hint (bulk import touched the likes table)");
    let subscribers = publisher
        .publish(ChangeNotification::hint(
            InteractionTable::Likes,
            "seed-import".to_string(),
        ))
        .await?;
    println!("   notified {} subscribers", subscribers);

    println!("{:?}", publisher.stats());
    Ok(())
}
