use std::sync::Arc;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use habit_domain::{Habit, HabitStore};
use habit_session::HabitService;
use habit_store::MemoryStore;

const OWNER: &str = "demo";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run().await {
        eprintln!("Failed to run habit dashboard: {err}");
    }
}

async fn run() -> Result<()> {
    let today = Local::now().date_naive();
    let store = Arc::new(MemoryStore::new());
    seed(&store, today).await?;

    let service = HabitService::builder(store.clone(), OWNER).build();
    service.refresh(today, today).await?;

    // Mark today's habits done and move running to the top of the list.
    service.toggle_completion(1, today, false).await?;
    service.toggle_completion(2, today, false).await?;
    service.reorder_habits(&[2, 1, 3]).await?;

    let snapshot = service.refresh(today, today).await?;
    tracing::info!(
        habits = snapshot.habits.len(),
        streak = snapshot.streak,
        efficiency = snapshot.efficiency,
        "dashboard derived"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn seed(store: &MemoryStore, today: NaiveDate) -> Result<()> {
    let habits = [
        ("Meditate", Some("🧘"), vec![], 0),
        ("Run", Some("🏃"), vec!["Mon", "Wed", "Fri"], 1),
        ("Read", Some("📚"), vec!["Sun"], 2),
    ];
    for (index, (name, icon, recurrence, position)) in habits.into_iter().enumerate() {
        store.insert_habit(
            OWNER,
            Habit {
                id: index as i64 + 1,
                name: name.to_string(),
                icon: icon.map(str::to_string),
                target_per_month: 20,
                recurrence: recurrence.into_iter().map(str::to_string).collect(),
                position,
                current_streak: 0,
                longest_streak: 0,
            },
        );
    }

    // A few days of history so the streak and the series have something to
    // show.
    for back in 1..=3 {
        let day = today - Days::new(back);
        store.upsert_completion_event(OWNER, 1, day).await?;
    }
    store
        .upsert_completion_event(OWNER, 2, today - Days::new(2))
        .await?;
    Ok(())
}
