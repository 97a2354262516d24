//! Operator-mode CLI handlers for `wayfarer itinerary` subcommands.
//!
//! The operator acts on behalf of the user named with `--user`; ownership
//! rules apply exactly as they do over HTTP.

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use wayfarer_core::Planner;
use wayfarer_core::itinerary::{
    self, BudgetSummary, ItineraryDetail, ItineraryFilter, NewItinerary,
};
use wayfarer_core::planner::planner_rng;
use wayfarer_db::models::{Activity, Visibility};

use crate::ItineraryCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch an `ItineraryCommands` variant to the appropriate handler.
pub async fn run_itinerary_command(
    command: ItineraryCommands,
    pool: &PgPool,
    planner: &Planner,
) -> Result<()> {
    match command {
        ItineraryCommands::List { user, filter } => cmd_list(pool, user, filter.into()).await,
        ItineraryCommands::Stats { user } => cmd_stats(pool, user).await,
        ItineraryCommands::Show { id, user } => cmd_show(pool, id, user).await,
        ItineraryCommands::Create {
            user,
            destination,
            start,
            end,
            budget,
            preference,
            public,
            notes,
            plan,
            seed,
        } => {
            let input = NewItinerary {
                destination,
                start_date: start,
                end_date: end,
                budget,
                preferences: preference,
                visibility: Visibility::from_public_flag(public),
                notes,
            };
            cmd_create(pool, planner, user, input, plan, seed).await
        }
        ItineraryCommands::Regenerate { id, user, seed } => {
            let mut rng = planner_rng(seed);
            let activities =
                itinerary::regenerate_activities(pool, planner, id, user, &mut rng).await?;
            println!("Regenerated {} activities.", activities.len());
            println!();
            print_activities(&activities);
            Ok(())
        }
        ItineraryCommands::Delete { id, user } => {
            itinerary::delete_itinerary(pool, id, user).await?;
            println!("Itinerary {id} deleted.");
            Ok(())
        }
        ItineraryCommands::Budget { id, user } => {
            let summary = itinerary::budget_summary(pool, id, user).await?;
            print_summary(&summary);
            Ok(())
        }
    }
}

// -----------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool, user: Option<Uuid>, filter: ItineraryFilter) -> Result<()> {
    let itineraries = match user {
        Some(user) => itinerary::list_itineraries(pool, user, filter).await?,
        None => itinerary::list_public_itineraries(pool, filter).await?,
    };

    if itineraries.is_empty() {
        println!("No itineraries found.");
        return Ok(());
    }

    let dest_w = itineraries
        .iter()
        .map(|i| i.destination.len())
        .max()
        .unwrap_or(11)
        .max(11);

    println!(
        "{:<36}  {:<dest_w$}  {:<10}  {:<10}  {:>10}  VISIBILITY",
        "ID", "DESTINATION", "START", "END", "BUDGET",
    );
    for i in &itineraries {
        println!(
            "{:<36}  {:<dest_w$}  {:<10}  {:<10}  {:>10.2}  {}",
            i.id, i.destination, i.start_date, i.end_date, i.budget, i.visibility,
        );
    }
    Ok(())
}

async fn cmd_stats(pool: &PgPool, user: Uuid) -> Result<()> {
    let today = Utc::now().date_naive();
    let stats = itinerary::trip_stats(pool, user, today).await?;
    println!("Total trips:    {}", stats.total_trips);
    println!("Upcoming trips: {}", stats.upcoming_trips);
    println!("Total budget:   {:.2}", stats.total_budget);
    Ok(())
}

async fn cmd_show(pool: &PgPool, id: Uuid, user: Option<Uuid>) -> Result<()> {
    let detail = itinerary::get_itinerary(pool, id, user).await?;
    print_detail(&detail);
    Ok(())
}

async fn cmd_create(
    pool: &PgPool,
    planner: &Planner,
    user: Uuid,
    input: NewItinerary,
    plan: bool,
    seed: Option<u64>,
) -> Result<()> {
    if plan {
        let mut rng = planner_rng(seed);
        let detail =
            itinerary::create_planned_itinerary(pool, planner, user, input, &mut rng).await?;
        println!("Itinerary created with a generated schedule.");
        println!();
        print_detail(&detail);
    } else {
        let view = itinerary::create_itinerary(pool, user, input).await?;
        println!("Itinerary created.");
        println!("  ID:           {}", view.id);
        println!("  Days:         {}", view.day_count);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Output
// -----------------------------------------------------------------------

fn print_detail(detail: &ItineraryDetail) {
    let it = &detail.itinerary;
    println!("Itinerary: {}", it.destination);
    println!("  ID:           {}", it.id);
    println!("  Owner:        {}", it.user_id);
    println!(
        "  Dates:        {} to {} ({} days)",
        it.start_date, it.end_date, it.day_count
    );
    println!("  Budget:       {:.2}", it.budget);
    println!("  Visibility:   {}", it.visibility);
    if !it.preferences.is_empty() {
        println!("  Preferences:  {}", it.preferences.join(", "));
    }
    if let Some(notes) = &it.notes {
        println!("  Notes:        {notes}");
    }
    println!(
        "  Created:      {}",
        it.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if !detail.activities.is_empty() {
        println!();
        print_activities(&detail.activities);
    }
    println!();
    print_summary(&detail.summary);
}

pub(crate) fn print_activities(activities: &[Activity]) {
    let mut current_day = None;
    for a in activities {
        if current_day != Some(a.day_number) {
            println!("Day {}", a.day_number);
            current_day = Some(a.day_number);
        }
        println!(
            "  {:>2}. {:<5}  {}  ({} min, {:.2})",
            a.order_index,
            a.start_time.as_deref().unwrap_or("--:--"),
            a.title,
            a.duration_minutes,
            a.estimated_cost,
        );
        println!("      id: {}", a.id);
    }
}

fn print_summary(summary: &BudgetSummary) {
    println!("Budget:         {:.2}", summary.budget);
    println!("  Per day:      {:.2}", summary.daily_budget);
    println!("  Estimated:    {:.2}", summary.total_estimated_cost);
    println!(
        "  Remaining:    {:.2}{}",
        summary.remaining,
        if summary.over_budget { " (over budget)" } else { "" }
    );
    if summary.budget_changed {
        if let Some(generated) = summary.generated_budget {
            println!(
                "  Note: activities were generated for a budget of {generated:.2}; \
                 run `wayfarer itinerary regenerate` to refresh them."
            );
        }
    }
}
