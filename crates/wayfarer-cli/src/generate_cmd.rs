//! `wayfarer generate`: preview a generated schedule without a database.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::NaiveDate;

use wayfarer_core::itinerary::validate::validate_trip;
use wayfarer_core::planner::planner_rng;
use wayfarer_core::{ActivityDraft, Planner};
use wayfarer_db::models::day_span;

pub struct GenerateArgs<'a> {
    pub destination: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub seed: Option<u64>,
    pub json: bool,
}

pub fn run_generate(planner: &Planner, args: &GenerateArgs<'_>) -> Result<()> {
    validate_trip(args.destination, args.start_date, args.end_date, args.budget)?;
    let days = day_span(args.start_date, args.end_date);
    let allocation = planner.policy.allocate(args.budget, days)?;

    let mut rng = planner_rng(args.seed);
    let drafts = planner.generate(args.destination.trim(), days, args.budget, &mut rng)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(());
    }

    println!(
        "{} for {days} day(s): {:.2}/day, {} band",
        args.destination.trim(),
        allocation.daily_budget,
        allocation.band
    );
    println!();
    print!("{}", render_schedule(&drafts));
    Ok(())
}

/// One line per activity, with a blank line between days and a total.
pub fn render_schedule(drafts: &[ActivityDraft]) -> String {
    let title_w = drafts
        .iter()
        .map(|d| d.title.len())
        .max()
        .unwrap_or(5)
        .max(5);

    let mut out = String::new();
    let mut current_day = None;
    for d in drafts {
        if current_day != Some(d.day_number) {
            if current_day.is_some() {
                out.push('\n');
            }
            let _ = writeln!(out, "Day {}", d.day_number);
            current_day = Some(d.day_number);
        }
        let _ = writeln!(
            out,
            "  {:<5}  {:<title_w$}  {:>4} min  {:>8.2}",
            d.start_time.as_deref().unwrap_or("--:--"),
            d.title,
            d.duration_minutes,
            d.estimated_cost,
        );
    }
    let total: f64 = drafts.iter().map(|d| d.estimated_cost).sum();
    let _ = writeln!(out, "\nEstimated total: {total:.2}");
    out
}
