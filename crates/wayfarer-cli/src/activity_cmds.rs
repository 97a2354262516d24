//! Operator-mode CLI handlers for `wayfarer activity` subcommands.

use anyhow::{Context, Result};
use sqlx::PgPool;

use wayfarer_core::ActivityDraft;
use wayfarer_core::itinerary;

use crate::ActivityCommands;
use crate::itinerary_cmds::print_activities;

/// Dispatch an `ActivityCommands` variant to the appropriate handler.
pub async fn run_activity_command(command: ActivityCommands, pool: &PgPool) -> Result<()> {
    match command {
        ActivityCommands::List { itinerary_id } => {
            let activities = itinerary::list_activities(pool, itinerary_id).await?;
            if activities.is_empty() {
                println!("No activities.");
            } else {
                print_activities(&activities);
            }
        }
        ActivityCommands::Replace {
            itinerary_id,
            user,
            file,
        } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read activities file: {file}"))?;
            let drafts = parse_drafts(&contents)
                .with_context(|| format!("failed to parse activities file: {file}"))?;
            let activities =
                itinerary::replace_activities(pool, itinerary_id, user, drafts).await?;
            println!("Replaced activity set: {} activities.", activities.len());
            println!();
            print_activities(&activities);
        }
        ActivityCommands::Delete { activity_id, user } => {
            itinerary::delete_activity(pool, activity_id, user).await?;
            println!("Activity {activity_id} deleted.");
        }
        ActivityCommands::Clear { itinerary_id, user } => {
            let removed = itinerary::delete_all_activities(pool, itinerary_id, user).await?;
            println!("Removed {removed} activities from itinerary {itinerary_id}.");
        }
    }
    Ok(())
}

/// A JSON array of drafts, or an object with an `activities` array (the
/// shape `wayfarer generate --json` and the bulk endpoint use).
fn parse_drafts(contents: &str) -> Result<Vec<ActivityDraft>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum DraftFile {
        List(Vec<ActivityDraft>),
        Wrapped { activities: Vec<ActivityDraft> },
    }

    let parsed: DraftFile = serde_json::from_str(contents)?;
    Ok(match parsed {
        DraftFile::List(drafts) | DraftFile::Wrapped { activities: drafts } => drafts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drafts_from_plain_array() {
        let drafts = parse_drafts(r#"[{"day_number": 1, "title": "Harbour walk"}]"#).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].duration_minutes, 60);
        assert_eq!(drafts[0].order_index, None);
    }

    #[test]
    fn drafts_from_wrapped_object() {
        let drafts = parse_drafts(
            r#"{
                "itinerary_id": "ignored-here",
                "activities": [{"day_number": 2, "title": "Museum", "estimated_cost": 15}]
            }"#,
        )
        .unwrap();
        assert_eq!(drafts[0].day_number, 2);
        assert_eq!(drafts[0].estimated_cost, 15.0);
    }

    #[test]
    fn generated_output_parses_back() {
        let generated = wayfarer_core::generate_seeded("Oslo", 1, 120.0, 9).unwrap();
        let json = serde_json::to_string(&generated).unwrap();
        assert_eq!(parse_drafts(&json).unwrap(), generated);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_drafts("{\"rows\": []}").is_err());
        assert!(parse_drafts("not json").is_err());
    }
}
