use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use std::collections::HashSet;
use std::env;
use std::fs;
use uuid::Uuid;
use vivid_decks::deck_store::parse_collection;
use vivid_decks::{Card, Deck, PromotionLevel};

#[derive(Debug, Default)]
struct MigrationStats {
    decks_converted: usize,
    cards_converted: usize,
    ids_resynthesized: usize,
    levels_clamped: usize,
    cards_skipped: usize,
    warnings: Vec<String>,
}

impl MigrationStats {
    fn print_summary(&self, dry_run: bool) {
        println!("\n=== Migration Summary ===");
        println!("Decks converted: {}", self.decks_converted);
        println!("Cards converted: {}", self.cards_converted);
        println!("Ids re-synthesized: {}", self.ids_resynthesized);
        println!("Levels clamped into 1..=5: {}", self.levels_clamped);
        println!("Cards skipped: {}", self.cards_skipped);

        if !self.warnings.is_empty() {
            println!("Warnings: {}", self.warnings.len());
            for warning in &self.warnings {
                println!("  - {}", warning);
            }
        }

        if dry_run {
            println!("\n** DRY RUN MODE - No file was written **");
        }
    }
}

/// Legacy ids are numbers (timestamps) or strings; both become strings.
/// Missing, blank and repeated ids get a fresh uuid.
fn legacy_id(value: Option<&Value>, seen: &mut HashSet<String>, stats: &mut MigrationStats) -> String {
    let id = match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    match id {
        Some(id) if seen.insert(id.clone()) => id,
        _ => {
            stats.ids_resynthesized += 1;
            let fresh = Uuid::new_v4().to_string();
            seen.insert(fresh.clone());
            fresh
        }
    }
}

fn legacy_level(card: &Value, stats: &mut MigrationStats) -> PromotionLevel {
    let raw = card
        .get("promotion_level")
        .or_else(|| card.get("box"))
        .and_then(Value::as_i64);

    match raw {
        Some(level) => {
            let clamped = PromotionLevel::clamped(level);
            if i64::from(clamped.value()) != level {
                stats.levels_clamped += 1;
            }
            clamped
        }
        None => PromotionLevel::default(),
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn convert_backup(root: &Value, stats: &mut MigrationStats) -> Result<Vec<Deck>> {
    let decks = root
        .as_array()
        .ok_or_else(|| anyhow!("backup must be a JSON array of decks"))?;

    let mut deck_ids = HashSet::new();
    let mut card_ids = HashSet::new();
    let mut converted = Vec::with_capacity(decks.len());

    for (index, legacy) in decks.iter().enumerate() {
        let Some(name) = text_field(legacy, "name") else {
            bail!("deck {} has no name", index + 1);
        };

        let mut deck = Deck::new(legacy_id(legacy.get("id"), &mut deck_ids, stats), name);
        deck.description = text_field(legacy, "description");
        if let Some(existing) = legacy.get("stats") {
            deck.stats = serde_json::from_value(existing.clone()).unwrap_or_default();
        }

        for card in legacy.get("cards").and_then(Value::as_array).into_iter().flatten() {
            let (Some(front), Some(back)) = (text_field(card, "front"), text_field(card, "back")) else {
                stats.cards_skipped += 1;
                stats
                    .warnings
                    .push(format!("deck \"{}\": skipped a card with an empty side", deck.name));
                continue;
            };
            let id = legacy_id(card.get("id"), &mut card_ids, stats);
            let promotion_level = legacy_level(card, stats);
            deck.cards.push(Card {
                promotion_level,
                ..Card::new(id, front, back)
            });
            stats.cards_converted += 1;
        }

        stats.decks_converted += 1;
        converted.push(deck);
    }

    Ok(converted)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let Some(input) = paths.first() else {
        println!("Usage: migrate_backup <legacy-backup.json> [output.json] [--dry-run]");
        return Ok(());
    };
    let output = paths
        .get(1)
        .map(|p| p.to_string())
        .unwrap_or_else(|| "vivid_backup.json".to_string());

    println!("=== Legacy Backup Migration Tool ===");
    if dry_run {
        println!("** RUNNING IN DRY-RUN MODE **");
    }

    let raw = fs::read(input.as_str()).with_context(|| format!("cannot read {}", input))?;
    let root: Value = serde_json::from_slice(&raw).context("backup is not valid JSON")?;

    let mut stats = MigrationStats::default();
    let decks = convert_backup(&root, &mut stats)?;
    let bytes = serde_json::to_vec_pretty(&decks)?;

    // the result must load through the same path a backup import uses
    parse_collection(&bytes).map_err(|e| anyhow!("converted backup is invalid: {}", e))?;

    if !dry_run {
        fs::write(&output, &bytes).with_context(|| format!("cannot write {}", output))?;
        println!("\n✓ Wrote {}", output);
    }

    stats.print_summary(dry_run);
    Ok(())
}
