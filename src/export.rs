// 📤 Card Export - text table, JSON and CSV listings of display cards

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::projection::{DisplayCard, StatKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// One flat CSV row per card
#[derive(Debug, Serialize)]
pub struct CardRow<'a> {
    pub id: u32,
    pub name: &'a str,
    pub types: String,
    pub hp: i64,
    pub attack: i64,
    pub defense: i64,
    pub special_attack: i64,
    pub artwork_url: &'a str,
}

impl<'a> From<&'a DisplayCard> for CardRow<'a> {
    fn from(card: &'a DisplayCard) -> Self {
        CardRow {
            id: card.id,
            name: &card.name,
            types: type_list(card, "|"),
            hp: card.stat(StatKind::Hp).value,
            attack: card.stat(StatKind::Attack).value,
            defense: card.stat(StatKind::Defense).value,
            special_attack: card.stat(StatKind::SpecialAttack).value,
            artwork_url: &card.artwork_url,
        }
    }
}

fn type_list(card: &DisplayCard, separator: &str) -> String {
    card.types
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn write_cards<W: Write>(out: W, cards: &[DisplayCard], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(out, cards),
        OutputFormat::Json => write_json(out, cards),
        OutputFormat::Csv => write_csv(out, cards),
    }
}

pub fn write_json<W: Write>(mut out: W, cards: &[DisplayCard]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, cards).context("Failed to serialize cards")?;
    writeln!(out)?;
    Ok(())
}

pub fn write_csv<W: Write>(out: W, cards: &[DisplayCard]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for card in cards {
        writer
            .serialize(CardRow::from(card))
            .with_context(|| format!("Failed to write CSV row for {}", card.name))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_table<W: Write>(mut out: W, cards: &[DisplayCard]) -> Result<()> {
    if cards.is_empty() {
        writeln!(out, "No creatures found")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>4}  {:<14} {:<18} {:>4} {:>4} {:>4} {:>6}",
        "#", "Name", "Types", "HP", "ATK", "DEF", "SP.ATK"
    )?;
    for card in cards {
        writeln!(
            out,
            "{:>4}  {:<14} {:<18} {:>4} {:>4} {:>4} {:>6}",
            card.id,
            card.name,
            type_list(card, "/"),
            card.stat(StatKind::Hp).value,
            card.stat(StatKind::Attack).value,
            card.stat(StatKind::Defense).value,
            card.stat(StatKind::SpecialAttack).value,
        )?;
    }
    writeln!(out, "\n{} creature(s)", cards.len())?;
    Ok(())
}
