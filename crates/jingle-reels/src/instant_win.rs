//! Instant-win prize pool
//!
//! The host supplies the unclaimed prize catalog at construction and keeps it
//! current with [`PrizeUpdate`]s from its live feed. Each spin may pool one
//! unclaimed prize into the strip.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::rng::SpinRng;

/// Prize catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: Option<i64>,
    /// Strip weight while pooled (0 = engine default)
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub claimed: bool,
}

impl PrizeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: None,
            weight: 0,
            claimed: false,
        }
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Incremental catalog change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PrizeUpdate {
    /// Insert a new prize or replace one with the same id
    Upsert { prize: PrizeRecord },
    /// Delete by id
    Remove { id: String },
    /// Reload the whole catalog
    ReplaceAll { prizes: Vec<PrizeRecord> },
}

/// A prize pooled into the current spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PooledPrize {
    pub prize: PrizeRecord,
    /// Copies of the reserved symbol on the strip
    pub weight: u32,
}

/// Live prize catalog
#[derive(Debug, Clone, Default)]
pub struct PrizePool {
    prizes: Vec<PrizeRecord>,
    claimed_here: HashSet<String>,
    default_weight: u32,
}

impl PrizePool {
    pub fn new(prizes: Vec<PrizeRecord>, default_weight: u32) -> Self {
        Self {
            prizes,
            claimed_here: HashSet::new(),
            default_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PrizeRecord> {
        self.prizes.iter().find(|p| p.id == id)
    }

    pub fn prizes(&self) -> &[PrizeRecord] {
        &self.prizes
    }

    /// Prizes still available this session
    pub fn unclaimed(&self) -> impl Iterator<Item = &PrizeRecord> {
        self.prizes
            .iter()
            .filter(|p| !p.claimed && !self.claimed_here.contains(&p.id))
    }

    /// Apply a live update. Prizes claimed in this session stay claimed.
    pub fn apply(&mut self, update: PrizeUpdate) {
        match update {
            PrizeUpdate::Upsert { prize } => {
                log::debug!("Prize upsert: {}", prize.id);
                match self.prizes.iter_mut().find(|p| p.id == prize.id) {
                    Some(existing) => *existing = prize,
                    None => self.prizes.push(prize),
                }
            }
            PrizeUpdate::Remove { id } => {
                log::debug!("Prize removed: {id}");
                self.prizes.retain(|p| p.id != id);
            }
            PrizeUpdate::ReplaceAll { prizes } => {
                log::debug!("Prize catalog reloaded: {} entries", prizes.len());
                self.prizes = prizes;
            }
        }
        let claimed_here = &self.claimed_here;
        for prize in &mut self.prizes {
            if claimed_here.contains(&prize.id) {
                prize.claimed = true;
            }
        }
    }

    /// Mark a prize claimed locally
    pub fn mark_claimed(&mut self, id: &str) -> Option<PrizeRecord> {
        self.claimed_here.insert(id.to_string());
        let prize = self.prizes.iter_mut().find(|p| p.id == id)?;
        prize.claimed = true;
        Some(prize.clone())
    }

    /// Roll `chance`, then pick one unclaimed prize uniformly
    pub fn draw(&self, chance: f64, rng: &mut SpinRng) -> Option<PooledPrize> {
        let candidates: Vec<&PrizeRecord> = self.unclaimed().collect();
        if candidates.is_empty() || !rng.chance(chance) {
            return None;
        }
        let prize = (*rng.pick(&candidates)?).clone();
        Some(self.pool(prize))
    }

    /// Pool a specific unclaimed prize
    pub fn pool_by_id(&self, id: &str) -> Option<PooledPrize> {
        let prize = self.unclaimed().find(|p| p.id == id)?.clone();
        Some(self.pool(prize))
    }

    fn pool(&self, prize: PrizeRecord) -> PooledPrize {
        let weight = if prize.weight > 0 {
            prize.weight
        } else {
            self.default_weight
        };
        PooledPrize { prize, weight }
    }
}
