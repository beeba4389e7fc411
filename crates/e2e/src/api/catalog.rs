//! Creature catalog API (`/pokemon/{id or name}`)

use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Instant;
use tracing::debug;

use super::{expect_status, http_client, Timed};
use crate::error::E2eResult;
use crate::expect_that;
use crate::fixture::Record;

/// How a creature is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatureKey {
    Id(u32),
    Name(String),
}

impl CreatureKey {
    /// Lookup by lowercased name, as the API expects
    pub fn name(name: &str) -> Self {
        CreatureKey::Name(name.to_lowercase())
    }
}

impl fmt::Display for CreatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatureKey::Id(id) => write!(f, "{}", id),
            CreatureKey::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilitySlot {
    #[serde(default)]
    pub ability: Option<NamedResource>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: Option<u32>,
}

/// The parts of a creature document the suite checks
#[derive(Debug, Clone, Deserialize)]
pub struct Creature {
    pub id: Option<u64>,
    pub name: Option<String>,
    #[serde(default)]
    pub abilities: Option<Vec<AbilitySlot>>,
}

impl Creature {
    /// Check the document describes `record`
    pub fn verify_against(&self, record: &Record) -> E2eResult<()> {
        expect_that!(
            self.id == Some(u64::from(record.id)),
            "expected id {}, got {:?}",
            record.id,
            self.id
        );

        let expected_name = record.name.to_lowercase();
        let name = self.name.as_deref().unwrap_or_default();
        expect_that!(!name.is_empty(), "response has no name");
        expect_that!(
            name == expected_name,
            "expected name '{}', got '{}'",
            expected_name,
            name
        );

        let abilities = self.abilities.as_deref().unwrap_or_default();
        expect_that!(!abilities.is_empty(), "'{}' has no abilities", name);
        for (i, slot) in abilities.iter().enumerate() {
            let ability = slot.ability.as_ref();
            expect_that!(ability.is_some(), "ability #{} has no 'ability' field", i);
            let ability_name = ability.and_then(|a| a.name.as_deref()).unwrap_or_default();
            expect_that!(!ability_name.is_empty(), "ability #{} has an empty name", i);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn creature_url(&self, key: &CreatureKey) -> String {
        format!("{}/pokemon/{}", self.base_url, key)
    }

    /// Fetch a creature; the elapsed time covers the whole body
    pub async fn lookup(&self, key: &CreatureKey) -> E2eResult<Timed<Creature>> {
        let url = self.creature_url(key);
        let start = Instant::now();

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let elapsed = start.elapsed();

        debug!("GET {} -> {} in {:?}", url, status, elapsed);
        expect_status(&url, status, StatusCode::OK)?;

        Ok(Timed {
            status,
            elapsed,
            body: serde_json::from_slice(&bytes)?,
        })
    }
}
