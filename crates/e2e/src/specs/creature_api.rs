//! Catalog lookups by id and by name for every fixture record

use std::sync::Arc;

use super::CREATURE_API_PROJECT;
use crate::api::{CatalogClient, CreatureKey};
use crate::config::{Endpoints, Limits};
use crate::error::E2eResult;
use crate::expect_that;
use crate::fixture::Record;
use crate::harness::Suite;
use crate::logger::TestLogger;

struct Shared {
    catalog_url: String,
    budget_ms: u64,
}

pub fn register(suite: &mut Suite, records: &[Record], endpoints: &Endpoints, limits: &Limits) {
    let shared = Arc::new(Shared {
        catalog_url: endpoints.catalog_url.clone(),
        budget_ms: limits.response_budget_ms,
    });

    let by_id = Arc::clone(&shared);
    suite.parametrize::<TestLogger, _, _, _>(
        CREATURE_API_PROJECT,
        records,
        |r| format!("Validate Pokemon by ID: {} ({})", r.id, r.name),
        move |_ctx, record, logger| {
            let shared = Arc::clone(&by_id);
            async move { validate(&shared, CreatureKey::Id(record.id), &record, logger).await }
        },
    );

    let by_name = shared;
    suite.parametrize::<TestLogger, _, _, _>(
        CREATURE_API_PROJECT,
        records,
        |r| format!("Validate Pokemon by name: {}", r.name),
        move |_ctx, record, logger| {
            let shared = Arc::clone(&by_name);
            async move {
                let key = CreatureKey::name(&record.name);
                validate(&shared, key, &record, logger).await
            }
        },
    );
}

async fn validate(shared: &Shared, key: CreatureKey, record: &Record, logger: TestLogger) -> E2eResult<()> {
    let client = CatalogClient::new(&shared.catalog_url)?;
    let response = client.lookup(&key).await?;

    let elapsed_ms = response.elapsed_ms();
    expect_that!(
        elapsed_ms < u128::from(shared.budget_ms),
        "response took {} ms, budget is {} ms",
        elapsed_ms,
        shared.budget_ms
    );
    response.body.verify_against(record)?;

    let subject = match key {
        CreatureKey::Id(id) => format!("Pokemon ID {}", id),
        CreatureKey::Name(_) => format!("Pokemon {}", record.name),
    };
    logger.log(format!(
        "Response time for {}: {}ms ({})",
        subject, elapsed_ms, response.status
    ));
    logger.end();
    Ok(())
}
