//! Sanity checks on the fixture workbook itself

use super::FIXTURE_DATA_PROJECT;
use crate::expect_that;
use crate::fixture::duplicate_names;
use crate::harness::{Suite, TestData};
use crate::logger::TestLogger;

pub fn register(suite: &mut Suite) {
    suite.test::<(TestLogger, TestData), _, _>(
        FIXTURE_DATA_PROJECT,
        "Fixture records are present and unique",
        |_ctx, (logger, data)| async move {
            expect_that!(!data.is_empty(), "fixture workbook has no valid records");

            let duplicates = duplicate_names(&data);
            expect_that!(
                duplicates.is_empty(),
                "duplicate names in fixture: {}",
                duplicates.join(", ")
            );

            logger.log(format!("{} fixture record(s) loaded", data.len()));
            logger.end();
            Ok(())
        },
    );
}
