//! Test registration and fixture composition
//!
//! A [`Suite`] owns the registered cases, the pre-test hooks and the data
//! provider. Resolution for one attempt of one case always happens in this
//! order:
//!
//! ```text
//! before_each hooks (registration order)   e.g. EncryptedKeyHook
//!   -> declared fixtures (tuple order)     TestLogger, TestData, EncryptedKey
//!     -> test body
//! ```
//!
//! Any error before the body fails the attempt without running the body.

use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::digest::EncryptedKey;
use crate::error::{E2eError, E2eResult};
use crate::fixture::{self, Record};
use crate::logger::TestLogger;

/// How [`TestData`] is served to the cases that request it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataPolicy {
    /// Every request re-reads the workbook
    #[default]
    ReloadPerTest,
    /// The first successful load is shared for the rest of the run
    SuiteScoped,
}

impl FromStr for DataPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").to_ascii_lowercase().as_str() {
            "reload_per_test" => Ok(DataPolicy::ReloadPerTest),
            "suite_scoped" => Ok(DataPolicy::SuiteScoped),
            other => Err(format!(
                "unknown data policy '{}' (expected reload-per-test or suite-scoped)",
                other
            )),
        }
    }
}

/// Source of fixture records for the [`TestData`] fixture
pub trait DataProvider: Send + Sync {
    fn policy(&self) -> DataPolicy;

    fn provide(&self) -> E2eResult<Arc<[Record]>>;
}

/// Provider backed by the fixture workbook
pub struct WorkbookProvider {
    path: PathBuf,
    policy: DataPolicy,
    cache: OnceCell<Arc<[Record]>>,
}

impl WorkbookProvider {
    pub fn new(path: impl Into<PathBuf>, policy: DataPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            cache: OnceCell::new(),
        }
    }

    fn load(&self) -> E2eResult<Arc<[Record]>> {
        debug!("Loading test data from {}", self.path.display());
        fixture::load(&self.path).map(Arc::from)
    }
}

impl DataProvider for WorkbookProvider {
    fn policy(&self) -> DataPolicy {
        self.policy
    }

    fn provide(&self) -> E2eResult<Arc<[Record]>> {
        match self.policy {
            DataPolicy::ReloadPerTest => self.load(),
            DataPolicy::SuiteScoped => self.cache.get_or_try_init(|| self.load()).cloned(),
        }
    }
}

/// Records handed to a case that declared the fixture
#[derive(Debug, Clone)]
pub struct TestData(Arc<[Record]>);

impl TestData {
    pub fn records(&self) -> &[Record] {
        &self.0
    }
}

impl Deref for TestData {
    type Target = [Record];

    fn deref(&self) -> &[Record] {
        &self.0
    }
}

/// Per-attempt state visible to hooks and test bodies
#[derive(Debug, Clone)]
pub struct CaseContext {
    name: String,
    project: String,
    attempt: u32,
    encrypted_key: Option<EncryptedKey>,
}

impl CaseContext {
    pub fn new(name: impl Into<String>, project: impl Into<String>, attempt: u32) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            attempt,
            encrypted_key: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Zero for the first run, incremented per retry
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn encrypted_key(&self) -> Option<&EncryptedKey> {
        self.encrypted_key.as_ref()
    }

    pub fn set_encrypted_key(&mut self, key: EncryptedKey) {
        self.encrypted_key = Some(key);
    }
}

/// Hook run before every attempt of every case
pub trait BeforeEach: Send + Sync {
    fn before_each(&self, ctx: &mut CaseContext) -> E2eResult<()>;
}

impl<F> BeforeEach for F
where
    F: Fn(&mut CaseContext) -> E2eResult<()> + Send + Sync,
{
    fn before_each(&self, ctx: &mut CaseContext) -> E2eResult<()> {
        self(ctx)
    }
}

/// Digests the environment secret and prints it before each test
pub struct EncryptedKeyHook {
    secret: String,
}

impl EncryptedKeyHook {
    pub fn new(config: &Config) -> Self {
        Self::from_secret(config.secret_key())
    }

    pub fn from_secret(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Block printed to stdout ahead of each test body
    pub fn banner(key: &EncryptedKey) -> String {
        format!(
            "\n========================================\nEncrypted Secret Key: {}\n========================================\n",
            key
        )
    }
}

impl fmt::Debug for EncryptedKeyHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedKeyHook")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl BeforeEach for EncryptedKeyHook {
    fn before_each(&self, ctx: &mut CaseContext) -> E2eResult<()> {
        let key = EncryptedKey::from_secret(&self.secret);
        println!("{}", Self::banner(&key));
        ctx.set_encrypted_key(key);
        Ok(())
    }
}

/// What fixture resolution can see
pub struct FixtureScope<'a> {
    pub ctx: &'a CaseContext,
    pub data: &'a dyn DataProvider,
}

/// A value a case can declare and receive before its body runs
pub trait Fixture: Sized + Send + 'static {
    fn resolve(scope: &FixtureScope<'_>) -> E2eResult<Self>;
}

impl Fixture for () {
    fn resolve(_scope: &FixtureScope<'_>) -> E2eResult<Self> {
        Ok(())
    }
}

impl Fixture for TestLogger {
    fn resolve(scope: &FixtureScope<'_>) -> E2eResult<Self> {
        Ok(TestLogger::new(scope.ctx.name()))
    }
}

impl Fixture for TestData {
    fn resolve(scope: &FixtureScope<'_>) -> E2eResult<Self> {
        scope.data.provide().map(TestData)
    }
}

impl Fixture for EncryptedKey {
    fn resolve(scope: &FixtureScope<'_>) -> E2eResult<Self> {
        scope.ctx.encrypted_key().cloned().ok_or_else(|| {
            E2eError::Fixture("no encrypted key in context; is EncryptedKeyHook registered?".to_string())
        })
    }
}

macro_rules! tuple_fixture {
    ($($name:ident),+) => {
        impl<$($name: Fixture),+> Fixture for ($($name,)+) {
            fn resolve(scope: &FixtureScope<'_>) -> E2eResult<Self> {
                Ok(($($name::resolve(scope)?,)+))
            }
        }
    };
}

tuple_fixture!(A);
tuple_fixture!(A, B);
tuple_fixture!(A, B, C);

/// Resolve `T` on the blocking pool; workbook reads are synchronous
async fn resolve_fixtures<T: Fixture>(ctx: &CaseContext, data: Arc<dyn DataProvider>) -> E2eResult<T> {
    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || {
        T::resolve(&FixtureScope {
            ctx: &ctx,
            data: data.as_ref(),
        })
    })
    .await
    .map_err(|e| E2eError::Fixture(format!("fixture resolution did not complete: {}", e)))?
}

pub type CaseFuture = BoxFuture<'static, E2eResult<()>>;

type CaseFn = Arc<dyn Fn(CaseContext) -> CaseFuture + Send + Sync>;

/// A registered case
#[derive(Clone)]
pub struct TestCase {
    pub name: String,
    pub project: String,
    run: CaseFn,
}

impl TestCase {
    /// Resolve fixtures and run the body for one attempt
    pub fn invoke(&self, ctx: CaseContext) -> CaseFuture {
        (self.run)(ctx)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("project", &self.project)
            .finish()
    }
}

/// Registry of cases, hooks and the data provider
pub struct Suite {
    data: Arc<dyn DataProvider>,
    hooks: Vec<Arc<dyn BeforeEach>>,
    cases: Vec<TestCase>,
}

impl Suite {
    pub fn new(data: Arc<dyn DataProvider>) -> Self {
        Self {
            data,
            hooks: Vec::new(),
            cases: Vec::new(),
        }
    }

    /// Register a hook to run before every case
    pub fn before_each<H>(&mut self, hook: H) -> &mut Self
    where
        H: BeforeEach + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn data_policy(&self) -> DataPolicy {
        self.data.policy()
    }

    /// Register a case declaring fixtures `T`
    pub fn test<T, F, Fut>(&mut self, project: &str, name: impl Into<String>, body: F) -> &mut Self
    where
        T: Fixture,
        F: Fn(CaseContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        let data = Arc::clone(&self.data);
        let body = Arc::new(body);
        let run: CaseFn = Arc::new(move |ctx: CaseContext| {
            let data = Arc::clone(&data);
            let body = Arc::clone(&body);
            async move {
                let fixtures = resolve_fixtures::<T>(&ctx, data).await?;
                (*body)(ctx, fixtures).await
            }
            .boxed()
        });

        self.cases.push(TestCase {
            name: name.into(),
            project: project.to_string(),
            run,
        });
        self
    }

    /// Register one case per record
    pub fn parametrize<T, N, F, Fut>(
        &mut self,
        project: &str,
        records: &[Record],
        name: N,
        body: F,
    ) -> &mut Self
    where
        T: Fixture,
        N: Fn(&Record) -> String,
        F: Fn(CaseContext, Record, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        let body = Arc::new(body);
        for record in records {
            let body = Arc::clone(&body);
            let row = record.clone();
            self.test::<T, _, _>(project, name(record), move |ctx, fixtures| {
                (*body)(ctx, row.clone(), fixtures)
            });
        }
        self
    }

    /// Build the context for one attempt by running every hook
    pub fn prepare(&self, case: &TestCase, attempt: u32) -> E2eResult<CaseContext> {
        let mut ctx = CaseContext::new(&case.name, &case.project, attempt);
        for hook in &self.hooks {
            hook.before_each(&mut ctx)?;
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        loads: AtomicUsize,
    }

    impl DataProvider for CountingProvider {
        fn policy(&self) -> DataPolicy {
            DataPolicy::ReloadPerTest
        }

        fn provide(&self) -> E2eResult<Arc<[Record]>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::from(vec![Record::new(25, "Pikachu")]))
        }
    }

    fn suite() -> (Suite, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider { loads: AtomicUsize::new(0) });
        (Suite::new(provider.clone()), provider)
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("suite-scoped".parse::<DataPolicy>().unwrap(), DataPolicy::SuiteScoped);
        assert_eq!("Reload_Per_Test".parse::<DataPolicy>().unwrap(), DataPolicy::ReloadPerTest);
        assert!("forever".parse::<DataPolicy>().is_err());
    }

    #[test]
    fn test_suite_reports_provider_policy() {
        let (suite, _) = suite();
        assert_eq!(suite.data_policy(), DataPolicy::ReloadPerTest);

        let scoped = Suite::new(Arc::new(WorkbookProvider::new("data.xlsx", DataPolicy::SuiteScoped)));
        assert_eq!(scoped.data_policy(), DataPolicy::SuiteScoped);
    }

    #[test]
    fn test_banner_format() {
        let key = EncryptedKey::from_secret("abc");
        assert_eq!(
            EncryptedKeyHook::banner(&key),
            format!(
                "\n========================================\nEncrypted Secret Key: {}\n========================================\n",
                key.as_str()
            )
        );
    }

    #[test]
    fn test_prepare_runs_hooks_in_order() {
        let (mut suite, _) = suite();
        suite.before_each(EncryptedKeyHook::from_secret("abc"));
        suite.before_each(|ctx: &mut CaseContext| -> E2eResult<()> {
            assert!(ctx.encrypted_key().is_some(), "key hook runs first");
            Ok(())
        });
        suite.test::<(), _, _>("unit", "noop", |_ctx, ()| async { Ok(()) });

        let ctx = suite.prepare(&suite.cases()[0], 1).unwrap();
        assert_eq!(ctx.attempt(), 1);
        assert_eq!(ctx.encrypted_key(), Some(&EncryptedKey::from_secret("abc")));
    }

    #[test]
    fn test_hook_failure_stops_prepare() {
        let (mut suite, _) = suite();
        suite.before_each(|_: &mut CaseContext| -> E2eResult<()> {
            Err(E2eError::Fixture("boom".into()))
        });
        suite.test::<(), _, _>("unit", "noop", |_ctx, ()| async { Ok(()) });
        assert!(suite.prepare(&suite.cases()[0], 0).is_err());
    }

    #[tokio::test]
    async fn test_fixtures_resolved_per_case() {
        let (mut suite, provider) = suite();
        suite.before_each(EncryptedKeyHook::from_secret("abc"));
        suite.test::<(TestLogger, TestData), _, _>("unit", "first", |ctx, (logger, data)| async move {
            assert_eq!(logger.test_name(), ctx.name());
            assert_eq!(data.len(), 1);
            Ok(())
        });
        suite.test::<TestLogger, _, _>("unit", "second", |_ctx, logger| async move {
            logger.end();
            Ok(())
        });
        suite.test::<TestData, _, _>("unit", "third", |_ctx, data| async move {
            assert_eq!(data[0].name, "Pikachu");
            Ok(())
        });

        for case in suite.cases() {
            let ctx = suite.prepare(case, 0).unwrap();
            case.invoke(ctx).await.unwrap();
        }
        assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
    }

    struct ThreadRecorder {
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl DataProvider for ThreadRecorder {
        fn policy(&self) -> DataPolicy {
            DataPolicy::ReloadPerTest
        }

        fn provide(&self) -> E2eResult<Arc<[Record]>> {
            self.threads.lock().unwrap().push(std::thread::current().id());
            Ok(Arc::from(vec![Record::new(1, "Bulbasaur")]))
        }
    }

    #[tokio::test]
    async fn test_data_loads_off_the_async_thread() {
        let recorder = Arc::new(ThreadRecorder {
            threads: std::sync::Mutex::new(Vec::new()),
        });
        let mut suite = Suite::new(recorder.clone());
        suite.test::<TestData, _, _>("unit", "reads data", |_ctx, data| async move {
            assert_eq!(data.records()[0].name, "Bulbasaur");
            Ok(())
        });

        let case = &suite.cases()[0];
        case.invoke(suite.prepare(case, 0).unwrap()).await.unwrap();

        let threads = recorder.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn test_encrypted_key_fixture_requires_hook() {
        let (mut suite, _) = suite();
        suite.test::<EncryptedKey, _, _>("unit", "keyed", |_ctx, _key| async { Ok(()) });
        let case = &suite.cases()[0];
        let err = case.invoke(suite.prepare(case, 0).unwrap()).await.unwrap_err();
        assert!(matches!(err, E2eError::Fixture(_)));
    }

    #[test]
    fn test_parametrize_registers_case_per_record() {
        let (mut suite, _) = suite();
        let records = vec![Record::new(25, "Pikachu"), Record::new(1, "Bulbasaur")];
        suite.parametrize::<(), _, _, _>(
            "unit",
            &records,
            |r| format!("Validate {}", r.name),
            |_ctx, _record, ()| async { Ok(()) },
        );
        let names: Vec<&str> = suite.cases().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Validate Pikachu", "Validate Bulbasaur"]);
    }
}
