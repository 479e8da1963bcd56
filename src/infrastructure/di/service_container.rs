//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{
    GenerationService, QuestionnaireService, SearchService, Strategy, TieredCache,
};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::infrastructure::durable::FileDurableStore;
use crate::infrastructure::external::{
    CommandGenerator, CommandSearchProvider, NoSearch, UnavailableGenerator,
};
use crate::infrastructure::traits::{
    CommandRunner, FileSystem, RealCommandRunner, RealFileSystem, SearchProvider, TextGenerator,
};

/// Container holding all application services.
///
/// Built once per process; the cache inside is shared by every service.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Process-wide two-tier cache
    pub cache: Arc<TieredCache>,

    pub search: Arc<SearchService>,
    pub generation: Arc<GenerationService>,
    pub questionnaire: QuestionnaireService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(RealCommandRunner))
    }

    /// Create a service container with custom I/O (for testing).
    ///
    /// Collaborators are command-backed when a command is configured,
    /// otherwise the always-failing generator and the empty search apply.
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
    ) -> ApplicationResult<Self> {
        let generator: Arc<dyn TextGenerator> = match &settings.generator.command {
            Some(command) => Arc::new(CommandGenerator::new(
                cmd.clone(),
                command.clone(),
                settings.generator.args.clone(),
            )),
            None => Arc::new(UnavailableGenerator),
        };
        let provider: Arc<dyn SearchProvider> = match &settings.search.command {
            Some(command) => Arc::new(CommandSearchProvider::new(
                cmd,
                command.clone(),
                settings.search.args.clone(),
            )),
            None => Arc::new(NoSearch),
        };
        Self::with_collaborators(settings, fs, generator, provider)
    }

    /// Create a service container around given collaborators.
    pub fn with_collaborators(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        generator: Arc<dyn TextGenerator>,
        provider: Arc<dyn SearchProvider>,
    ) -> ApplicationResult<Self> {
        let settings = Arc::new(settings);
        let strategies = Strategy::resolve(&settings.generator.strategies)?;

        let cache = Arc::new(match &settings.cache.durable_dir {
            Some(dir) => {
                debug!("durable cache tier at {}", dir.display());
                let store = Arc::new(FileDurableStore::new(fs.clone(), dir.clone()));
                TieredCache::with_durable(settings.cache.capacity, store)
            }
            None => TieredCache::new(settings.cache.capacity),
        });

        let search = Arc::new(SearchService::new(
            provider,
            cache.clone(),
            settings.search.clone(),
            settings.cache.search_ttl_secs,
        ));
        let generation = Arc::new(GenerationService::new(
            generator,
            cache.clone(),
            strategies,
            settings.cache.tree_ttl_secs,
        ));
        let questionnaire = QuestionnaireService::new(search.clone(), generation.clone());

        Ok(Self {
            settings,
            fs,
            cache,
            search,
            generation,
            questionnaire,
        })
    }
}
