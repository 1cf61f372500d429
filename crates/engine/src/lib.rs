//! Grimoire Engine library.
//!
//! The compendium engine behind the Grimoire virtual-tabletop add-on:
//! ingestion of versioned JSON game-data bundles, cross-linking between
//! collections, dependency-ordered loading, and name/attribute lookup.
//!
//! ## Structure
//!
//! - `compendium/` - the entity store, processor pipeline, and dependency
//!   tracker
//! - `validation/` - the declarative JSON validator
//! - `infrastructure/` - adapters around the core (bundle file importer)

pub mod compendium;
pub mod infrastructure;
pub mod validation;

pub use compendium::{
    AcceptAll, Collection, Collections, Compendium, EntityProcessor, ExactVersion,
    MonsterSpellUpdater, ProcessorError, SpellHydrator, VersionChecker,
    DEFAULT_DEPENDENCY_TIMEOUT,
};
pub use validation::JsonValidator;
