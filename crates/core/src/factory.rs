use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::ids::{system_clock, Clock, IdGenerator, IdStrategy};
use crate::types::{Category, CategoryAction, ID_FIELD, TIME_STAMP_FIELD};

/// Builds category actions for an external store.
///
/// Identifier generation and the clock are injected so callers can swap in
/// deterministic fakes. Every operation is total and synchronous.
#[derive(Clone)]
pub struct CategoryActionFactory {
    ids: IdGenerator,
    clock: Clock,
}

impl CategoryActionFactory {
    pub fn new(ids: IdGenerator, clock: Clock) -> Self {
        Self { ids, clock }
    }

    /// Uses the generator for `strategy` together with the system clock.
    pub fn with_strategy(strategy: IdStrategy) -> Self {
        Self::new(strategy.generator(), system_clock())
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Stamps a fresh identifier and creation instant onto `category`.
    ///
    /// Caller-supplied `id` and `timeStamp` values are overwritten, including
    /// copies that ended up in the opaque attribute map. All other attributes
    /// are carried over untouched.
    pub fn create(&self, mut category: Category) -> CategoryAction {
        category.fields.remove(ID_FIELD);
        category.fields.remove(TIME_STAMP_FIELD);

        let id = (self.ids)();
        let time_stamp = self.now();
        debug!(stage = "factory", category_id = %id, %time_stamp, "category stamped");

        category.id = Some(id);
        category.time_stamp = Some(time_stamp);
        CategoryAction::Create(category)
    }

    /// Wraps `category` unchanged. The presence of an `id` is not checked.
    pub fn update(&self, category: Category) -> CategoryAction {
        CategoryAction::Update(category)
    }

    /// Wraps `category` unchanged. The presence of an `id` is not checked.
    pub fn delete(&self, category: Category) -> CategoryAction {
        CategoryAction::Delete(category)
    }

    /// Signals that all category state should be discarded.
    pub fn reset(&self) -> CategoryAction {
        CategoryAction::Reset
    }
}

impl Default for CategoryActionFactory {
    fn default() -> Self {
        Self::with_strategy(IdStrategy::default())
    }
}

impl fmt::Debug for CategoryActionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryActionFactory").finish_non_exhaustive()
    }
}
