mod food;
mod grooming_session;
mod health_event;
mod pet;
mod species;
mod treatment;
mod weight_entry;

pub use food::Food;
pub use grooming_session::GroomingSession;
pub use health_event::HealthEvent;
pub use pet::Pet;
pub use species::Species;
pub use treatment::{Treatment, TreatmentKind};
pub use weight_entry::WeightEntry;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A domain model persisted as a document row in one local table.
///
/// The store assigns the integer identifier on insert; models start out
/// with `id: None`.
pub trait Document: Serialize + DeserializeOwned {
    /// Local table (and remote collection) this model lives in.
    const TABLE: &'static str;

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);
}

impl Document for Pet {
    const TABLE: &'static str = "pets";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Document for WeightEntry {
    const TABLE: &'static str = "weights";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Document for Treatment {
    const TABLE: &'static str = "treatments";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Document for GroomingSession {
    const TABLE: &'static str = "groomings";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Document for HealthEvent {
    const TABLE: &'static str = "health_events";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Document for Food {
    const TABLE: &'static str = "foods";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}
