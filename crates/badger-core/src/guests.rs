//! Typed guest collection on top of a [`Directory`].
//!
//! All guest lists are ordered by [`NAME_INDEX`]. Records that fail to decode
//! are logged and left out of lists rather than failing the whole snapshot.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::GuestsConfig;
use crate::directory::{is_valid_key, Child, Directory, Guard, ListQuery, WriteOutcome};
use crate::guest::{Guest, GuestDraft, GuestError, GuestResult, NAME_INDEX, STATUS_FIELD};
use crate::normalize::normalize;

/// Stream of guest-list snapshots.
pub type GuestStream = BoxStream<'static, GuestResult<Vec<Guest>>>;

/// Guest registration, lookup and search.
#[derive(Clone)]
pub struct GuestRepository {
    directory: Arc<dyn Directory>,
    settings: GuestsConfig,
}

impl GuestRepository {
    /// Create a repository over `directory` using the collection in `settings`.
    pub fn new(directory: Arc<dyn Directory>, settings: GuestsConfig) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Register a new guest with status `waiting`.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the directory failure.
    pub async fn add_guest(&self, draft: GuestDraft) -> GuestResult<Guest> {
        draft.validate(self.settings.min_name_length)?;
        let record = draft.into_record();
        let id = self
            .directory
            .create(&self.settings.path, record.clone())
            .await?;
        info!(guest_id = %id, "Registered guest");
        Guest::from_record(&id, record)
    }

    /// Look up a guest by id. Ids that cannot be directory keys match nobody.
    pub async fn get_guest(&self, id: &str) -> GuestResult<Option<Guest>> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        match self.directory.get_once(&path).await? {
            Some(value) => Guest::from_record(id, value).map(Some),
            None => Ok(None),
        }
    }

    /// Rewrite a guest's registration details. The admission status is kept.
    ///
    /// The write only lands while the record still exists, so a guest removed
    /// concurrently stays removed.
    ///
    /// # Errors
    ///
    /// Returns [`GuestError::NotFound`] if no such guest exists.
    pub async fn update_guest(&self, id: &str, draft: GuestDraft) -> GuestResult<Guest> {
        draft.validate(self.settings.min_name_length)?;
        let mut guest = self
            .get_guest(id)
            .await?
            .ok_or_else(|| GuestError::NotFound { id: id.to_string() })?;

        guest.name = draft.name.trim().to_string();
        guest.name_normalized = normalize(&guest.name);
        guest.guests = draft.guests;
        guest.table = draft.table;

        let Value::Object(mut fields) = guest.to_record() else {
            return Err(GuestError::Malformed {
                id: id.to_string(),
                message: "record is not an object".to_string(),
            });
        };
        fields.remove(STATUS_FIELD);

        let path = self.require_path(id)?;
        match self
            .directory
            .compare_and_patch(&path, &Guard::Exists, fields)
            .await?
        {
            WriteOutcome::Applied => {
                info!(guest_id = %id, "Updated guest");
                Ok(guest)
            }
            WriteOutcome::Rejected { .. } => {
                warn!(guest_id = %id, "Guest removed before update");
                Err(GuestError::NotFound { id: id.to_string() })
            }
        }
    }

    /// Delete a guest.
    ///
    /// # Errors
    ///
    /// Returns [`GuestError::NotFound`] if the id cannot name a guest.
    pub async fn remove_guest(&self, id: &str) -> GuestResult<()> {
        let path = self.require_path(id)?;
        self.directory.remove(&path).await?;
        info!(guest_id = %id, "Removed guest");
        Ok(())
    }

    /// Every guest, ordered by normalized name.
    pub async fn list_guests(&self) -> GuestResult<Vec<Guest>> {
        let children = self
            .directory
            .get_once_list(&self.settings.path, &ListQuery::ordered_by(Some(NAME_INDEX)))
            .await?;
        Ok(decode_all(children))
    }

    /// Guests whose normalized name starts with `normalize(name)`, read once.
    pub async fn find_guests(&self, name: &str) -> GuestResult<Vec<Guest>> {
        let query = ListQuery::prefix(NAME_INDEX, &normalize(name), Some(self.settings.search_limit));
        let children = self
            .directory
            .get_once_list(&self.settings.path, &query)
            .await?;
        Ok(decode_all(children))
    }

    /// Live snapshots of every guest, ordered by normalized name.
    #[must_use]
    pub fn guests(&self) -> GuestStream {
        decode_stream(
            self.directory
                .observe_list(&self.settings.path, Some(NAME_INDEX)),
        )
    }

    /// Live snapshots of the guests matching a name prefix.
    #[must_use]
    pub fn search_guests(&self, name: &str) -> GuestStream {
        decode_stream(self.directory.observe_search(
            &self.settings.path,
            NAME_INDEX,
            &normalize(name),
            Some(self.settings.search_limit),
        ))
    }

    /// The underlying directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    /// Directory path of the record for `id`, if `id` is a valid key.
    #[must_use]
    pub fn record_path(&self, id: &str) -> Option<String> {
        is_valid_key(id).then(|| format!("{}/{id}", self.settings.path.trim_end_matches('/')))
    }

    fn require_path(&self, id: &str) -> GuestResult<String> {
        self.record_path(id)
            .ok_or_else(|| GuestError::NotFound { id: id.to_string() })
    }
}

fn decode_stream(children: crate::directory::ListStream) -> GuestStream {
    children
        .map(|snapshot| snapshot.map(decode_all).map_err(GuestError::from))
        .boxed()
}

fn decode_all(children: Vec<Child>) -> Vec<Guest> {
    children
        .into_iter()
        .filter_map(|child| match Guest::from_record(&child.key, child.value) {
            Ok(guest) => Some(guest),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable guest record");
                None
            }
        })
        .collect()
}

/// Single-field patch body.
pub(crate) fn field(name: &str, value: Value) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(name.to_string(), value);
    fields
}
