//! Find-or-create: load a matching stored record, or save the bound one.
//!
//! [`Binder::save_if_not_exist`] runs a query first. A match replaces the
//! bound record with the stored row, with the binder's tracked values
//! re-applied, and nothing is saved. No match runs the normal save and
//! re-reads the stored record.

use tracing::{debug, info};

use crate::binder::Binder;
use crate::error::{Error, Result};
use crate::model::ModelEvents;
use crate::transaction::{Query, Row, Transaction};

type Callback<'c, M> = Box<dyn FnMut(&mut Binder<'_, M>) -> Result<()> + 'c>;

/// Callbacks for [`Binder::save_if_not_exist`]. An error from any of them
/// aborts the workflow.
pub struct SaveCallbacks<'c, M: ModelEvents> {
    on_create: Option<Callback<'c, M>>,
    on_created: Option<Callback<'c, M>>,
    on_load: Option<Callback<'c, M>>,
}

impl<'c, M: ModelEvents> SaveCallbacks<'c, M> {
    /// No callbacks.
    pub fn new() -> Self {
        Self {
            on_create: None,
            on_created: None,
            on_load: None,
        }
    }

    /// Runs before the save when no record matched.
    pub fn on_create(mut self, f: impl FnMut(&mut Binder<'_, M>) -> Result<()> + 'c) -> Self {
        self.on_create = Some(Box::new(f));
        self
    }

    /// Runs after the new record was saved and re-read.
    pub fn on_created(mut self, f: impl FnMut(&mut Binder<'_, M>) -> Result<()> + 'c) -> Self {
        self.on_created = Some(Box::new(f));
        self
    }

    /// Runs after a matching record was loaded.
    pub fn on_load(mut self, f: impl FnMut(&mut Binder<'_, M>) -> Result<()> + 'c) -> Self {
        self.on_load = Some(Box::new(f));
        self
    }
}

impl<M: ModelEvents> Default for SaveCallbacks<'_, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ModelEvents> std::fmt::Debug for SaveCallbacks<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveCallbacks")
            .field("on_create", &self.on_create.is_some())
            .field("on_created", &self.on_created.is_some())
            .field("on_load", &self.on_load.is_some())
            .finish()
    }
}

fn run<M: ModelEvents>(
    callback: Option<&mut Callback<'_, M>>,
    binder: &mut Binder<'_, M>,
) -> Result<()> {
    match callback {
        Some(f) => f(binder),
        None => Ok(()),
    }
}

impl<M: ModelEvents> Binder<'_, M> {
    /// Load the first record matching `query`, or save the bound record.
    ///
    /// Returns `true` when a record was created. On a match the bound record
    /// becomes the stored one with this binder's tracked values applied on
    /// top, and `on_load` runs. Otherwise `on_create` runs, the record is
    /// saved, re-read with the query's selection, and `on_created` runs.
    ///
    /// `NotFound` from the query, or no rows, means no match. Any other
    /// query error is returned.
    #[tracing::instrument(level = "debug", skip_all, fields(model = M::TABLE_NAME))]
    pub fn save_if_not_exist(
        &mut self,
        tx: &mut dyn Transaction,
        query: &Query,
        mut callbacks: SaveCallbacks<'_, M>,
    ) -> Result<bool> {
        if let Some(row) = first_match(tx.query(self.cx(), query))? {
            debug!(model = M::TABLE_NAME, "found existing record");
            self.reload(&row)?;
            run(callbacks.on_load.as_mut(), self)?;
            return Ok(false);
        }

        run(callbacks.on_create.as_mut(), self)?;
        self.save(tx)?;

        let id = self.identifier().ok_or_else(|| {
            Error::Transaction(format!("saved {} has no identifier", M::TABLE_NAME))
        })?;
        let reread = Query {
            selection: query.selection.clone(),
            ..Query::by_id(id.as_str())
        };
        let row = first_match(tx.query(self.cx(), &reread))?
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        self.bind(&row, false)?;
        info!(model = M::TABLE_NAME, id = %id, "created record");

        run(callbacks.on_created.as_mut(), self)?;
        Ok(true)
    }
}

fn first_match(result: Result<Vec<Row>>) -> Result<Option<Row>> {
    match result {
        Ok(rows) => Ok(rows.into_iter().next()),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
