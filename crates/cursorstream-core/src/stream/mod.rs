//! Module: stream
//! Responsibility: the public lazy entity sequence over one server-side cursor.
//! Does not own: SQL text, cursor naming, or per-row field mapping.
//! Boundary: composes session → fetcher → grouper → materializer → mapper.


use crate::{
    config::ClusteringMode,
    cursor::{CursorDescriptor, CursorSession, RowBatchFetcher},
    driver::Connection,
    error::CursorError,
    join::{EntityMapper, EntityMaterializer, JoinRowGrouper, JoinShape, MaterializedEntity},
    obs::sink::{MetricsEvent, MetricsSink, record_to},
};
use serde::Serialize;
use std::{iter::FusedIterator, ops::ControlFlow};
use tracing::debug;

///
/// CursorSummary
///
/// What one pass over a cursor did. `stopped_early` is set when the pass
/// ended before the cursor reported end-of-stream.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CursorSummary {
    pub cursor: String,
    pub rows_fetched: u64,
    pub entities_emitted: u64,
    pub stopped_early: bool,
}

///
/// CursorResultIterator
///
/// Single-pass, forward-only source of entities backed by a server-side
/// cursor. Every pass (`for_each`, `try_for_each`, `stream`) declares the
/// cursor afresh; a finished pass cannot be rewound.
///

pub struct CursorResultIterator<'c, C: Connection, M: EntityMapper> {
    conn: &'c mut C,
    descriptor: CursorDescriptor,
    mapper: M,
    clustering: ClusteringMode,
    metrics: Option<&'static dyn MetricsSink>,
}

impl<'c, C: Connection, M: EntityMapper> CursorResultIterator<'c, C, M> {
    pub(crate) const fn new(
        conn: &'c mut C,
        descriptor: CursorDescriptor,
        mapper: M,
        clustering: ClusteringMode,
        metrics: Option<&'static dyn MetricsSink>,
    ) -> Self {
        Self {
            conn,
            descriptor,
            mapper,
            clustering,
            metrics,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &CursorDescriptor {
        &self.descriptor
    }

    /// Begin a transaction, declare the cursor and hand back a lazy stream.
    ///
    /// Dropping the stream before exhaustion closes the cursor and ends the
    /// transaction.
    pub fn stream(&mut self) -> Result<CursorStream<'_, C, M>, CursorError> {
        let mut session = CursorSession::begin_with_metrics(
            &mut *self.conn,
            self.descriptor.clone(),
            self.metrics,
        )?;

        if let Err(err) = session.declare() {
            return session.finish(Err(err));
        }

        let pipeline = match self.descriptor.join() {
            Some(shape) => Pipeline::Joined {
                shape,
                grouper: JoinRowGrouper::new(shape.root_key().clone(), self.clustering),
            },
            None => Pipeline::Flat,
        };

        Ok(CursorStream {
            cursor: self.descriptor.name().raw().to_string(),
            fetcher: Some(RowBatchFetcher::new(session)),
            mapper: &self.mapper,
            pipeline,
            metrics: self.metrics,
            rows_fetched: 0,
            entities: 0,
            stopped_early: false,
        })
    }

    /// Visit every entity until the visitor breaks or the cursor is exhausted.
    pub fn for_each<F>(&mut self, mut visit: F) -> Result<CursorSummary, CursorError>
    where
        F: FnMut(M::Entity) -> ControlFlow<()>,
    {
        self.try_for_each(|entity| Ok(visit(entity)))
    }

    /// Like [`Self::for_each`], but a visitor error aborts the pass. That
    /// error is returned with any cleanup failure chained behind it.
    pub fn try_for_each<F>(&mut self, mut visit: F) -> Result<CursorSummary, CursorError>
    where
        F: FnMut(M::Entity) -> Result<ControlFlow<()>, CursorError>,
    {
        let mut stream = self.stream()?;
        let outcome = stream.drive(&mut visit);

        stream.finish_inner(outcome)
    }
}

///
/// Pipeline
///

enum Pipeline<'s> {
    Flat,
    Joined {
        shape: &'s JoinShape,
        grouper: JoinRowGrouper,
    },
}

///
/// CursorStream
///
/// One live pass over a declared cursor. Yields `Result<Entity, _>`; the
/// first error ends the stream after the cursor has been closed.
///

pub struct CursorStream<'s, C: Connection, M: EntityMapper> {
    cursor: String,
    fetcher: Option<RowBatchFetcher<'s, C>>,
    mapper: &'s M,
    pipeline: Pipeline<'s>,
    metrics: Option<&'static dyn MetricsSink>,
    rows_fetched: u64,
    entities: u64,
    stopped_early: bool,
}

impl<C: Connection, M: EntityMapper> CursorStream<'_, C, M> {
    #[must_use]
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Entities yielded so far.
    #[must_use]
    pub const fn entities_emitted(&self) -> u64 {
        self.entities
    }

    /// Stop here: close the cursor, end the transaction and report the pass.
    pub fn close(mut self) -> Result<CursorSummary, CursorError> {
        self.finish_inner(Ok(()))
    }

    fn drive<F>(&mut self, visit: &mut F) -> Result<(), CursorError>
    where
        F: FnMut(M::Entity) -> Result<ControlFlow<()>, CursorError>,
    {
        while let Some(entity) = self.next_entity()? {
            if visit(entity)?.is_break() {
                break;
            }
        }

        Ok(())
    }

    fn next_entity(&mut self) -> Result<Option<M::Entity>, CursorError> {
        let Some(materialized) = self.next_materialized()? else {
            return Ok(None);
        };

        let entity = self.mapper.instantiate(materialized)?;
        self.entities = self.entities.saturating_add(1);
        record_to(self.metrics, MetricsEvent::EntityEmitted);

        Ok(Some(entity))
    }

    // Pull rows until one entity is complete. Flat queries map row → entity;
    // joined queries only complete an entity when the root key changes.
    fn next_materialized(&mut self) -> Result<Option<MaterializedEntity>, CursorError> {
        let Some(fetcher) = self.fetcher.as_mut() else {
            return Ok(None);
        };

        match &mut self.pipeline {
            Pipeline::Flat => Ok(fetcher.next()?.map(MaterializedEntity::flat)),
            Pipeline::Joined { shape, grouper } => {
                let shape = *shape;
                let group = loop {
                    match fetcher.next()? {
                        Some(row) => {
                            if let Some(group) = grouper.push(row)? {
                                break Some(group);
                            }
                        }
                        None => break grouper.finish(),
                    }
                };

                Ok(group.map(|group| {
                    let rows = u64::try_from(group.len()).unwrap_or(u64::MAX);
                    record_to(self.metrics, MetricsEvent::GroupEmitted { rows });

                    EntityMaterializer::new(shape).materialize(group)
                }))
            }
        }
    }

    // Runs once: later calls return `outcome` against the recorded summary.
    fn finish_inner(
        &mut self,
        outcome: Result<(), CursorError>,
    ) -> Result<CursorSummary, CursorError> {
        let Some(fetcher) = self.fetcher.take() else {
            return outcome.map(|()| self.summary());
        };

        self.rows_fetched = fetcher.rows_fetched();
        self.stopped_early = !fetcher.is_exhausted();
        if self.stopped_early && outcome.is_ok() {
            record_to(self.metrics, MetricsEvent::EarlyStop);
        }

        let finished = fetcher.into_session().finish(outcome);
        debug!(
            cursor = %self.cursor,
            rows = self.rows_fetched,
            entities = self.entities,
            stopped_early = self.stopped_early,
            ok = finished.is_ok(),
            "cursor pass finished"
        );

        finished.map(|()| self.summary())
    }

    fn summary(&self) -> CursorSummary {
        CursorSummary {
            cursor: self.cursor.clone(),
            rows_fetched: self.rows_fetched,
            entities_emitted: self.entities,
            stopped_early: self.stopped_early,
        }
    }
}

impl<C: Connection, M: EntityMapper> Iterator for CursorStream<'_, C, M> {
    type Item = Result<M::Entity, CursorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fetcher.is_none() {
            return None;
        }

        match self.next_entity() {
            Ok(Some(entity)) => Some(Ok(entity)),
            // end of stream: a cleanup failure is the last item
            Ok(None) => self.finish_inner(Ok(())).err().map(Err),
            Err(err) => self.finish_inner(Err(err)).err().map(Err),
        }
    }
}

impl<C: Connection, M: EntityMapper> FusedIterator for CursorStream<'_, C, M> {}

impl<C: Connection, M: EntityMapper> Drop for CursorStream<'_, C, M> {
    fn drop(&mut self) {
        // unwinding: the session's own Drop closes and never commits
        if std::thread::panicking() {
            self.fetcher.take();
            return;
        }

        if self.fetcher.is_some() {
            // failures are already recorded and logged by the session
            let _ = self.finish_inner(Ok(()));
        }
    }
}
