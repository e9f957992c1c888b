//! Module: db
//! Responsibility: the caller-facing entry point over one connection.
//! Does not own: SQL construction or the cursor lifecycle itself.
//! Boundary: chooses between a plain query and a cursor-backed stream.

use crate::{
    config::{ConfigError, StreamConfig},
    cursor::{CursorDescriptor, CursorNameAllocator},
    driver::Connection,
    error::{CursorError, DatabaseStage},
    join::{EntityMapper, EntityMaterializer, JoinRowGrouper, JoinShape, MaterializedEntity},
    obs::sink::{MetricsEvent, MetricsSink, record_to},
    row::RawRow,
    stream::CursorResultIterator,
};
use tracing::debug;

///
/// QuerySource
///
/// Anything that renders to one SELECT statement, optionally with the join
/// shape needed to regroup its rows.
///

pub trait QuerySource {
    fn to_sql(&self) -> String;

    fn join_shape(&self) -> Option<JoinShape> {
        None
    }
}

impl QuerySource for str {
    fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl QuerySource for String {
    fn to_sql(&self) -> String {
        self.clone()
    }
}

///
/// SelectQuery
///
/// Prebuilt SQL text plus an optional join shape.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectQuery {
    sql: String,
    join: Option<JoinShape>,
}

impl SelectQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            join: None,
        }
    }

    #[must_use]
    pub fn joined(mut self, shape: JoinShape) -> Self {
        self.join = Some(shape);
        self
    }
}

impl QuerySource for SelectQuery {
    fn to_sql(&self) -> String {
        self.sql.clone()
    }

    fn join_shape(&self) -> Option<JoinShape> {
        self.join.clone()
    }
}

///
/// CursorOptions
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CursorOptions {
    pub name: Option<String>,
}

impl CursorOptions {
    /// Use `name` instead of a generated cursor name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

///
/// CursorDb
///
/// Handle over one connection. `query` runs a statement and buffers its
/// result; `stream_with_cursor` returns a lazy, cursor-backed sequence that
/// holds at most one raw row and one entity's group at a time.
///

pub struct CursorDb<'c, C: Connection> {
    conn: &'c mut C,
    config: StreamConfig,
    names: CursorNameAllocator,
    metrics: Option<&'static dyn MetricsSink>,
}

impl<'c, C: Connection> CursorDb<'c, C> {
    /// Handle with default configuration.
    pub fn new(conn: &'c mut C) -> Self {
        let config = StreamConfig::default();
        let names = CursorNameAllocator::new(&config.cursor);

        Self {
            conn,
            config,
            names,
            metrics: None,
        }
    }

    pub fn with_config(conn: &'c mut C, config: StreamConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let names = CursorNameAllocator::new(&config.cursor);

        Ok(Self {
            conn,
            config,
            names,
            metrics: None,
        })
    }

    /// Route this handle's events to `sink` instead of the global counters.
    #[must_use]
    pub fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Replace the entropy-seeded name allocator with a deterministic one.
    #[must_use]
    pub fn seeded_names(mut self, seed: u64) -> Self {
        self.names = CursorNameAllocator::with_seed(&self.config.cursor, seed);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Run `source` as an ordinary query and map every entity up front.
    pub fn query<Q, M>(&mut self, source: &Q, mapper: M) -> Result<Vec<M::Entity>, CursorError>
    where
        Q: QuerySource + ?Sized,
        M: EntityMapper,
    {
        let sql = source.to_sql();
        let rows = self
            .conn
            .query(&sql)
            .map_err(|err| CursorError::database(DatabaseStage::Query, err))?;

        let count = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        record_to(self.metrics, MetricsEvent::PlainQuery { rows: count });
        debug!(rows = count, "plain query");

        let entities = match source.join_shape() {
            Some(shape) => self.regroup(rows, &shape)?,
            None => rows.into_iter().map(MaterializedEntity::flat).collect(),
        };

        entities
            .into_iter()
            .map(|entity| mapper.instantiate(entity).map_err(CursorError::from))
            .collect()
    }

    /// Prepare a cursor-backed stream over `source`. No SQL is issued until
    /// the returned iterator is driven.
    pub fn stream_with_cursor<Q, M>(
        &mut self,
        source: &Q,
        options: CursorOptions,
        mapper: M,
    ) -> Result<CursorResultIterator<'_, C, M>, CursorError>
    where
        Q: QuerySource + ?Sized,
        M: EntityMapper,
    {
        let name = self.names.allocate(options.name.as_deref())?;
        let mut descriptor = CursorDescriptor::new(name, &source.to_sql());
        if let Some(shape) = source.join_shape() {
            descriptor = descriptor.with_join(shape);
        }

        debug!(cursor = %descriptor.name(), join = descriptor.is_join(), "cursor stream prepared");

        Ok(CursorResultIterator::new(
            &mut *self.conn,
            descriptor,
            mapper,
            self.config.grouping.clustering,
            self.metrics,
        ))
    }

    fn regroup(
        &self,
        rows: Vec<RawRow>,
        shape: &JoinShape,
    ) -> Result<Vec<MaterializedEntity>, CursorError> {
        let mut grouper =
            JoinRowGrouper::new(shape.root_key().clone(), self.config.grouping.clustering);
        let materializer = EntityMaterializer::new(shape);
        let mut entities = Vec::new();

        for row in rows {
            if let Some(group) = grouper.push(row)? {
                entities.push(materializer.materialize(group));
            }
        }
        entities.extend(grouper.finish().map(|group| materializer.materialize(group)));

        Ok(entities)
    }
}

///
/// TESTS
///
