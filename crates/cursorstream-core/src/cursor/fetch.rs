use crate::{
    cursor::CursorSession, driver::Connection, error::CursorError, row::RawRow,
};

///
/// RowBatchFetcher
///
/// One `FETCH FORWARD` per `next` call, never more: at most one raw row is
/// held here at a time regardless of result size. Once end-of-stream is seen
/// no further statements are issued.
///

pub struct RowBatchFetcher<'c, C: Connection> {
    session: CursorSession<'c, C>,
    rows_fetched: u64,
    exhausted: bool,
}

impl<'c, C: Connection> RowBatchFetcher<'c, C> {
    #[must_use]
    pub const fn new(session: CursorSession<'c, C>) -> Self {
        Self {
            session,
            rows_fetched: 0,
            exhausted: false,
        }
    }

    pub fn next(&mut self) -> Result<Option<RawRow>, CursorError> {
        if self.exhausted {
            return Ok(None);
        }

        let row = self.session.fetch_next()?;
        match row {
            Some(_) => self.rows_fetched = self.rows_fetched.saturating_add(1),
            None => self.exhausted = true,
        }

        Ok(row)
    }

    #[must_use]
    pub const fn rows_fetched(&self) -> u64 {
        self.rows_fetched
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    #[must_use]
    pub const fn session(&self) -> &CursorSession<'c, C> {
        &self.session
    }

    #[must_use]
    pub fn into_session(self) -> CursorSession<'c, C> {
        self.session
    }
}
