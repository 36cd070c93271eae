//! A connection that is kept between requests and rebuilt after it breaks.

use crate::MeterError;

/// Holds one open connection across samples.
///
/// A request that fails with [`MeterError::Transport`] may leave the
/// connection half way through an exchange, so it is dropped and the next
/// request opens a new one. Every other outcome keeps it.
#[derive(Debug)]
pub struct ConnectionSlot<C> {
    conn: Option<C>,
}

impl<C> Default for ConnectionSlot<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C> ConnectionSlot<C> {
    /// A slot that opens its connection on first use.
    #[must_use]
    pub const fn empty() -> Self {
        Self { conn: None }
    }

    /// A slot holding an already opened connection.
    #[must_use]
    pub const fn with(conn: C) -> Self {
        Self { conn: Some(conn) }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Run `request` on the held connection, opening one first if needed.
    pub fn run<T>(
        &mut self,
        open: impl FnOnce() -> Result<C, MeterError>,
        request: impl FnOnce(&mut C) -> Result<T, MeterError>,
    ) -> Result<T, MeterError> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => open()?,
        };
        let result = request(&mut conn);
        if !matches!(result, Err(MeterError::Transport(_))) {
            self.conn = Some(conn);
        }
        result
    }
}
