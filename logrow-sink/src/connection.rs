//! Database connection collaborator.
//!
//! The sink never opens sockets itself. A [`ConnectionFactory`] hands out one
//! [`SqlConnection`] per statement; dropping the connection releases it back
//! to whatever pool the factory manages.

use crate::SinkResult;
use ::async_trait::async_trait;
use logrow_core::{BoundStatement, PlaceholderStyle};
use std::sync::Arc;

/// One acquired connection.
#[async_trait]
pub trait SqlConnection: Send {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&mut self, statement: &BoundStatement<'_>) -> SinkResult<u64>;
}

/// Source of connections. Must tolerate concurrent independent acquisitions.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn acquire(&self) -> SinkResult<Box<dyn SqlConnection>>;

    /// Placeholder style every parameterized statement must use, or `None`
    /// if the connections accept both.
    fn placeholder_style(&self) -> Option<PlaceholderStyle> {
        None
    }
}

#[async_trait]
impl<F: ConnectionFactory + ?Sized> ConnectionFactory for Arc<F> {
    async fn acquire(&self) -> SinkResult<Box<dyn SqlConnection>> {
        (**self).acquire().await
    }

    fn placeholder_style(&self) -> Option<PlaceholderStyle> {
        (**self).placeholder_style()
    }
}
