//! The seam between the query layer and whatever stores the rows.

use crate::core::operation::{Operation, Response};
use crate::Result;

/// Executes one [`Operation`] and reports the rows it produced.
///
/// Implementations must surface every failure as an error; a filter that
/// matches nothing is an empty [`Response`], not an error.
pub trait Backend {
    /// # Errors
    ///
    /// Returns [`crate::PodupuError::Backend`] or
    /// [`crate::PodupuError::Database`] if the operation could not be executed.
    fn execute(&self, op: &Operation) -> Result<Response>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn execute(&self, op: &Operation) -> Result<Response> {
        (**self).execute(op)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn execute(&self, op: &Operation) -> Result<Response> {
        (**self).execute(op)
    }
}
