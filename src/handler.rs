use crate::error::HandlerError;
use crate::level::Level;
use crate::record::Record;
use crate::value::Attr;

/// Destination for [`Record`]s produced by a logging front end.
///
/// Implementations must be safe to call from many threads at once; the
/// layer invokes them synchronously on the thread that emitted the event.
pub trait Handler: Send + Sync {
    /// Whether records at `level` would be handled.
    fn enabled(&self, level: Level) -> bool;

    /// Serialize and write a single record.
    ///
    /// **Returns**
    /// - `Ok(())` once the record has been written to the output stream.
    /// - `Err(..)` if encoding or the write failed. Nothing is retried or
    ///   buffered; the caller decides whether to surface the error.
    fn handle(&self, record: &Record) -> Result<(), HandlerError>;

    /// New handler whose records additionally carry `attrs`. `self` is left
    /// untouched.
    fn with_attrs(&self, attrs: Vec<Attr>) -> Self
    where
        Self: Sized;

    /// New handler that nests all subsequent attributes under `name`.
    fn with_group(&self, name: &str) -> Self
    where
        Self: Sized;
}
