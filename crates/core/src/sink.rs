use crate::{error::Result, model::ReportMessage};

/// Destination of emitted report messages.
///
/// Delivery is best effort: a failed send is reported to the caller and the
/// message is dropped.
pub trait Sink: Send {
    fn send(&mut self, message: &ReportMessage) -> Result<()>;
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn send(&mut self, message: &ReportMessage) -> Result<()> {
        (**self).send(message)
    }
}
