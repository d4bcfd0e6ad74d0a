/// Outcome of a request that may already have been served.
///
/// `Ignored` carries the record as it stands, so a retried caller gets the same
/// answer as the first one without any side effect being repeated.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Idempotent<T> {
    Executed(T),
    Ignored(T),
}

impl<T> Idempotent<T> {
    pub fn was_ignored(&self) -> bool {
        matches!(self, Idempotent::Ignored(_))
    }

    pub fn did_execute(&self) -> bool {
        matches!(self, Idempotent::Executed(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Idempotent::Executed(t) | Idempotent::Ignored(t) => t,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Idempotent::Executed(t) | Idempotent::Ignored(t) => t,
        }
    }
}
