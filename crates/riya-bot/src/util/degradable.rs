/// Outcome of an operation that never fails outright, but may fall back to a
/// value derived from its input (usually the input itself) when the real work
/// could not be done. The call site must decide how to treat the degraded
/// value explicitly instead of getting it silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Degradable<T> {
    Ok(T),
    Degraded(T),
}

impl<T> Degradable<T> {
    pub(crate) fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Ok(value) | Self::Degraded(value) => value,
        }
    }

    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::Degraded(_) => "degraded",
        }
    }
}
