pub(crate) mod level;
#[cfg(feature = "mic")]
pub(crate) mod mic;
pub(crate) mod simulated;
