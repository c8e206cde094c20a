pub(crate) mod blend;
pub(crate) mod compositor;
pub(crate) mod effects;
pub(crate) mod frame;
pub(crate) mod transform;
