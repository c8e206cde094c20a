pub(crate) mod avatar;
pub(crate) mod def;
pub(crate) mod state;
