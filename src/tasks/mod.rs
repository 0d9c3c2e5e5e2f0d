pub(crate) mod listener;
pub(crate) mod scheduler;
