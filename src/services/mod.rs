pub(crate) mod observability;
pub(crate) mod pagination;
pub(crate) mod publisher;
pub(crate) mod queue;
pub(crate) mod quiz_processor;
