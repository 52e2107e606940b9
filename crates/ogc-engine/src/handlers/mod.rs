//! One handler per operation. Version differences live in the request
//! types and document builders, so each handler serves every version.

pub(crate) mod coverage;
pub(crate) mod documents;
pub(crate) mod feature_info;
pub(crate) mod legend;
pub(crate) mod map;
