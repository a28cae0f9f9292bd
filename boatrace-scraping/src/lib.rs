pub mod api;
pub mod chrono_util;
pub mod date_range;
pub mod normalize;
pub mod racelist;
pub mod schedule;
pub mod snapshot;
pub mod venue;
