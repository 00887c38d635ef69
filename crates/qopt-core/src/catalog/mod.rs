//! Statistics catalog consulted by the planner and cost model.

mod statistics;

pub use statistics::{
    predicate_key, StatisticsCatalog, TableStatistics, DEFAULT_SELECTIVITY, DEFAULT_TUPLE_WIDTH,
};
