pub mod comparator;
pub mod options;
