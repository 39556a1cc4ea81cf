pub mod admission;
pub mod csv_row;
pub mod import;
pub mod person_types;
pub mod registry;
pub mod storage;
pub mod worker;
