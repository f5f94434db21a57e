pub mod catalog_column;
pub mod catalog_table;
pub mod data_connection;
pub mod lineage_edge;
pub mod quality_issue;
pub mod quality_score;
