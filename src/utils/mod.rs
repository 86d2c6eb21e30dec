pub mod db_utils;
pub mod pagination;
pub mod username_index;
