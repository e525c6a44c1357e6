pub mod schema;
pub mod store;
pub mod undo;
pub mod view;
