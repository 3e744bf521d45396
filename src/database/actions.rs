//! Operations behind the HTTP routes. Each one runs in a single store
//! transaction and is scoped to the requesting [`Owner`](crate::permissions::Owner).

pub mod entities;
pub mod reconcile;
pub mod recipes;
pub mod users;

pub use entities::*;
pub use reconcile::*;
pub use recipes::*;
pub use users::*;
