pub mod api;
pub mod model;
pub mod session;
pub mod store;
pub mod views;

pub use api::{ClientError, ClientResult, CrmClient, Resource};
pub use session::CrmSession;
pub use store::Store;
